//! End-to-end tests for the `holdall` binary.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use flate2::Compression;
use flate2::write::GzEncoder;
use predicates::prelude::*;
use tempfile::tempdir;

const SAMPLE_BUNDLE: &str = r#"{
  "name": "examplebun",
  "version": "0.1.0",
  "invocationImages": [{ "image": "example.com/examplebun:0.1.0", "imageType": "docker" }]
}"#;

/// Build an `examplebun-0.1.0.tgz` fixture in `dir`.
fn write_fixture(dir: &Path, bundle_json: &str) -> PathBuf {
  let staging = dir.join("examplebun-0.1.0");
  fs::create_dir_all(staging.join("images")).unwrap();
  fs::write(staging.join("bundle.json"), bundle_json).unwrap();
  fs::write(
    staging.join("images/example.com-examplebun-0.1.0.tar"),
    b"layers",
  )
  .unwrap();

  let archive_path = dir.join("examplebun-0.1.0.tgz");
  let file = File::create(&archive_path).unwrap();
  let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
  let mut builder = tar::Builder::new(encoder);
  builder.append_dir_all("examplebun-0.1.0", &staging).unwrap();
  let encoder = builder.into_inner().unwrap();
  let mut writer = encoder.finish().unwrap();
  writer.flush().unwrap();

  fs::remove_dir_all(&staging).unwrap();
  archive_path
}

fn holdall(home: &Path) -> Command {
  let mut cmd = Command::cargo_bin("holdall").unwrap();
  cmd.env("HOLDALL_HOME", home);
  cmd
}

#[test]
fn import_without_destination_stores_the_bundle() {
  let temp = tempdir().unwrap();
  let home = temp.path().join("home");
  let archive = write_fixture(temp.path(), SAMPLE_BUNDLE);

  holdall(&home).arg("import").arg(&archive).assert().success();

  let blobs: Vec<_> = fs::read_dir(home.join("bundles")).unwrap().collect();
  assert_eq!(blobs.len(), 1);

  let repos = fs::read_to_string(home.join("repositories.json")).unwrap();
  assert!(repos.contains("examplebun-0.1.0"));
}

#[test]
fn import_with_destination_retains_the_unpacked_bundle() {
  let temp = tempdir().unwrap();
  let home = temp.path().join("home");
  let archive = write_fixture(temp.path(), SAMPLE_BUNDLE);
  let dest = temp.path().join("unzipped");

  holdall(&home)
    .arg("import")
    .arg(&archive)
    .arg("--destination")
    .arg(&dest)
    .assert()
    .success();

  assert!(dest.join("examplebun-0.1.0/bundle.json").is_file());
  assert_eq!(fs::read_dir(home.join("bundles")).unwrap().count(), 1);
}

#[test]
fn import_with_empty_destination_routes_to_local_storage() {
  let temp = tempdir().unwrap();
  let home = temp.path().join("home");
  let archive = write_fixture(temp.path(), SAMPLE_BUNDLE);

  holdall(&home)
    .arg("import")
    .arg(&archive)
    .arg("--destination")
    .arg("")
    .assert()
    .success();

  assert_eq!(fs::read_dir(home.join("bundles")).unwrap().count(), 1);
}

#[test]
fn import_of_malformed_bundle_leaves_storage_untouched() {
  let temp = tempdir().unwrap();
  let home = temp.path().join("home");
  let archive = write_fixture(temp.path(), "not a bundle definition");

  holdall(&home)
    .arg("import")
    .arg(&archive)
    .assert()
    .failure()
    .stderr(predicate::str::contains("bundle"));

  assert_eq!(fs::read_dir(home.join("bundles")).unwrap().count(), 0);
  assert_eq!(fs::read_to_string(home.join("repositories.json")).unwrap(), "");
}

#[test]
fn import_of_missing_archive_fails() {
  let temp = tempdir().unwrap();
  let home = temp.path().join("home");

  holdall(&home)
    .arg("import")
    .arg(temp.path().join("no-such.tgz"))
    .assert()
    .failure();
}

#[test]
fn list_shows_imported_bundles() {
  let temp = tempdir().unwrap();
  let home = temp.path().join("home");
  let archive = write_fixture(temp.path(), SAMPLE_BUNDLE);

  holdall(&home).arg("import").arg(&archive).assert().success();

  holdall(&home)
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("examplebun-0.1.0"));
}

#[test]
fn list_with_empty_storage_says_so() {
  let temp = tempdir().unwrap();
  let home = temp.path().join("home");

  holdall(&home)
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("no bundles"));
}

#[test]
fn export_round_trips_an_imported_layout() {
  let temp = tempdir().unwrap();
  let home = temp.path().join("home");
  let archive = write_fixture(temp.path(), SAMPLE_BUNDLE);
  let dest = temp.path().join("unzipped");

  holdall(&home)
    .arg("import")
    .arg(&archive)
    .arg("-d")
    .arg(&dest)
    .assert()
    .success();

  let out = temp.path().join("exported");
  holdall(&home)
    .arg("export")
    .arg(dest.join("examplebun-0.1.0"))
    .arg("-d")
    .arg(&out)
    .assert()
    .success();

  assert!(out.join("examplebun-0.1.0.tgz").is_file());
}
