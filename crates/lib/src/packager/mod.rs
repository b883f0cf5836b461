//! Archive packaging: import and export of bundle archives.
//!
//! An archive is a gzip-compressed tar whose top-level directory is
//! `<name>-<version>/`, holding `bundle.json` and an `images/` layout.
//! Import unpacks, validates, transfers images, and commits to local
//! storage atomically; export is the structural mirror.

mod export;
mod import;

pub use export::{ExportError, Exporter};
pub use import::{ImportError, Importer};

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::Archive;

/// Unpack a gzipped tar archive into `dest`, preserving the archive's
/// internal relative layout exactly.
pub(crate) fn unpack_archive(archive_path: &Path, dest: &Path) -> io::Result<()> {
  let file = File::open(archive_path)?;
  let decoder = GzDecoder::new(BufReader::new(file));
  let mut archive = Archive::new(decoder);
  archive.unpack(dest)
}

/// Pack the directory `src` into a gzipped tar at `dest`, with the
/// directory itself as the top-level entry.
pub(crate) fn pack_archive(src: &Path, dest: &Path) -> io::Result<()> {
  let top = src
    .file_name()
    .ok_or_else(|| io::Error::other("archive source has no file name"))?;
  let file = File::create(dest)?;
  let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
  let mut builder = tar::Builder::new(encoder);
  builder.append_dir_all(top, src)?;
  let encoder = builder.into_inner()?;
  let mut writer = encoder.finish()?;
  writer.flush()
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::*;

  #[test]
  fn pack_then_unpack_preserves_relative_layout() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("examplebun-0.1.0");
    fs::create_dir_all(src.join("images")).unwrap();
    fs::write(src.join("bundle.json"), "{}").unwrap();
    fs::write(src.join("images/app.tar"), "layers").unwrap();

    let archive = temp.path().join("examplebun-0.1.0.tgz");
    pack_archive(&src, &archive).unwrap();

    let dest = temp.path().join("out");
    unpack_archive(&archive, &dest).unwrap();

    assert!(dest.join("examplebun-0.1.0/bundle.json").is_file());
    assert_eq!(
      fs::read_to_string(dest.join("examplebun-0.1.0/images/app.tar")).unwrap(),
      "layers"
    );
  }

  #[test]
  fn unpack_of_corrupt_archive_fails() {
    let temp = tempdir().unwrap();
    let archive = temp.path().join("corrupt.tgz");
    fs::write(&archive, "definitely not gzip").unwrap();

    assert!(unpack_archive(&archive, &temp.path().join("out")).is_err());
  }
}
