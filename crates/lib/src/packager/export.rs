//! Bundle export: extracted layout → archive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

use super::pack_archive;
use crate::bundle::marshal::{EncodingError, marshal};
use crate::bundle::{Bundle, BundleError};
use crate::consts::{BUNDLE_FILENAME, IMAGES_DIR};
use crate::imagestore::{Builder, ImageStoreError, create, with_archive_dir};

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("error in path {path}: {source}")]
  Path {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Validation(#[from] BundleError),

  #[error(transparent)]
  Encoding(#[from] EncodingError),

  #[error("failed to create image store: {0}")]
  ImageStore(#[from] ImageStoreError),

  #[error("image transfer failed: {}", .failures.join("; "))]
  ImageTransfer { failures: Vec<String> },

  #[error("failed to write archive: {0}")]
  Archive(#[source] io::Error),
}

/// Packs an extracted bundle layout into a distributable archive.
///
/// The outgoing tree is staged in a temporary directory (canonical
/// `bundle.json`, image blobs pushed through the store) and the finished
/// archive lands at its destination via a single rename, mirroring the
/// importer's commit discipline.
#[derive(Debug)]
pub struct Exporter {
  bundle_dir: PathBuf,
  dest: PathBuf,
}

impl Exporter {
  /// `bundle_dir` is an extracted bundle layout (`bundle.json` plus
  /// `images/`); `dest: None` writes the archive to the current
  /// directory.
  pub fn new(bundle_dir: &Path, dest: Option<&Path>) -> Result<Self, ExportError> {
    let bundle_dir = dunce::canonicalize(bundle_dir).map_err(|err| ExportError::Path {
      path: bundle_dir.to_path_buf(),
      source: err,
    })?;
    let dest = match dest {
      Some(dir) => std::path::absolute(dir).map_err(|err| ExportError::Path {
        path: dir.to_path_buf(),
        source: err,
      })?,
      None => std::env::current_dir().map_err(|err| ExportError::Path {
        path: PathBuf::from("."),
        source: err,
      })?,
    };
    Ok(Self { bundle_dir, dest })
  }

  /// Export the layout, returning the path of the finished archive.
  pub fn export(&self, builder: Box<dyn Builder>) -> Result<PathBuf, ExportError> {
    let bundle = Bundle::load(&self.bundle_dir.join(BUNDLE_FILENAME))?;
    let (data, digest) = marshal(&bundle)?;

    let staging = TempDir::new().map_err(ExportError::Archive)?;
    let stem = bundle.key();
    let root = staging.path().join(&stem);

    fs::create_dir_all(root.join(IMAGES_DIR)).map_err(ExportError::Archive)?;
    // The archive carries the canonical form, whatever shape the source
    // definition was in.
    fs::write(root.join(BUNDLE_FILENAME), &data).map_err(ExportError::Archive)?;
    copy_dir(&self.bundle_dir.join(IMAGES_DIR), &root.join(IMAGES_DIR)).map_err(ExportError::Archive)?;

    let store = create(builder, vec![with_archive_dir(root.clone())])?;
    let mut failures = Vec::new();
    for image in bundle.image_refs() {
      if let Err(err) = store.push(&image) {
        failures.push(format!("{image}: {err}"));
      }
    }
    if !failures.is_empty() {
      return Err(ExportError::ImageTransfer { failures });
    }

    let archive_name = format!("{stem}.tgz");
    let staged_archive = staging.path().join(&archive_name);
    pack_archive(&root, &staged_archive).map_err(ExportError::Archive)?;

    fs::create_dir_all(&self.dest).map_err(ExportError::Archive)?;
    let final_path = self.dest.join(&archive_name);
    move_file(&staged_archive, &final_path).map_err(ExportError::Archive)?;

    debug!(digest = %digest, "exported canonical bundle definition");
    info!(archive = %final_path.display(), "exported bundle");
    Ok(final_path)
  }
}

/// Rename, falling back to copy + remove when the staging directory is on
/// another filesystem.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
  if fs::rename(from, to).is_ok() {
    return Ok(());
  }
  fs::copy(from, to)?;
  fs::remove_file(from)
}

fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
  if !src.exists() {
    return Ok(());
  }
  fs::create_dir_all(dst)?;
  for entry in fs::read_dir(src)? {
    let entry = entry?;
    let target = dst.join(entry.file_name());
    if entry.file_type()?.is_dir() {
      copy_dir(&entry.path(), &target)?;
    } else {
      fs::copy(entry.path(), &target)?;
    }
  }
  Ok(())
}
