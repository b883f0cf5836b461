//! Image store backed by an archive layout on the local filesystem.
//!
//! Images at rest live in the layout's `images/` subdirectory, one blob
//! per image named by the sanitized reference with a `.tar` suffix.
//! Transfers verify the referenced blob is present and report each
//! transfer to the configured log sink; moving the layout in and out of a
//! gzipped archive is the packager's job.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{Builder, ImageStoreError, LogSink, Store};
use crate::consts::IMAGES_DIR;

/// Builds [`ArchiveLayoutStore`]s.
#[derive(Default)]
pub struct ArchiveLayoutBuilder {
  archive_dir: Option<PathBuf>,
  logs: Option<LogSink>,
}

impl ArchiveLayoutBuilder {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Builder for ArchiveLayoutBuilder {
  fn archive_dir(self: Box<Self>, dir: &Path) -> Box<dyn Builder> {
    let this = *self;
    Box::new(ArchiveLayoutBuilder {
      archive_dir: Some(dir.to_path_buf()),
      ..this
    })
  }

  fn logs(self: Box<Self>, sink: LogSink) -> Box<dyn Builder> {
    let this = *self;
    Box::new(ArchiveLayoutBuilder {
      logs: Some(sink),
      ..this
    })
  }

  fn build(self: Box<Self>) -> Result<Arc<dyn Store>, ImageStoreError> {
    let archive_dir = self.archive_dir.ok_or(ImageStoreError::MissingArchiveDir)?;
    Ok(Arc::new(ArchiveLayoutStore {
      layout: archive_dir.join(IMAGES_DIR),
      logs: self.logs,
    }))
  }
}

/// Store whose at-rest image location is the archive layout itself.
pub struct ArchiveLayoutStore {
  layout: PathBuf,
  logs: Option<LogSink>,
}

impl ArchiveLayoutStore {
  fn blob_path(&self, image: &str) -> PathBuf {
    self.layout.join(format!("{}.tar", sanitize(image)))
  }

  fn transfer(&self, image: &str, direction: &str) -> Result<(), ImageStoreError> {
    let path = self.blob_path(image);
    if !path.is_file() {
      return Err(ImageStoreError::ImageMissing {
        image: image.to_string(),
        path,
      });
    }
    debug!(image, path = %path.display(), "{} image blob", direction);
    if let Some(sink) = &self.logs {
      let mut sink = sink.lock().unwrap();
      writeln!(sink, "{direction} {image}").map_err(ImageStoreError::Io)?;
    }
    Ok(())
  }
}

impl Store for ArchiveLayoutStore {
  fn push(&self, image: &str) -> Result<(), ImageStoreError> {
    self.transfer(image, "pushed")
  }

  fn pull(&self, image: &str) -> Result<(), ImageStoreError> {
    self.transfer(image, "pulled")
  }
}

/// Make an image reference safe to use as a file name.
pub fn sanitize(image: &str) -> String {
  image
    .chars()
    .map(|c| if c == '/' || c == ':' || c == '@' { '-' } else { c })
    .collect()
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::sync::Mutex;

  use tempfile::tempdir;

  use super::*;
  use crate::imagestore::{create, with_archive_dir, with_logs};

  #[test]
  fn build_without_archive_dir_fails() {
    let result = Box::new(ArchiveLayoutBuilder::new()).build();
    assert!(matches!(result, Err(ImageStoreError::MissingArchiveDir)));
  }

  /// Log sink whose output stays observable after handing it to a store.
  struct SharedSink(Arc<Mutex<Vec<u8>>>);

  impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
      self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn pull_verifies_the_blob_and_logs() {
    let temp = tempdir().unwrap();
    let layout = temp.path().join(IMAGES_DIR);
    fs::create_dir_all(&layout).unwrap();
    fs::write(layout.join("example.com-web-1.2.0.tar"), b"layers").unwrap();

    let logged = Arc::new(Mutex::new(Vec::new()));
    let sink: LogSink = Arc::new(Mutex::new(SharedSink(Arc::clone(&logged))));
    let store = create(
      Box::new(ArchiveLayoutBuilder::new()),
      vec![with_archive_dir(temp.path().to_path_buf()), with_logs(sink)],
    )
    .unwrap();

    store.pull("example.com/web:1.2.0").unwrap();

    let output = String::from_utf8(logged.lock().unwrap().clone()).unwrap();
    assert_eq!(output, "pulled example.com/web:1.2.0\n");
  }

  #[test]
  fn pull_of_missing_image_names_it() {
    let temp = tempdir().unwrap();
    fs::create_dir_all(temp.path().join(IMAGES_DIR)).unwrap();

    let store = create(
      Box::new(ArchiveLayoutBuilder::new()),
      vec![with_archive_dir(temp.path().to_path_buf())],
    )
    .unwrap();

    let err = store.pull("example.com/ghost:1").unwrap_err();
    match err {
      ImageStoreError::ImageMissing { image, .. } => assert_eq!(image, "example.com/ghost:1"),
      other => panic!("expected ImageMissing, got {other:?}"),
    }
  }

  #[test]
  fn sanitize_flattens_reference_separators() {
    assert_eq!(sanitize("example.com/app:1.0"), "example.com-app-1.0");
    assert_eq!(sanitize("registry/ns/app@sha256"), "registry-ns-app-sha256");
  }
}
