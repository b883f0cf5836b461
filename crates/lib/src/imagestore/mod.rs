//! Pluggable image stores.
//!
//! An image store moves the images a bundle references between an archive
//! layout and wherever images are kept at rest. Stores are produced by a
//! [`Builder`]: every configuration call consumes the builder and returns
//! a new value, so configuration composes without shared mutable state.
//! [`BuilderOption`]s are pure `Builder → Builder` transformations folded
//! over a starting builder by [`create`].
//!
//! Only the contract lives here; concrete backends are selected by the
//! caller at construction time. The [`archive`] backend ships with this
//! crate; registry-backed stores are external.

pub mod archive;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Sink for transfer progress lines.
pub type LogSink = Arc<Mutex<dyn Write + Send>>;

#[derive(Debug, Error)]
pub enum ImageStoreError {
  #[error("no archive directory configured")]
  MissingArchiveDir,

  #[error("image {image} is not present in the archive layout at {path}")]
  ImageMissing { image: String, path: PathBuf },

  #[error("image transfer i/o failure: {0}")]
  Io(#[source] std::io::Error),
}

/// Image transfer between an archive layout and images at rest.
pub trait Store: Send + Sync {
  /// Copy `image` into the archive layout.
  fn push(&self, image: &str) -> Result<(), ImageStoreError>;

  /// Materialize `image` out of the archive layout.
  fn pull(&self, image: &str) -> Result<(), ImageStoreError>;
}

/// A means of creating image stores.
///
/// Each configuration method returns a fresh, independent builder value
/// reflecting the option.
pub trait Builder {
  /// A fresh builder with the given archive directory.
  fn archive_dir(self: Box<Self>, dir: &Path) -> Box<dyn Builder>;

  /// A fresh builder with the given log sink.
  fn logs(self: Box<Self>, sink: LogSink) -> Box<dyn Builder>;

  /// Create an image store.
  fn build(self: Box<Self>) -> Result<Arc<dyn Store>, ImageStoreError>;
}

/// A pure transformation of a builder.
pub type BuilderOption = Box<dyn FnOnce(Box<dyn Builder>) -> Box<dyn Builder>>;

/// Option setting the archive directory.
pub fn with_archive_dir(dir: PathBuf) -> BuilderOption {
  Box::new(move |b| b.archive_dir(&dir))
}

/// Option setting the log sink.
pub fn with_logs(sink: LogSink) -> BuilderOption {
  Box::new(move |b| b.logs(sink))
}

/// Create a store from a builder and a sequence of options.
///
/// Options are applied in order, then the configured builder builds.
pub fn create(builder: Box<dyn Builder>, options: Vec<BuilderOption>) -> Result<Arc<dyn Store>, ImageStoreError> {
  let mut builder = builder;
  for option in options {
    builder = option(builder);
  }
  builder.build()
}
