//! The local storage layout.
//!
//! All state lives under a single home directory:
//!
//! ```text
//! <home>/
//! ├── bundles/            # One blob per stored bundle, named by digest
//! ├── repositories.json   # name-version → digest index
//! ├── credentials/        # Operator-supplied credential sets
//! ├── claims/             # Installation records
//! ├── logs/
//! ├── plugins/
//! └── .lock               # Advisory lock serializing store mutations
//! ```
//!
//! The repository index contains an entry if and only if the corresponding
//! blob exists in the bundles area; the importer maintains that invariant
//! across failures (see [`crate::packager`]).

pub mod lock;
pub mod paths;
pub mod repositories;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

const BUNDLES_DIR: &str = "bundles";
const CREDENTIALS_DIR: &str = "credentials";
const CLAIMS_DIR: &str = "claims";
const LOGS_DIR: &str = "logs";
const PLUGINS_DIR: &str = "plugins";
const REPOSITORIES_FILENAME: &str = "repositories.json";

/// Handle to local storage rooted at a fixed directory.
#[derive(Debug, Clone)]
pub struct Home {
  root: PathBuf,
}

impl Home {
  pub fn new(root: PathBuf) -> Self {
    Self { root }
  }

  /// Home at the default location (`$HOLDALL_HOME` or the platform data
  /// directory).
  pub fn default_home() -> Self {
    Self::new(paths::default_home())
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Directory of stored bundle blobs, one per digest.
  pub fn bundles(&self) -> PathBuf {
    self.root.join(BUNDLES_DIR)
  }

  /// The repository index file.
  pub fn repositories(&self) -> PathBuf {
    self.root.join(REPOSITORIES_FILENAME)
  }

  pub fn credentials(&self) -> PathBuf {
    self.root.join(CREDENTIALS_DIR)
  }

  pub fn claims(&self) -> PathBuf {
    self.root.join(CLAIMS_DIR)
  }

  pub fn logs(&self) -> PathBuf {
    self.root.join(LOGS_DIR)
  }

  pub fn plugins(&self) -> PathBuf {
    self.root.join(PLUGINS_DIR)
  }

  /// Create the fixed set of directories and seed files.
  ///
  /// Idempotent: existing entries are left untouched.
  pub fn ensure(&self) -> io::Result<()> {
    ensure_directories(&[
      self.root.clone(),
      self.bundles(),
      self.credentials(),
      self.claims(),
      self.logs(),
      self.plugins(),
    ])?;
    ensure_files(&[self.repositories()])?;
    debug!(root = %self.root.display(), "ensured local storage layout");
    Ok(())
  }
}

/// Create each directory if absent. An existing directory is a no-op.
pub fn ensure_directories(dirs: &[PathBuf]) -> io::Result<()> {
  for dir in dirs {
    fs::create_dir_all(dir)?;
  }
  Ok(())
}

/// Create each file empty if absent. An existing file is left untouched.
pub fn ensure_files(files: &[PathBuf]) -> io::Result<()> {
  for file in files {
    fs::OpenOptions::new().write(true).create(true).truncate(false).open(file)?;
  }
  Ok(())
}
