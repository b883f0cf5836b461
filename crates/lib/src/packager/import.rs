//! Bundle import: archive → local storage.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::unpack_archive;
use crate::bundle::marshal::{EncodingError, marshal};
use crate::bundle::{Bundle, BundleError};
use crate::consts::BUNDLE_FILENAME;
use crate::home::Home;
use crate::home::lock::{HomeLock, HomeLockError, LockMode};
use crate::home::repositories::{RepositoryError, RepositoryIndex};
use crate::imagestore::{Builder, ImageStoreError, Store, create, with_archive_dir};

#[derive(Debug, Error)]
pub enum ImportError {
  #[error("error in path {path}: {source}")]
  Path {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create temporary extraction directory: {0}")]
  TempDir(#[source] io::Error),

  #[error("failed to extract archive {path}: {source}")]
  Extraction {
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

  #[error("failed to write bundle blob: {0}")]
  StoreWrite(#[source] io::Error),

  #[error(transparent)]
  Index(#[from] RepositoryError),

  #[error(transparent)]
  Lock(#[from] HomeLockError),
}

/// Imports a bundle archive into local storage.
///
/// The archive is extracted, the embedded definition validated, every
/// referenced image transferred, and only then is the bundle committed:
/// blob first, then the repository index entry, under an exclusive store
/// lock. A failure at any step leaves local storage byte-for-byte as it
/// was before the call.
#[derive(Debug)]
pub struct Importer {
  source: PathBuf,
  destination: Option<PathBuf>,
  verbose: bool,
}

impl Importer {
  /// Create an importer, resolving both paths to absolute form.
  ///
  /// `destination: None` extracts into a temporary directory that is
  /// removed when the import completes, success or failure.
  pub fn new(source: &Path, destination: Option<&Path>, verbose: bool) -> Result<Self, ImportError> {
    let source = dunce::canonicalize(source).map_err(|err| ImportError::Path {
      path: source.to_path_buf(),
      source: err,
    })?;
    let destination = destination
      .map(|dir| {
        std::path::absolute(dir).map_err(|err| ImportError::Path {
          path: dir.to_path_buf(),
          source: err,
        })
      })
      .transpose()?;
    Ok(Self {
      source,
      destination,
      verbose,
    })
  }

  pub async fn import(&self, home: &Home, builder: Box<dyn Builder>) -> Result<(), ImportError> {
    // Extraction target: the explicit destination, or a temp dir removed
    // on every exit path by its drop guard.
    let mut temp_guard: Option<TempDir> = None;
    let dest = match &self.destination {
      Some(dir) => {
        fs::create_dir_all(dir).map_err(|err| ImportError::Path {
          path: dir.clone(),
          source: err,
        })?;
        dir.clone()
      }
      None => {
        let temp = TempDir::new().map_err(ImportError::TempDir)?;
        let path = temp.path().to_path_buf();
        temp_guard = Some(temp);
        path
      }
    };

    let result = self.run(home, builder, &dest).await;

    // An explicit destination keeps the extracted files for inspection;
    // the temp guard (if any) drops here regardless of outcome.
    drop(temp_guard);
    result
  }

  async fn run(&self, home: &Home, builder: Box<dyn Builder>, dest: &Path) -> Result<(), ImportError> {
    unpack_archive(&self.source, dest).map_err(|err| ImportError::Extraction {
      path: self.source.clone(),
      source: err,
    })?;
    debug!(source = %self.source.display(), dest = %dest.display(), "extracted archive");

    let bundle_dir = dest.join(archive_stem(&self.source));
    let bundle = Bundle::load(&bundle_dir.join(BUNDLE_FILENAME))?;

    let (data, digest) = marshal(&bundle)?;
    debug!(digest = %digest, "canonicalized bundle definition");

    // Nothing is committed until every transfer has succeeded.
    let store = create(builder, vec![with_archive_dir(bundle_dir)])?;
    self.transfer_images(store, bundle.image_refs()).await?;

    let _lock = HomeLock::acquire(home.root(), LockMode::Exclusive, "import")?;

    let blob_path = home.bundles().join(digest.to_string());
    write_blob(&blob_path, &data).map_err(ImportError::StoreWrite)?;

    if let Err(err) = append_index(&home.repositories(), bundle.key(), &digest) {
      // Remove the blob so the index and bundles area never disagree.
      if let Err(remove_err) = fs::remove_file(&blob_path) {
        warn!(
          path = %blob_path.display(),
          error = %remove_err,
          "failed to remove bundle blob during rollback"
        );
      }
      return Err(err.into());
    }

    info!(
      name = %bundle.name,
      version = %bundle.version,
      digest = %digest,
      "imported bundle"
    );
    Ok(())
  }

  /// Pull every referenced image, a bounded number at a time.
  ///
  /// The first failure aborts the remaining transfers; every failure that
  /// did occur is reported in one aggregate error.
  async fn transfer_images(&self, store: Arc<dyn Store>, images: Vec<String>) -> Result<(), ImportError> {
    let parallelism = std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4);
    let semaphore = Arc::new(Semaphore::new(parallelism));
    let verbose = self.verbose;

    let mut join_set = JoinSet::new();
    for image in images {
      let store = Arc::clone(&store);
      let semaphore = Arc::clone(&semaphore);
      join_set.spawn(async move {
        let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
        match store.pull(&image) {
          Ok(()) => Ok(image),
          Err(err) => Err((image, err)),
        }
      });
    }

    let mut failures = Vec::new();
    while let Some(joined) = join_set.join_next().await {
      match joined {
        Ok(Ok(image)) => {
          if verbose {
            info!(image = %image, "transferred image");
          } else {
            debug!(image = %image, "transferred image");
          }
        }
        Ok(Err((image, err))) => {
          failures.push(format!("{image}: {err}"));
          // Cancel the remaining siblings; their aborts drain below.
          join_set.abort_all();
        }
        Err(join_err) if join_err.is_cancelled() => {}
        Err(join_err) => failures.push(format!("transfer task panicked: {join_err}")),
      }
    }

    if failures.is_empty() {
      Ok(())
    } else {
      Err(ImportError::ImageTransfer { failures })
    }
  }
}

/// Write the blob via a temp file and a single rename.
fn write_blob(path: &Path, data: &[u8]) -> io::Result<()> {
  let temp_path = path.with_extension("tmp");
  fs::write(&temp_path, data)?;
  fs::rename(&temp_path, path)
}

/// Read-modify-write the repository index under the caller's lock.
fn append_index(path: &Path, key: String, digest: &crate::bundle::marshal::Digest) -> Result<(), RepositoryError> {
  let mut index = RepositoryIndex::load(path)?;
  index.insert(key, digest);
  index.save(path)
}

/// Top-level directory inside the archive: the source file name without
/// its `.tgz`/`.tar.gz` suffix.
fn archive_stem(source: &Path) -> String {
  let name = source
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  for suffix in [".tar.gz", ".tgz"] {
    if let Some(stem) = name.strip_suffix(suffix) {
      return stem.to_string();
    }
  }
  name
}
