//! Image relocation for prepared operations.
//!
//! When a bundle's images have been copied to another registry, a
//! relocation map records original → relocated references. The relocator
//! rewrites an operation's invocation image and mounts the raw map inside
//! the operation so the running image can resolve relocated component
//! references itself.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::consts::RELOCATION_MOUNT_PATH;
use crate::driver::Operation;

#[derive(Debug, Error)]
pub enum RelocationError {
  #[error("failed to read relocation mapping from {path}: {source}")]
  MappingLoad {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to unmarshal relocation mapping: {0}")]
  MappingParse(#[source] serde_json::Error),

  #[error("invocation image {image} not present in relocation mapping with keys {known:?}")]
  RelocationMiss { image: String, known: Vec<String> },
}

/// Rewrites operations according to a relocation map.
#[derive(Debug)]
pub enum OpRelocator {
  /// No relocation map was supplied; operations pass through untouched.
  Identity,

  /// Operations are rewritten against the loaded map.
  Mapped {
    map: BTreeMap<String, String>,
    /// The mapping file's bytes as read, mounted verbatim.
    raw: String,
  },
}

impl OpRelocator {
  /// Build a relocator from an optional mapping file.
  ///
  /// Load and parse failures surface here, before any operation is
  /// touched.
  pub fn from_file(path: Option<&Path>) -> Result<Self, RelocationError> {
    let Some(path) = path else {
      return Ok(OpRelocator::Identity);
    };
    let raw = fs::read_to_string(path).map_err(|source| RelocationError::MappingLoad {
      path: path.to_path_buf(),
      source,
    })?;
    let map = serde_json::from_str(&raw).map_err(RelocationError::MappingParse)?;
    Ok(OpRelocator::Mapped { map, raw })
  }

  /// Rewrite the operation's invocation image and mount the raw map.
  ///
  /// On a miss the operation is left untouched. Applying a mapped
  /// relocator twice fails unless the relocated reference is itself a key
  /// in the map.
  pub fn relocate(&self, op: &mut Operation) -> Result<(), RelocationError> {
    let OpRelocator::Mapped { map, raw } = self else {
      return Ok(());
    };
    let Some(relocated) = map.get(&op.image) else {
      return Err(RelocationError::RelocationMiss {
        image: op.image.clone(),
        known: map.keys().cloned().collect(),
      });
    };
    op.image = relocated.clone();
    op.files.insert(RELOCATION_MOUNT_PATH.to_string(), raw.clone());
    Ok(())
  }
}
