//! The repository index: a flat map from `name-version` to bundle digest.
//!
//! The index is the lookup half of the store invariant: an entry exists if
//! and only if the digest-named blob exists in the bundles area. Saves are
//! atomic (temp file + rename) so a crash never leaves a half-written
//! index.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bundle::marshal::Digest;

/// Errors reading or writing the repository index.
#[derive(Debug, Error)]
pub enum RepositoryError {
  #[error("failed to read repository index: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write repository index: {0}")]
  Write(#[source] io::Error),

  #[error("failed to parse repository index: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize repository index: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// The `name-version` → digest index of stored bundles.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryIndex {
  entries: BTreeMap<String, String>,
}

impl RepositoryIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load the index. A missing or empty file is an empty index.
  pub fn load(path: &Path) -> Result<Self, RepositoryError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
      Err(e) => return Err(RepositoryError::Read(e)),
    };
    if content.trim().is_empty() {
      return Ok(Self::new());
    }
    serde_json::from_str(&content).map_err(RepositoryError::Parse)
  }

  /// Save atomically: write `<path>.tmp`, then rename over the index.
  pub fn save(&self, path: &Path) -> Result<(), RepositoryError> {
    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(self).map_err(RepositoryError::Serialize)?;
    fs::write(&temp_path, content).map_err(RepositoryError::Write)?;
    fs::rename(&temp_path, path).map_err(RepositoryError::Write)
  }

  pub fn insert(&mut self, key: String, digest: &Digest) {
    self.entries.insert(key, digest.0.clone());
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.entries.get(key).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
    self.entries.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn missing_file_loads_as_empty_index() {
    let temp = tempdir().unwrap();
    let index = RepositoryIndex::load(&temp.path().join("repositories.json")).unwrap();
    assert!(index.is_empty());
  }

  #[test]
  fn empty_file_loads_as_empty_index() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("repositories.json");
    fs::write(&path, "").unwrap();
    assert!(RepositoryIndex::load(&path).unwrap().is_empty());
  }

  #[test]
  fn save_then_load_roundtrips() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("repositories.json");

    let mut index = RepositoryIndex::new();
    index.insert("examplebun-0.1.0".to_string(), &Digest("abc123".to_string()));
    index.save(&path).unwrap();

    let loaded = RepositoryIndex::load(&path).unwrap();
    assert_eq!(loaded.get("examplebun-0.1.0"), Some("abc123"));
    assert_eq!(loaded.len(), 1);
  }

  #[test]
  fn save_leaves_no_temp_file_behind() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("repositories.json");
    RepositoryIndex::new().save(&path).unwrap();

    assert!(path.is_file());
    assert!(!path.with_extension("json.tmp").exists());
  }

  #[test]
  fn malformed_index_is_a_parse_error() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("repositories.json");
    fs::write(&path, "not json").unwrap();
    assert!(matches!(RepositoryIndex::load(&path), Err(RepositoryError::Parse(_))));
  }
}
