//! Canonical encoding and content digest for bundles.
//!
//! Two bundles with the same semantic content must canonicalize to
//! byte-identical output. Keys are emitted in sorted order (the
//! `serde_json::Value` object map is BTree-backed), arrays keep their
//! declared order, and the encoding is compact. A single trailing newline
//! is appended before digesting: the digest identifies the file as
//! written, not an abstract value, so the newline is itself hashed.
//! Removing it would change every digest and is a breaking format change.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Bundle;
use crate::util::hash::hash_bytes;

/// Content digest of a bundle's canonical encoding.
///
/// Lowercase hex SHA-256, 64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(pub String);

impl std::fmt::Display for Digest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The bundle contains a value the canonical encoder cannot represent.
#[derive(Debug, Error)]
pub enum EncodingError {
  #[error("cannot canonicalize bundle: {0}")]
  Unrepresentable(#[from] serde_json::Error),
}

/// Canonically encode the bundle and compute its digest.
///
/// Pure: no side effects, byte-identical output for equal inputs.
pub fn marshal(bundle: &Bundle) -> Result<(Vec<u8>, Digest), EncodingError> {
  let value = serde_json::to_value(bundle)?;
  let mut data = serde_json::to_vec(&value)?;
  data.push(b'\n');
  let digest = Digest(hash_bytes(&data));
  Ok((data, digest))
}
