//! Hashing for content addressing.

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 of the given bytes.
pub fn hash_bytes(data: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(data);
  hex::encode(hasher.finalize())
}
