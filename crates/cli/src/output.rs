//! CLI output formatting utilities.

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ARROW: &str = "→";
}

/// Shorten a digest for display.
pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(12);
  &hash[..len]
}
