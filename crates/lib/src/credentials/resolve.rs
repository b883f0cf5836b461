//! Multi-source credential resolution.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use super::{CredentialError, CredentialSet};
use crate::bundle::Bundle;

/// Merge credential sets and filter to the bundle's requirements.
///
/// Files are processed in the order given; a later file unconditionally
/// overwrites an earlier value for the same logical name. Names the bundle
/// does not declare are dropped. Names the bundle declares but no file
/// supplies are left absent — whether that is fatal is the caller's
/// policy, not the resolver's.
pub fn resolve(files: &[PathBuf], bundle: &Bundle) -> Result<BTreeMap<String, String>, CredentialError> {
  let mut merged = BTreeMap::new();
  for file in files {
    let set = CredentialSet::load(file)?;
    debug!(set = %set.name, file = %file.display(), "loaded credential set");
    for strategy in &set.credentials {
      let value = strategy.source.resolve(&strategy.name)?;
      merged.insert(strategy.name.clone(), value);
    }
  }
  merged.retain(|name, _| bundle.credentials.contains_key(name));
  Ok(merged)
}
