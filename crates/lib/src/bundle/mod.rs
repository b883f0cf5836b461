//! Bundle definition types.
//!
//! A bundle describes a packaged application: the invocation images that
//! carry out its actions, the component images it ships, the credentials an
//! execution needs, and the actions it supports. Bundles are immutable once
//! loaded and are identified by the digest of their canonical encoding (see
//! [`marshal`]).
//!
//! # Wire format
//!
//! ```json
//! {
//!   "name": "examplebun",
//!   "version": "0.1.0",
//!   "invocationImages": [
//!     { "image": "example.com/examplebun:0.1.0", "imageType": "docker" }
//!   ],
//!   "images": { "web": { "image": "example.com/web:1.2.0" } },
//!   "credentials": { "registry-token": { "env": "REGISTRY_TOKEN" } },
//!   "actions": { "status": { "modifies": false } }
//! }
//! ```

pub mod marshal;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a bundle definition from disk.
#[derive(Debug, Error)]
pub enum BundleError {
  /// The definition file could not be read.
  #[error("failed to read bundle definition {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The definition file is not valid JSON for a bundle.
  #[error("failed to parse bundle definition: {0}")]
  Parse(#[source] serde_json::Error),

  /// The definition parsed but fails semantic checks.
  #[error("invalid bundle: {0}")]
  Invalid(#[from] ValidationError),
}

/// Semantic checks a bundle definition must pass.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("bundle name must not be empty")]
  EmptyName,

  #[error("bundle version must not be empty")]
  EmptyVersion,

  #[error("bundle declares no invocation images")]
  NoInvocationImages,

  #[error("invocation image reference must not be empty")]
  EmptyInvocationImage,

  #[error("credential {0} declares no delivery location")]
  CredentialWithoutLocation(String),
}

/// A packaged application descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
  pub name: String,
  pub version: String,

  /// Images that carry out this bundle's actions. The first entry is the
  /// one handed to the driver.
  pub invocation_images: Vec<InvocationImage>,

  /// Component images shipped with the bundle, keyed by logical name.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub images: BTreeMap<String, Image>,

  /// Credentials the bundle requires, keyed by logical name.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub credentials: BTreeMap<String, Credential>,

  /// Actions the bundle supports.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub actions: BTreeMap<String, Action>,
}

/// An image that performs the bundle's actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationImage {
  pub image: String,

  #[serde(default = "default_image_type")]
  pub image_type: String,
}

/// A component image shipped with the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
  pub image: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// Where a required credential is delivered inside the invocation image.
///
/// At least one of `env` and `path` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
  /// Environment variable the value is surfaced as.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub env: Option<String>,

  /// In-container file path the value is written to.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,
}

/// An action the bundle supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
  /// Whether running the action can change the installation.
  #[serde(default)]
  pub modifies: bool,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

fn default_image_type() -> String {
  "docker".to_string()
}

impl Bundle {
  /// Load and validate a bundle definition from a JSON file.
  pub fn load(path: &Path) -> Result<Self, BundleError> {
    let content = fs::read_to_string(path).map_err(|source| BundleError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let bundle: Bundle = serde_json::from_str(&content).map_err(BundleError::Parse)?;
    bundle.validate()?;
    Ok(bundle)
  }

  /// Check the semantic invariants of the definition.
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.name.is_empty() {
      return Err(ValidationError::EmptyName);
    }
    if self.version.is_empty() {
      return Err(ValidationError::EmptyVersion);
    }
    if self.invocation_images.is_empty() {
      return Err(ValidationError::NoInvocationImages);
    }
    if self.invocation_images.iter().any(|i| i.image.is_empty()) {
      return Err(ValidationError::EmptyInvocationImage);
    }
    for (name, credential) in &self.credentials {
      if credential.env.is_none() && credential.path.is_none() {
        return Err(ValidationError::CredentialWithoutLocation(name.clone()));
      }
    }
    Ok(())
  }

  /// Repository index key for this bundle.
  pub fn key(&self) -> String {
    format!("{}-{}", self.name, self.version)
  }

  /// Every image reference the bundle carries: invocation images first,
  /// then component images in name order.
  pub fn image_refs(&self) -> Vec<String> {
    let mut refs: Vec<String> = self.invocation_images.iter().map(|i| i.image.clone()).collect();
    refs.extend(self.images.values().map(|i| i.image.clone()));
    refs
  }
}
