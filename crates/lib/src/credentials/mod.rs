//! Credential sets and their sources.
//!
//! A credential set is an ordered list of strategies, each mapping a
//! logical credential name to the source its value comes from. Sets are
//! loaded fresh from YAML files per invocation; nothing here persists
//! beyond the files the operator supplies.
//!
//! # File format
//!
//! ```yaml
//! name: staging
//! credentials:
//!   - name: registry-token
//!     source:
//!       env: STAGING_REGISTRY_TOKEN
//!   - name: kubeconfig
//!     source:
//!       path: /home/operator/.kube/config
//! ```

mod resolve;

pub use resolve::resolve;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
  #[error("failed to read credential set {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse credential set {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("credential {name}: environment variable {var} is not set")]
  EnvMissing { name: String, var: String },

  #[error("credential {name}: failed to read {path}: {source}")]
  File {
    name: String,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("credential {name}: failed to run command: {source}")]
  Command {
    name: String,
    #[source]
    source: io::Error,
  },

  #[error("credential {name}: command exited with {status}")]
  CommandFailed { name: String, status: ExitStatus },
}

/// A named, ordered list of credential strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSet {
  pub name: String,
  pub credentials: Vec<CredentialStrategy>,
}

/// Maps one logical credential name to the source of its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialStrategy {
  pub name: String,
  pub source: Source,
}

/// Where a credential value comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  /// A literal value.
  Value(String),

  /// An environment variable to read.
  Env(String),

  /// A file whose contents are the value.
  Path(PathBuf),

  /// A command whose stdout is the value.
  Command(String),
}

impl CredentialSet {
  /// Load a credential set from a YAML file.
  pub fn load(path: &Path) -> Result<Self, CredentialError> {
    let content = fs::read_to_string(path).map_err(|source| CredentialError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| CredentialError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}

impl Source {
  /// Resolve this source to its final string value.
  ///
  /// `name` is the logical credential name, used for error context.
  pub fn resolve(&self, name: &str) -> Result<String, CredentialError> {
    match self {
      Source::Value(value) => Ok(value.clone()),
      Source::Env(var) => std::env::var(var).map_err(|_| CredentialError::EnvMissing {
        name: name.to_string(),
        var: var.clone(),
      }),
      Source::Path(path) => fs::read_to_string(path).map_err(|source| CredentialError::File {
        name: name.to_string(),
        path: path.clone(),
        source,
      }),
      Source::Command(command) => {
        let (shell, flag) = shell();
        let output = Command::new(shell)
          .arg(flag)
          .arg(command)
          .output()
          .map_err(|source| CredentialError::Command {
            name: name.to_string(),
            source,
          })?;
        if !output.status.success() {
          return Err(CredentialError::CommandFailed {
            name: name.to_string(),
            status: output.status,
          });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
      }
    }
  }
}

#[cfg(unix)]
fn shell() -> (&'static str, &'static str) {
  ("/bin/sh", "-c")
}

#[cfg(windows)]
fn shell() -> (&'static str, &'static str) {
  ("cmd.exe", "/C")
}

/// Locate a credential set file for `name`.
///
/// A name that contains a path separator, or that resolves as a path
/// as-is, is used verbatim. Otherwise `<dir>/<name>.yaml` is probed, then
/// `<dir>/<name>.yml`; if neither exists the `.yaml` candidate is
/// returned so the subsequent read reports a useful error.
pub fn find_credentials(dir: &Path, name: &str) -> PathBuf {
  if name.contains(['/', '\\']) || Path::new(name).exists() {
    return PathBuf::from(name);
  }
  let yaml = dir.join(format!("{name}.yaml"));
  if yaml.exists() {
    return yaml;
  }
  let yml = dir.join(format!("{name}.yml"));
  if yml.exists() {
    return yml;
  }
  yaml
}

#[cfg(test)]
mod tests {
  use serial_test::serial;
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn parses_a_yaml_credential_set() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("staging.yaml");
    fs::write(
      &path,
      "name: staging\ncredentials:\n  - name: registry-token\n    source:\n      value: hunter2\n",
    )
    .unwrap();

    let set = CredentialSet::load(&path).unwrap();
    assert_eq!(set.name, "staging");
    assert_eq!(set.credentials.len(), 1);
    assert_eq!(set.credentials[0].name, "registry-token");
    assert_eq!(set.credentials[0].source, Source::Value("hunter2".to_string()));
  }

  #[test]
  fn malformed_yaml_is_a_parse_error() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bad.yaml");
    fs::write(&path, "credentials: [unclosed").unwrap();
    assert!(matches!(CredentialSet::load(&path), Err(CredentialError::Parse { .. })));
  }

  #[test]
  fn value_source_resolves_to_the_literal() {
    assert_eq!(Source::Value("secret".to_string()).resolve("x").unwrap(), "secret");
  }

  #[test]
  #[serial]
  fn env_source_reads_the_variable() {
    temp_env::with_var("HOLDALL_CRED_TEST", Some("from-env"), || {
      let source = Source::Env("HOLDALL_CRED_TEST".to_string());
      assert_eq!(source.resolve("x").unwrap(), "from-env");
    });
  }

  #[test]
  #[serial]
  fn missing_env_variable_is_an_error() {
    temp_env::with_var("HOLDALL_CRED_TEST", None::<&str>, || {
      let source = Source::Env("HOLDALL_CRED_TEST".to_string());
      assert!(matches!(source.resolve("x"), Err(CredentialError::EnvMissing { .. })));
    });
  }

  #[test]
  fn path_source_reads_the_file() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("token");
    fs::write(&path, "file-secret").unwrap();
    assert_eq!(Source::Path(path).resolve("x").unwrap(), "file-secret");
  }

  #[test]
  #[cfg(unix)]
  fn command_source_captures_stdout_without_trailing_newline() {
    let source = Source::Command("echo command-secret".to_string());
    assert_eq!(source.resolve("x").unwrap(), "command-secret");
  }

  #[test]
  #[cfg(unix)]
  fn failing_command_is_an_error() {
    let source = Source::Command("exit 3".to_string());
    assert!(matches!(source.resolve("x"), Err(CredentialError::CommandFailed { .. })));
  }

  #[test]
  fn find_credentials_probes_yaml_then_yml() {
    let temp = tempdir().unwrap();

    fs::write(temp.path().join("creds1.yaml"), "x").unwrap();
    assert_eq!(find_credentials(temp.path(), "creds1"), temp.path().join("creds1.yaml"));

    fs::write(temp.path().join("creds2.yml"), "x").unwrap();
    assert_eq!(find_credentials(temp.path(), "creds2"), temp.path().join("creds2.yml"));
  }

  #[test]
  fn find_credentials_prefers_yaml_over_yml() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("both.yaml"), "x").unwrap();
    fs::write(temp.path().join("both.yml"), "x").unwrap();
    assert_eq!(find_credentials(temp.path(), "both"), temp.path().join("both.yaml"));
  }

  #[test]
  fn find_credentials_uses_paths_verbatim() {
    let temp = tempdir().unwrap();
    let explicit = temp.path().join("testing.yaml");
    fs::write(&explicit, "x").unwrap();

    let input = explicit.to_string_lossy().to_string();
    assert_eq!(find_credentials(temp.path(), &input), explicit);
  }

  #[test]
  fn find_credentials_falls_back_to_the_yaml_candidate() {
    let temp = tempdir().unwrap();
    assert_eq!(find_credentials(temp.path(), "ghost"), temp.path().join("ghost.yaml"));
  }
}
