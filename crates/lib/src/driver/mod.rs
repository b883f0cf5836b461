//! Driver operations and environment-driven driver configuration.
//!
//! A driver executes a bundle's invocation image; this crate only prepares
//! the [`Operation`] handed to it. Drivers expose their configuration
//! surface through [`Configurable`], and [`configure_driver`] injects the
//! subset of options present in the process environment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The unit handed to a driver for execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
  /// Reference of the invocation image to run.
  pub image: String,

  /// Files to materialize inside the invocation image, path → contents.
  #[serde(default)]
  pub files: BTreeMap<String, String>,

  /// Ambient environment for the invocation image.
  #[serde(default)]
  pub environment: BTreeMap<String, String>,
}

/// A driver whose options can be configured before invocation.
pub trait Configurable {
  /// Declared configuration keys and their informational defaults.
  fn config(&self) -> BTreeMap<String, String>;

  /// Replace the driver's configuration values.
  fn set_config(&mut self, values: BTreeMap<String, String>);
}

/// Inject environment-derived configuration into a driver.
///
/// Each declared key is looked up as an environment variable of the same
/// name; a variable that is set but empty still counts as set. Declared
/// defaults are informational and never substituted here. `set_config` is
/// called exactly once, with an empty map when nothing is set.
pub fn configure_driver(configurable: &mut dyn Configurable) {
  let mut values = BTreeMap::new();
  for key in configurable.config().keys() {
    if let Ok(value) = std::env::var(key) {
      values.insert(key.clone(), value);
    }
  }
  configurable.set_config(values);
}

#[cfg(test)]
mod tests {
  use serial_test::serial;
  use temp_env::with_vars;

  use super::*;

  struct FakeDriver {
    options: BTreeMap<String, String>,
    values: Option<BTreeMap<String, String>>,
    set_calls: usize,
  }

  impl FakeDriver {
    fn with_options(options: &[(&str, &str)]) -> Self {
      Self {
        options: options.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        values: None,
        set_calls: 0,
      }
    }
  }

  impl Configurable for FakeDriver {
    fn config(&self) -> BTreeMap<String, String> {
      self.options.clone()
    }

    fn set_config(&mut self, values: BTreeMap<String, String>) {
      self.values = Some(values);
      self.set_calls += 1;
    }
  }

  #[test]
  #[serial]
  fn no_declared_options_still_calls_set_config_once() {
    let mut driver = FakeDriver::with_options(&[]);
    configure_driver(&mut driver);
    assert_eq!(driver.set_calls, 1);
    assert_eq!(driver.values, Some(BTreeMap::new()));
  }

  #[test]
  #[serial]
  fn unset_variables_produce_an_empty_map() {
    with_vars(
      [("HOLDALL_TEST_ONE", None::<&str>), ("HOLDALL_TEST_TWO", None)],
      || {
        let mut driver =
          FakeDriver::with_options(&[("HOLDALL_TEST_ONE", "first"), ("HOLDALL_TEST_TWO", "second")]);
        configure_driver(&mut driver);
        assert_eq!(driver.set_calls, 1);
        assert_eq!(driver.values, Some(BTreeMap::new()));
      },
    );
  }

  #[test]
  #[serial]
  fn only_the_present_subset_is_injected() {
    with_vars(
      [
        ("HOLDALL_TEST_ONE", None::<&str>),
        ("HOLDALL_TEST_TWO", Some("FOO")),
        ("HOLDALL_TEST_THREE", Some("BAR")),
      ],
      || {
        let mut driver = FakeDriver::with_options(&[
          ("HOLDALL_TEST_ONE", "first"),
          ("HOLDALL_TEST_TWO", "second"),
          ("HOLDALL_TEST_THREE", "third"),
        ]);
        configure_driver(&mut driver);

        let values = driver.values.unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("HOLDALL_TEST_TWO").map(String::as_str), Some("FOO"));
        assert_eq!(values.get("HOLDALL_TEST_THREE").map(String::as_str), Some("BAR"));
      },
    );
  }

  #[test]
  #[serial]
  fn set_but_empty_counts_as_set() {
    with_vars([("HOLDALL_TEST_ONE", Some(""))], || {
      let mut driver = FakeDriver::with_options(&[("HOLDALL_TEST_ONE", "default ignored")]);
      configure_driver(&mut driver);
      assert_eq!(
        driver.values,
        Some(BTreeMap::from([("HOLDALL_TEST_ONE".to_string(), String::new())]))
      );
    });
  }

  #[test]
  #[serial]
  fn declared_defaults_are_never_substituted() {
    with_vars([("HOLDALL_TEST_ONE", Some("from env"))], || {
      let mut driver = FakeDriver::with_options(&[("HOLDALL_TEST_ONE", "from defaults")]);
      configure_driver(&mut driver);
      assert_eq!(
        driver.values.unwrap().get("HOLDALL_TEST_ONE").map(String::as_str),
        Some("from env")
      );
    });
  }
}
