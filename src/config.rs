//! Configuration shared by both merge engines.
//!
//! ```rust
//! use chronoweave::MergeConfig;
//! use std::time::Duration;
//!
//! let config = MergeConfig::from_json_str(r#"{ "name": "ticks", "fetch_timeout_ms": 250 }"#).unwrap();
//! assert_eq!(config.name(), Some("ticks"));
//! assert_eq!(config.fetch_timeout(), Some(Duration::from_millis(250)));
//! ```

use crate::error::ComponentInfo;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a merge engine.
///
/// Every field is optional; an empty JSON object gives the default, which waits
/// on every fetch indefinitely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
  /// Optional name for identifying this merger in logs and errors.
  pub name: Option<String>,
  /// Longest the pipelined engine waits on one outstanding fetch once it needs
  /// the result. `None` waits forever. Ignored by the blocking engine.
  #[serde(rename = "fetch_timeout_ms", with = "duration_ms")]
  pub fetch_timeout: Option<Duration>,
}

impl MergeConfig {
  /// Creates the default configuration.
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the name for this merger.
  #[must_use]
  pub fn with_name(mut self, name: String) -> Self {
    self.name = Some(name);
    self
  }

  /// Bounds how long the pipelined engine waits on a single fetch.
  #[must_use]
  pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
    self.fetch_timeout = Some(timeout);
    self
  }

  /// Returns the current name, if set.
  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  /// Returns the fetch timeout, if set.
  pub fn fetch_timeout(&self) -> Option<Duration> {
    self.fetch_timeout
  }

  /// Parses a configuration from JSON.
  ///
  /// # Errors
  ///
  /// Returns the `serde_json` error for malformed input or unknown value types.
  pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  /// Builds the [`ComponentInfo`] reported in errors, falling back to
  /// `default_name` when no name is configured.
  pub fn component_info(&self, default_name: &str, type_name: &str) -> ComponentInfo {
    ComponentInfo::new(
      self
        .name
        .clone()
        .unwrap_or_else(|| default_name.to_string()),
      type_name.to_string(),
    )
  }
}

mod duration_ms {
  use serde::{Deserialize, Deserializer, Serializer};
  use std::time::Duration;

  pub fn serialize<S: Serializer>(
    value: &Option<Duration>,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    match value {
      Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
  }
}
