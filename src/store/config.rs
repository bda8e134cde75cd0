//! Memory store configuration

use serde::{Deserialize, Serialize};

/// Options for [`MemoryStore`](super::MemoryStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
  /// Separator used to join compound keys (default: `:`)
  #[serde(default = "default_delimiter")]
  pub delimiter: String,
}

pub(crate) fn default_delimiter() -> String {
  ":".to_string()
}

impl Default for MemoryStoreConfig {
  fn default() -> Self {
    Self {
      delimiter: default_delimiter(),
    }
  }
}

impl MemoryStoreConfig {
  /// Lenient construction from plain data. A non-empty string or a number
  /// is accepted as the delimiter; anything else keeps the default.
  pub fn from_value(value: &serde_json::Value) -> Self {
    let mut config = Self::default();
    if let Some(delimiter) = value.get("delimiter").and_then(delimiter_from_json) {
      config.delimiter = delimiter;
    }
    config
  }
}

/// Delimiter accepted from plain data: non-empty string or any number
pub(crate) fn delimiter_from_json(value: &serde_json::Value) -> Option<String> {
  match value {
    serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
    serde_json::Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}
