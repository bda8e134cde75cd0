//! Tree-wide configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{TreeError, TreeResult};
use super::schema::Schema;
use crate::key::Segment;
use crate::store::config::{default_delimiter, delimiter_from_json};

/// Root segment used when none is configured
pub const DEFAULT_PREFIX: &str = "cache";

const CONFIG_FILES: [&str; 2] = ["cachetree.yaml", "cachetree.yml"];

/// Options fixed when a tree is created and read by every node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
  /// Root key segment (default: `cache`)
  #[serde(default = "default_prefix")]
  pub prefix: Segment,

  /// Separator used when joining keys (default: `:`)
  #[serde(default = "default_delimiter")]
  pub delimiter: String,

  /// Fixed children are read as properties instead of called
  #[serde(default, alias = "useProperties")]
  pub use_properties: bool,

  /// Log filter used by the CLI when `RUST_LOG` is unset
  #[serde(default = "default_log_level")]
  pub log_level: String,

  /// Children registered on the root, in plain-data schema form
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub schema: Option<serde_json::Value>,
}

fn default_prefix() -> Segment {
  Segment::from(DEFAULT_PREFIX)
}

fn default_log_level() -> String {
  "info".into()
}

impl Default for TreeConfig {
  fn default() -> Self {
    Self {
      prefix: default_prefix(),
      delimiter: default_delimiter(),
      use_properties: false,
      log_level: default_log_level(),
      schema: None,
    }
  }
}

impl TreeConfig {
  /// Defaults overridden by whatever `value` carries (see [`merge_value`])
  ///
  /// [`merge_value`]: TreeConfig::merge_value
  pub fn from_value(value: &serde_json::Value) -> Self {
    let mut config = Self::default();
    config.merge_value(value);
    config
  }

  /// Copy recognised options from plain data.
  ///
  /// An option is taken only when present with the expected type; unknown
  /// members and mistyped values are ignored and the current value kept.
  pub fn merge_value(&mut self, value: &serde_json::Value) {
    let Some(map) = value.as_object() else {
      return;
    };

    for (name, member) in map {
      let applied = match name.as_str() {
        "prefix" => match Segment::from_json(member).filter(Segment::is_valid) {
          Some(prefix) => {
            self.prefix = prefix;
            true
          }
          None => false,
        },
        "delimiter" => match delimiter_from_json(member) {
          Some(delimiter) => {
            self.delimiter = delimiter;
            true
          }
          None => false,
        },
        "use_properties" | "useProperties" => match member.as_bool() {
          Some(flag) => {
            self.use_properties = flag;
            true
          }
          None => false,
        },
        "log_level" => match member.as_str() {
          Some(level) => {
            self.log_level = level.to_string();
            true
          }
          None => false,
        },
        "schema" if member.is_object() => {
          self.schema = Some(member.clone());
          true
        }
        _ => false,
      };
      if !applied {
        tracing::debug!("ignoring config option '{}' = {}", name, member);
      }
    }
  }

  /// Compile the configured root schema, if any
  pub fn schema(&self) -> TreeResult<Option<Schema>> {
    self.schema.as_ref().map(Schema::from_json).transpose()
  }

  /// Parse YAML text leniently, expanding `$VAR` / `${VAR}` first
  pub fn from_yaml_str(content: &str) -> TreeResult<Self> {
    let expanded = expand_env_vars(content);
    let value: serde_json::Value =
      serde_yaml::from_str(&expanded).map_err(|e| TreeError::Config(e.to_string()))?;
    Ok(Self::from_value(&value))
  }

  pub fn from_file(path: impl AsRef<Path>) -> TreeResult<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|e| TreeError::Config(format!("{}: {}", path.display(), e)))?;
    Self::from_yaml_str(&content)
  }

  pub fn find_and_load() -> TreeResult<Option<Self>> {
    for p in CONFIG_FILES {
      if Path::new(p).exists() {
        tracing::info!("Loading config from {}", p);
        return Ok(Some(Self::from_file(p)?));
      }
    }
    Ok(None)
  }
}

/// Replace `${NAME}` and `$NAME` with environment values (empty if unset)
fn expand_env_vars(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut chars = input.chars().peekable();

  while let Some(c) = chars.next() {
    if c != '$' {
      out.push(c);
      continue;
    }

    let mut name = String::new();
    if chars.peek() == Some(&'{') {
      chars.next();
      let mut closed = false;
      for n in chars.by_ref() {
        if n == '}' {
          closed = true;
          break;
        }
        name.push(n);
      }
      if !closed {
        out.push_str("${");
        out.push_str(&name);
        continue;
      }
    } else {
      while let Some(&n) = chars.peek() {
        if n.is_ascii_alphanumeric() || n == '_' {
          name.push(n);
          chars.next();
        } else {
          break;
        }
      }
      if name.is_empty() {
        out.push('$');
        continue;
      }
    }
    out.push_str(&std::env::var(&name).unwrap_or_default());
  }

  out
}
