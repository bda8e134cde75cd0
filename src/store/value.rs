//! Field value types

use serde::{Deserialize, Serialize};

/// A stored field value (JSON-compatible)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
  #[default]
  Null,
  Bool(bool),
  Integer(i64),
  String(String),
  Json(serde_json::Value),
}

impl FieldValue {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      FieldValue::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      FieldValue::Integer(i) => Some(*i),
      FieldValue::String(s) => s.parse().ok(),
      _ => None,
    }
  }

  /// Field name form of this value, used when a flat `set` argument list
  /// names its fields. Only strings and integers can name a field.
  pub fn as_field_name(&self) -> Option<String> {
    match self {
      FieldValue::String(s) => Some(s.clone()),
      FieldValue::Integer(i) => Some(i.to_string()),
      _ => None,
    }
  }

  /// Plain text rendering (no JSON quoting for strings)
  pub fn to_plain_string(&self) -> String {
    match self {
      FieldValue::Null => "".to_string(),
      FieldValue::Bool(b) => b.to_string(),
      FieldValue::Integer(i) => i.to_string(),
      FieldValue::String(s) => s.clone(),
      FieldValue::Json(v) => v.to_string(),
    }
  }

  /// Parse command-line style text. Integers, booleans and JSON documents
  /// are recognised, anything else stays a string.
  pub fn parse_text(s: &str) -> Self {
    match serde_json::from_str::<serde_json::Value>(s) {
      Ok(v @ (serde_json::Value::Array(_) | serde_json::Value::Object(_))) => FieldValue::Json(v),
      Ok(serde_json::Value::Number(n)) => match n.as_i64() {
        Some(i) => FieldValue::Integer(i),
        None => FieldValue::Json(serde_json::Value::Number(n)),
      },
      Ok(serde_json::Value::Bool(b)) => FieldValue::Bool(b),
      _ => FieldValue::String(s.to_string()),
    }
  }
}

impl From<String> for FieldValue {
  fn from(s: String) -> Self {
    FieldValue::String(s)
  }
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self {
    FieldValue::String(s.to_string())
  }
}

impl From<i64> for FieldValue {
  fn from(i: i64) -> Self {
    FieldValue::Integer(i)
  }
}

impl From<i32> for FieldValue {
  fn from(i: i32) -> Self {
    FieldValue::Integer(i as i64)
  }
}

impl From<bool> for FieldValue {
  fn from(b: bool) -> Self {
    FieldValue::Bool(b)
  }
}

impl From<serde_json::Value> for FieldValue {
  fn from(v: serde_json::Value) -> Self {
    match v {
      serde_json::Value::Null => FieldValue::Null,
      serde_json::Value::Bool(b) => FieldValue::Bool(b),
      serde_json::Value::Number(n) => {
        if let Some(i) = n.as_i64() {
          FieldValue::Integer(i)
        } else {
          FieldValue::Json(serde_json::Value::Number(n))
        }
      }
      serde_json::Value::String(s) => FieldValue::String(s),
      other => FieldValue::Json(other),
    }
  }
}

impl std::fmt::Display for FieldValue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.to_plain_string())
  }
}
