//! The capability set a backing store must provide

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};

use super::pattern::KeyPattern;
use super::value::FieldValue;
use crate::key::CompoundKey;

/// Store operation error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
  #[error("Invalid key")]
  InvalidKey,
  #[error("Invalid field")]
  InvalidField,
  #[error("Invalid data")]
  InvalidData,
  #[error("Invalid pattern: {0}")]
  InvalidPattern(String),
  #[error("Operation not supported: {0}")]
  Unsupported(&'static str),
  /// Errors raised by an external store, passed through unchanged
  #[error("{0}")]
  Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a `get`, shaped by how many fields were requested
#[derive(Debug, Clone, PartialEq)]
pub enum FieldReply {
  /// No fields requested: every stored field of the key
  All(BTreeMap<String, FieldValue>),
  /// Exactly one field requested; `None` when it was never stored
  Value(Option<FieldValue>),
  /// Several fields requested; each maps to `None` when missing
  Fields(BTreeMap<String, Option<FieldValue>>),
}

impl FieldReply {
  /// The single-field value, if this reply has that shape
  pub fn value(&self) -> Option<&FieldValue> {
    match self {
      FieldReply::Value(v) => v.as_ref(),
      _ => None,
    }
  }

  pub fn into_value(self) -> Option<FieldValue> {
    match self {
      FieldReply::Value(v) => v,
      _ => None,
    }
  }

  /// Flatten into a field map (missing fields dropped)
  pub fn into_map(self) -> BTreeMap<String, FieldValue> {
    match self {
      FieldReply::All(map) => map,
      FieldReply::Value(_) => BTreeMap::new(),
      FieldReply::Fields(map) => map
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
        .collect(),
    }
  }
}

/// Normalized field/value writes for `set`.
///
/// Built from a single pair, a flat alternating `field, value, ...` list or
/// an object of fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldWrites {
  pairs: Vec<(String, FieldValue)>,
}

impl FieldWrites {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn pair(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
    Self::new().with(field, value)
  }

  pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
    self.pairs.push((field.into(), value.into()));
    self
  }

  /// Alternating `field, value` items. A single object item is read as an
  /// object of fields and a trailing unpaired field is ignored.
  pub fn from_flat(items: Vec<FieldValue>) -> StoreResult<Self> {
    if items.len() == 1 {
      return match items.into_iter().next() {
        Some(FieldValue::Json(value)) => Self::from_object(value),
        _ => Err(StoreError::InvalidData),
      };
    }
    if items.len() < 2 {
      return Err(StoreError::InvalidData);
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
      let field = field.as_field_name().ok_or(StoreError::InvalidField)?;
      pairs.push((field, value));
    }
    Ok(Self { pairs })
  }

  /// Every member of a JSON object becomes a field write
  pub fn from_object(value: serde_json::Value) -> StoreResult<Self> {
    match value {
      serde_json::Value::Object(map) => Ok(Self {
        pairs: map
          .into_iter()
          .map(|(k, v)| (k, FieldValue::from(v)))
          .collect(),
      }),
      _ => Err(StoreError::InvalidData),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.pairs.is_empty()
  }

  pub fn len(&self) -> usize {
    self.pairs.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
    self.pairs.iter().map(|(f, v)| (f.as_str(), v))
  }

  /// Number of distinct field names written
  pub fn distinct_fields(&self) -> usize {
    self
      .pairs
      .iter()
      .map(|(f, _)| f.as_str())
      .collect::<HashSet<_>>()
      .len()
  }

  pub fn into_pairs(self) -> Vec<(String, FieldValue)> {
    self.pairs
  }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FieldWrites {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self {
      pairs: iter
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    }
  }
}

/// Backing store contract.
///
/// Keys are compound keys; the store decides how they are joined. Every
/// call resolves exactly once with its result or error.
#[async_trait]
pub trait Store: Send + Sync {
  /// Read fields of `key`, see [`FieldReply`] for the reply shapes
  async fn get(&self, key: &CompoundKey, fields: &[&str]) -> StoreResult<FieldReply>;

  /// Merge writes into the key's fields; reports distinct fields touched
  async fn set(&self, key: &CompoundKey, writes: FieldWrites) -> StoreResult<usize>;

  /// Whether `field` is stored under `key` (any field when `None`)
  async fn exists(&self, key: &CompoundKey, field: Option<&str>) -> StoreResult<bool>;

  /// Remove fields; reports how many were actually removed
  async fn del(&self, key: &CompoundKey, fields: &[&str]) -> StoreResult<usize>;

  /// Joined keys matching `pattern`
  async fn keys(&self, pattern: &KeyPattern) -> StoreResult<Vec<String>>;

  /// Drop whole keys; reports how many existed
  async fn flush(&self, keys: &[CompoundKey]) -> StoreResult<usize>;

  /// Delimiter the store joins compound keys with, if it has a fixed one
  fn key_delimiter(&self) -> Option<&str> {
    None
  }

  /// Whether the extended `fields` operation is implemented
  fn supports_fields(&self) -> bool {
    false
  }

  /// Field names stored under `key`
  async fn fields(&self, key: &CompoundKey) -> StoreResult<Vec<String>> {
    let _ = key;
    Err(StoreError::Unsupported("fields"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_flat_writes() {
    let writes = FieldWrites::from_flat(vec![
      "alpha".into(),
      "dot dash".into(),
      "bravo".into(),
      "dash dot dot dot".into(),
      "delta".into(),
    ])
    .unwrap();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes.distinct_fields(), 2);
  }

  #[test]
  fn test_flat_writes_repeated_field() {
    let writes = FieldWrites::from_flat(vec![
      "a".into(),
      1.into(),
      "b".into(),
      2.into(),
      "a".into(),
      3.into(),
    ])
    .unwrap();
    assert_eq!(writes.len(), 3);
    assert_eq!(writes.distinct_fields(), 2);
  }

  #[test]
  fn test_flat_writes_invalid() {
    assert_eq!(FieldWrites::from_flat(vec![]), Err(StoreError::InvalidData));
    assert_eq!(
      FieldWrites::from_flat(vec!["alpha".into()]),
      Err(StoreError::InvalidData)
    );
    assert_eq!(
      FieldWrites::from_flat(vec![FieldValue::Null, "x".into()]),
      Err(StoreError::InvalidField)
    );
  }

  #[test]
  fn test_flat_single_object() {
    let writes = FieldWrites::from_flat(vec![FieldValue::Json(json!({"a": 1, "b": "two"})),]).unwrap();
    assert_eq!(writes.len(), 2);
  }

  #[test]
  fn test_object_writes() {
    assert_eq!(
      FieldWrites::from_object(json!("nope")),
      Err(StoreError::InvalidData)
    );
    let writes = FieldWrites::from_object(json!({"alpha": "dot dash"})).unwrap();
    let pairs: Vec<_> = writes.iter().collect();
    assert_eq!(pairs, vec![("alpha", &FieldValue::from("dot dash"))]);
  }

  #[test]
  fn test_reply_into_map() {
    let mut fields = BTreeMap::new();
    fields.insert("a".to_string(), Some(FieldValue::from(1)));
    fields.insert("b".to_string(), None);
    let map = FieldReply::Fields(fields).into_map();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("a"), Some(&FieldValue::Integer(1)));
  }
}
