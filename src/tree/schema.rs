//! Schema definitions for child traversal
//!
//! A [`ChildDef`] is the caller-facing description of one named child. When
//! added to a node it becomes a registered entry tagged with a [`KeyRule`]:
//! a fixed segment, a validated value, or any non-empty value.

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use super::error::{TreeError, TreeResult};
use crate::key::Segment;

const KEY_MARKER: &str = "__key__";
const VALIDATE_MARKER: &str = "__validate__";
const PREFIX_MARKER: &str = "__prefix__";

pub type Predicate = Arc<dyn Fn(&Segment) -> bool + Send + Sync>;

/// Accepts or rejects a caller-supplied child value
#[derive(Clone)]
pub enum Validator {
  Predicate(Predicate),
  /// Tested against the value's text form
  Pattern(Regex),
}

impl Validator {
  pub fn accepts(&self, value: &Segment) -> bool {
    match self {
      Validator::Predicate(f) => f(value),
      Validator::Pattern(re) => re.is_match(&value.to_string()),
    }
  }
}

impl fmt::Debug for Validator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Validator::Predicate(_) => f.write_str("Predicate(..)"),
      Validator::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
    }
  }
}

/// Definition of a named child
#[derive(Debug, Clone, Default)]
pub struct ChildDef {
  fixed_key: Option<Segment>,
  prefix: Option<Segment>,
  validator: Option<Validator>,
  children: Schema,
}

impl ChildDef {
  /// Accepts any non-empty string or number
  pub fn any() -> Self {
    Self::default()
  }

  /// Always produces `key`; no value is needed to traverse
  pub fn fixed(key: impl Into<Segment>) -> Self {
    Self {
      fixed_key: Some(key.into()),
      ..Self::default()
    }
  }

  pub fn matching(pattern: Regex) -> Self {
    Self {
      validator: Some(Validator::Pattern(pattern)),
      ..Self::default()
    }
  }

  pub fn validated<F>(predicate: F) -> Self
  where
    F: Fn(&Segment) -> bool + Send + Sync + 'static,
  {
    Self {
      validator: Some(Validator::Predicate(Arc::new(predicate))),
      ..Self::default()
    }
  }

  /// Prepend `prefix` to supplied values
  pub fn prefix(mut self, prefix: impl Into<Segment>) -> Self {
    self.prefix = Some(prefix.into());
    self
  }

  /// Nested child, registered on every node this definition produces
  pub fn child(mut self, name: impl Into<String>, def: impl Into<ChildDef>) -> Self {
    self.children = self.children.entry(name, def);
    self
  }

  pub fn children(&self) -> &Schema {
    &self.children
  }

  /// Read a definition from plain data.
  ///
  /// Strings and integers are fixed keys, `null` accepts anything, and an
  /// object may carry `__key__`, `__validate__` (regex source), `__prefix__`
  /// and nested children under any other name.
  pub fn from_json(value: &serde_json::Value) -> TreeResult<Self> {
    match value {
      serde_json::Value::Null => Ok(Self::any()),
      serde_json::Value::String(s) if s.is_empty() => Ok(Self::any()),
      serde_json::Value::String(_) | serde_json::Value::Number(_) => Segment::from_json(value)
        .map(Self::fixed)
        .ok_or_else(|| TreeError::InvalidSchema(format!("invalid key {}", value))),
      serde_json::Value::Object(map) => {
        let mut def = Self::any();
        for (name, member) in map {
          match name.as_str() {
            KEY_MARKER => {
              def.fixed_key = Some(
                Segment::from_json(member)
                  .filter(Segment::is_valid)
                  .ok_or_else(|| TreeError::InvalidSchema(format!("invalid {}", KEY_MARKER)))?,
              );
            }
            VALIDATE_MARKER => {
              let source = member
                .as_str()
                .ok_or_else(|| TreeError::InvalidSchema(format!("invalid {}", VALIDATE_MARKER)))?;
              let re = Regex::new(source).map_err(|e| TreeError::InvalidSchema(e.to_string()))?;
              def.validator = Some(Validator::Pattern(re));
            }
            PREFIX_MARKER => {
              def.prefix = Some(
                Segment::from_json(member)
                  .ok_or_else(|| TreeError::InvalidSchema(format!("invalid {}", PREFIX_MARKER)))?,
              );
            }
            _ => {
              def.children = def.children.entry(name.clone(), Self::from_json(member)?);
            }
          }
        }
        Ok(def)
      }
      other => Err(TreeError::InvalidSchema(format!(
        "unsupported definition {}",
        other
      ))),
    }
  }
}

impl From<&str> for ChildDef {
  fn from(key: &str) -> Self {
    if key.is_empty() {
      Self::any()
    } else {
      Self::fixed(key)
    }
  }
}

impl From<String> for ChildDef {
  fn from(key: String) -> Self {
    Self::from(key.as_str())
  }
}

impl From<i64> for ChildDef {
  fn from(key: i64) -> Self {
    Self::fixed(key)
  }
}

impl From<Regex> for ChildDef {
  fn from(pattern: Regex) -> Self {
    Self::matching(pattern)
  }
}

impl From<Validator> for ChildDef {
  fn from(validator: Validator) -> Self {
    Self {
      validator: Some(validator),
      ..Self::default()
    }
  }
}

/// Ordered set of named child definitions
#[derive(Debug, Clone, Default)]
pub struct Schema {
  entries: Vec<(String, ChildDef)>,
}

impl Schema {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn entry(mut self, name: impl Into<String>, def: impl Into<ChildDef>) -> Self {
    self.entries.push((name.into(), def.into()));
    self
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &ChildDef)> {
    self.entries.iter().map(|(n, d)| (n.as_str(), d))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// An object mapping child names to definitions (see
  /// [`ChildDef::from_json`])
  pub fn from_json(value: &serde_json::Value) -> TreeResult<Self> {
    let map = value
      .as_object()
      .ok_or_else(|| TreeError::InvalidSchema("schema must be an object".to_string()))?;
    let mut schema = Self::new();
    for (name, def) in map {
      schema = schema.entry(name.clone(), ChildDef::from_json(def)?);
    }
    Ok(schema)
  }
}

impl<N: Into<String>, D: Into<ChildDef>> FromIterator<(N, D)> for Schema {
  fn from_iter<I: IntoIterator<Item = (N, D)>>(iter: I) -> Self {
    Self {
      entries: iter
        .into_iter()
        .map(|(n, d)| (n.into(), d.into()))
        .collect(),
    }
  }
}

/// How a registered child turns a caller value into a key segment
#[derive(Debug, Clone)]
pub enum KeyRule {
  Fixed(Segment),
  Validated {
    validator: Validator,
    prefix: Option<Segment>,
  },
  Any {
    prefix: Option<Segment>,
  },
}

/// How a registered child is reached from its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
  /// Invoked with an optional value
  Function,
  /// Read without a value (fixed children on property-mode trees)
  Property,
}

/// A child registered on a node
#[derive(Debug, Clone)]
pub(crate) struct SchemaEntry {
  pub rule: KeyRule,
  pub kind: AccessorKind,
  pub children: Schema,
}

impl SchemaEntry {
  pub fn from_def(def: &ChildDef, use_properties: bool) -> Self {
    let rule = match (&def.fixed_key, &def.validator) {
      (Some(key), _) if key.is_valid() => KeyRule::Fixed(key.clone()),
      (_, Some(validator)) => KeyRule::Validated {
        validator: validator.clone(),
        prefix: def.prefix.clone(),
      },
      _ => KeyRule::Any {
        prefix: def.prefix.clone(),
      },
    };
    let kind = match rule {
      KeyRule::Fixed(_) if use_properties => AccessorKind::Property,
      _ => AccessorKind::Function,
    };
    Self {
      rule,
      kind,
      children: def.children.clone(),
    }
  }

  /// The segment this entry contributes for `value`
  pub fn resolve(&self, name: &str, value: Option<Segment>) -> TreeResult<Segment> {
    let (value, prefix) = match &self.rule {
      KeyRule::Fixed(key) => return Ok(key.clone()),
      KeyRule::Validated { validator, prefix } => {
        let value = value.ok_or_else(|| missing_value(name))?;
        if !validator.accepts(&value) {
          return Err(TreeError::InvalidKey(format!(
            "'{}' rejected by child '{}'",
            value, name
          )));
        }
        (value, prefix)
      }
      KeyRule::Any { prefix } => {
        let value = value.ok_or_else(|| missing_value(name))?;
        if !value.is_valid() {
          return Err(TreeError::InvalidKey(format!(
            "empty value for child '{}'",
            name
          )));
        }
        (value, prefix)
      }
    };

    Ok(match prefix {
      Some(prefix) => value.with_prefix(prefix),
      None => value,
    })
  }
}

fn missing_value(name: &str) -> TreeError {
  TreeError::InvalidKey(format!("child '{}' requires a value", name))
}
