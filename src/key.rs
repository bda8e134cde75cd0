//! Compound keys and their segments

use serde::{Deserialize, Serialize};
use std::fmt;

/// One path segment of a compound key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
  Int(i64),
  Str(String),
}

impl Segment {
  /// Integers are always valid, strings only when non-empty
  pub fn is_valid(&self) -> bool {
    match self {
      Segment::Int(_) => true,
      Segment::Str(s) => !s.is_empty(),
    }
  }

  /// Segment produced by prepending `prefix` (always a string segment)
  pub fn with_prefix(&self, prefix: &Segment) -> Segment {
    Segment::Str(format!("{}{}", prefix, self))
  }

  /// Read a segment out of plain JSON data: strings and integral numbers
  pub fn from_json(value: &serde_json::Value) -> Option<Segment> {
    match value {
      serde_json::Value::String(s) => Some(Segment::Str(s.clone())),
      serde_json::Value::Number(n) => n.as_i64().map(Segment::Int),
      _ => None,
    }
  }
}

impl fmt::Display for Segment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Segment::Int(i) => write!(f, "{}", i),
      Segment::Str(s) => f.write_str(s),
    }
  }
}

impl From<&str> for Segment {
  fn from(s: &str) -> Self {
    Segment::Str(s.to_string())
  }
}

impl From<String> for Segment {
  fn from(s: String) -> Self {
    Segment::Str(s)
  }
}

impl From<&String> for Segment {
  fn from(s: &String) -> Self {
    Segment::Str(s.clone())
  }
}

impl From<i64> for Segment {
  fn from(i: i64) -> Self {
    Segment::Int(i)
  }
}

impl From<i32> for Segment {
  fn from(i: i32) -> Self {
    Segment::Int(i as i64)
  }
}

impl From<u32> for Segment {
  fn from(i: u32) -> Self {
    Segment::Int(i as i64)
  }
}

/// An ordered sequence of segments naming one record in the namespace.
///
/// Extending a key always produces a new value; the receiver is never
/// modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompoundKey(Vec<Segment>);

impl CompoundKey {
  pub fn new(segments: Vec<Segment>) -> Self {
    Self(segments)
  }

  pub fn segments(&self) -> &[Segment] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Non-empty and made only of valid segments
  pub fn is_valid(&self) -> bool {
    !self.0.is_empty() && self.0.iter().all(Segment::is_valid)
  }

  pub fn last(&self) -> Option<&Segment> {
    self.0.last()
  }

  /// This key with `segment` appended, or `None` when the segment is not a
  /// non-empty string or a number.
  pub fn child(&self, segment: impl Into<Segment>) -> Option<CompoundKey> {
    let segment = segment.into();
    if !segment.is_valid() {
      return None;
    }
    let mut segments = Vec::with_capacity(self.0.len() + 1);
    segments.extend(self.0.iter().cloned());
    segments.push(segment);
    Some(Self(segments))
  }

  /// Join into a single store key. `None` for an empty key or one that
  /// holds an invalid segment.
  pub fn join(&self, delimiter: &str) -> Option<String> {
    if !self.is_valid() {
      return None;
    }
    let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
    Some(parts.join(delimiter))
  }

  /// Split a joined key back into string segments
  pub fn split(joined: &str, delimiter: &str) -> Self {
    if delimiter.is_empty() {
      return Self(vec![Segment::from(joined)]);
    }
    Self(joined.split(delimiter).map(Segment::from).collect())
  }
}

impl From<&str> for CompoundKey {
  fn from(s: &str) -> Self {
    Self(vec![Segment::from(s)])
  }
}

impl From<String> for CompoundKey {
  fn from(s: String) -> Self {
    Self(vec![Segment::Str(s)])
  }
}

impl From<i64> for CompoundKey {
  fn from(i: i64) -> Self {
    Self(vec![Segment::Int(i)])
  }
}

impl From<Segment> for CompoundKey {
  fn from(segment: Segment) -> Self {
    Self(vec![segment])
  }
}

impl From<Vec<Segment>> for CompoundKey {
  fn from(segments: Vec<Segment>) -> Self {
    Self(segments)
  }
}

impl FromIterator<Segment> for CompoundKey {
  fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}
