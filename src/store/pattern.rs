//! Key patterns for scans and cascading flushes

use regex::{Regex, RegexBuilder};

use super::contract::{StoreError, StoreResult};
use crate::key::CompoundKey;

/// A pattern matched against joined store keys.
///
/// Every form is anchored at both ends and matched case-insensitively.
#[derive(Debug, Clone)]
pub enum KeyPattern {
  /// `*` matches any run of characters, `?` exactly one
  Glob(String),
  /// A regular expression, reused by source
  Regex(Regex),
  /// A compound key, joined with the store delimiter and read as a glob
  Key(CompoundKey),
  /// Every key below a compound key, joined with the store delimiter.
  /// Key text is matched literally.
  Descendants(CompoundKey),
}

impl KeyPattern {
  pub fn glob(pattern: impl Into<String>) -> Self {
    KeyPattern::Glob(pattern.into())
  }

  /// Pattern matching every key below `key`
  pub fn descendants(key: &CompoundKey) -> Self {
    KeyPattern::Descendants(key.clone())
  }

  /// Compile into an anchored, case-insensitive regex
  pub fn compile(&self, delimiter: &str) -> StoreResult<Regex> {
    let source = match self {
      KeyPattern::Glob(glob) => {
        if glob.is_empty() {
          return Err(StoreError::InvalidPattern("empty pattern".to_string()));
        }
        glob_to_source(glob)
      }
      KeyPattern::Regex(re) => re.as_str().to_string(),
      KeyPattern::Key(key) => {
        let joined = key
          .join(delimiter)
          .ok_or_else(|| StoreError::InvalidPattern("invalid key pattern".to_string()))?;
        glob_to_source(&joined)
      }
      KeyPattern::Descendants(key) => {
        let joined = key.join(delimiter).ok_or(StoreError::InvalidKey)?;
        format!("^{}{}.*$", regex::escape(&joined), regex::escape(delimiter))
      }
    };
    if source.is_empty() {
      return Err(StoreError::InvalidPattern("empty pattern".to_string()));
    }

    RegexBuilder::new(&anchor(&source))
      .case_insensitive(true)
      .build()
      .map_err(|e| StoreError::InvalidPattern(e.to_string()))
  }
}

impl From<&str> for KeyPattern {
  fn from(s: &str) -> Self {
    KeyPattern::Glob(s.to_string())
  }
}

impl From<String> for KeyPattern {
  fn from(s: String) -> Self {
    KeyPattern::Glob(s)
  }
}

impl From<Regex> for KeyPattern {
  fn from(re: Regex) -> Self {
    KeyPattern::Regex(re)
  }
}

impl From<CompoundKey> for KeyPattern {
  fn from(key: CompoundKey) -> Self {
    KeyPattern::Key(key)
  }
}

/// Convert a glob to regex source (unanchored)
fn glob_to_source(pattern: &str) -> String {
  let mut regex_str = String::with_capacity(pattern.len() * 2);

  for c in pattern.chars() {
    match c {
      '*' => regex_str.push_str(".*"),
      '?' => regex_str.push('.'),
      '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\' => {
        regex_str.push('\\');
        regex_str.push(c);
      }
      _ => regex_str.push(c),
    }
  }

  regex_str
}

fn anchor(source: &str) -> String {
  let mut anchored = String::with_capacity(source.len() + 2);
  if !source.starts_with('^') {
    anchored.push('^');
  }
  anchored.push_str(source);
  if !source.ends_with('$') {
    anchored.push('$');
  }
  anchored
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::key::Segment;

  fn matches(pattern: KeyPattern, key: &str) -> bool {
    pattern.compile(":").unwrap().is_match(key)
  }

  #[test]
  fn test_glob() {
    assert!(matches("*".into(), "anything"));
    assert!(matches("ic*".into(), "icao:more"));
    assert!(!matches("ic*".into(), "alpha:icao"));
    assert!(matches("f?o".into(), "foo"));
    assert!(!matches("f?o".into(), "fooo"));
    assert!(matches("user:*".into(), "USER:123"));
  }

  #[test]
  fn test_glob_escapes_metacharacters() {
    assert!(matches("a.b".into(), "a.b"));
    assert!(!matches("a.b".into(), "axb"));
    assert!(matches("(x)*".into(), "(x)yz"));
  }

  #[test]
  fn test_regex_is_anchored() {
    let re = Regex::new("icao").unwrap();
    assert!(matches(re.clone().into(), "icao"));
    assert!(!matches(re.into(), "icao:more"));
    assert!(matches(Regex::new(".*icao.*").unwrap().into(), "alpha:ICAO"));
  }

  #[test]
  fn test_key_pattern() {
    let key: CompoundKey = vec![Segment::from("cache"), Segment::from("*")].into();
    assert!(matches(key.into(), "cache:alpha"));
  }

  #[test]
  fn test_descendants() {
    let key: CompoundKey = vec![Segment::from("cache"), Segment::from("a.b")].into();
    let re = KeyPattern::descendants(&key).compile(":").unwrap();
    assert!(re.is_match("cache:a.b:charlie"));
    assert!(re.is_match("cache:a.b:charlie:delta"));
    assert!(!re.is_match("cache:a.b"));
    assert!(!re.is_match("cache:axb:charlie"));
  }

  #[test]
  fn test_descendants_use_store_delimiter() {
    let key: CompoundKey = vec![Segment::from("cache"), Segment::from("a*")].into();
    let re = KeyPattern::descendants(&key).compile("-").unwrap();
    assert!(re.is_match("cache-a*-bravo"));
    assert!(!re.is_match("cache:a*:bravo"));
    assert!(!re.is_match("cache-ab-bravo"));
  }

  #[test]
  fn test_invalid_patterns() {
    assert!(matches!(
      KeyPattern::glob("").compile(":"),
      Err(StoreError::InvalidPattern(_))
    ));
    assert!(matches!(
      KeyPattern::Key(CompoundKey::default()).compile(":"),
      Err(StoreError::InvalidPattern(_))
    ));
    assert_eq!(
      KeyPattern::descendants(&CompoundKey::default())
        .compile(":")
        .unwrap_err(),
      StoreError::InvalidKey
    );
  }
}
