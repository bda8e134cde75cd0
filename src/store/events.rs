//! Store change events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store change operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreChangeOperation {
  Set,
  Delete,
  Flush,
}

impl std::fmt::Display for StoreChangeOperation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      StoreChangeOperation::Set => write!(f, "set"),
      StoreChangeOperation::Delete => write!(f, "del"),
      StoreChangeOperation::Flush => write!(f, "flush"),
    }
  }
}

/// A store change event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreChange {
  /// Joined store key
  pub key: String,
  pub operation: StoreChangeOperation,
  /// Fields touched (empty for a flush)
  pub fields: Vec<String>,
  pub changed_at: DateTime<Utc>,
}

impl StoreChange {
  pub fn new(key: String, operation: StoreChangeOperation, fields: Vec<String>) -> Self {
    Self {
      key,
      operation,
      fields,
      changed_at: Utc::now(),
    }
  }

  /// One-line notification text: `operation key [field...]`
  pub fn to_notification(&self) -> String {
    if self.fields.is_empty() {
      format!("{} {}", self.operation, self.key)
    } else {
      format!("{} {} {}", self.operation, self.key, self.fields.join(" "))
    }
  }
}
