//! Tree errors

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
  /// A malformed node key, or a child value the schema rejects
  #[error("Invalid key: {0}")]
  InvalidKey(String),
  #[error("Unknown child: {0}")]
  UnknownChild(String),
  /// A fixed child declared as a property was used as a function, or the
  /// reverse
  #[error("Wrong accessor for child '{0}'")]
  WrongAccessor(String),
  #[error("Invalid schema: {0}")]
  InvalidSchema(String),
  #[error("Config error: {0}")]
  Config(String),
  #[error(transparent)]
  Store(#[from] StoreError),
}

pub type TreeResult<T> = Result<T, TreeError>;
