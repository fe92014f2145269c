//! Error types for `certrack-core`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("row has empty fields")]
  EmptyFields,

  #[error("invalid year: {0:?}")]
  InvalidYear(String),

  #[error("invalid class label {0:?}, expected \"number/year\"")]
  InvalidClassLabel(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
