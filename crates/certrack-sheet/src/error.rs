//! Error types for the certrack-sheet reader.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unsupported file type: {0:?} (expected .csv or .xlsx)")]
  UnsupportedFormat(String),

  #[error("missing required columns: {}", .0.join(", "))]
  MissingColumns(Vec<String>),

  #[error("malformed CSV: {0}")]
  Csv(String),

  #[error("malformed workbook: {0}")]
  Xlsx(String),

  #[error("zip error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("XML error: {0}")]
  Xml(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
