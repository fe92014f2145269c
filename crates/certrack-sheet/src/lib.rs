//! Spreadsheet reader for the certrack importer.
//!
//! Turns the bytes of an uploaded `.csv` or `.xlsx` file into
//! [`RawRow`]s ready for [`certrack_core::import::reconcile`]. Pure and
//! synchronous; no HTTP or database dependencies.
//!
//! ```no_run
//! let csv = b"Zone,School,Teacher,Year,Class\nZ1,S1,Alice,2024,1/2024\n";
//! let rows = certrack_sheet::parse_rows(csv, "roster.csv").unwrap();
//! assert_eq!(rows[0].row, 2);
//! ```

mod csv;
pub mod error;
mod xlsx;

use std::{ffi::OsStr, path::Path};

use certrack_core::import::RawRow;

pub use error::{Error, Result};

/// Header names every sheet must carry. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 5] = ["Class", "School", "Teacher", "Year", "Zone"];

/// One record of a sheet, before column mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record {
  /// 1-based row number as the user sees it.
  pub number: usize,
  pub cells:  Vec<String>,
}

impl Record {
  /// An empty line. A record of separators only, such as `,,,,`, is not
  /// empty: it reaches the importer and fails there.
  fn is_empty_line(&self) -> bool {
    match self.cells.as_slice() {
      [] => true,
      [only] => only.trim().is_empty(),
      _ => false,
    }
  }
}

/// Read `bytes` as the file named `filename` and map its rows onto the
/// import columns.
///
/// The format is chosen from the extension alone. Empty lines are skipped
/// but keep their row number; the first remaining record is the header.
pub fn parse_rows(bytes: &[u8], filename: &str) -> Result<Vec<RawRow>> {
  let ext = Path::new(filename)
    .extension()
    .and_then(OsStr::to_str)
    .map(str::to_ascii_lowercase);

  let records = match ext.as_deref() {
    Some("csv") => csv::read_records(bytes)?,
    Some("xlsx") => xlsx::read_records(bytes)?,
    _ => return Err(Error::UnsupportedFormat(filename.to_owned())),
  };

  map_columns(records)
}

fn map_columns(records: Vec<Record>) -> Result<Vec<RawRow>> {
  let mut records = records.into_iter().filter(|r| !r.is_empty_line());

  let header = records.next().map(|r| r.cells).unwrap_or_default();
  let position = |name: &str| header.iter().position(|h| h.trim() == name);

  let missing: Vec<String> = REQUIRED_COLUMNS
    .into_iter()
    .filter(|&name| position(name).is_none())
    .map(str::to_owned)
    .collect();
  if !missing.is_empty() {
    return Err(Error::MissingColumns(missing));
  }

  // Every column was found above.
  let [class, school, teacher, year, zone] =
    REQUIRED_COLUMNS.map(|name| position(name).unwrap_or_default());

  let cell = |r: &Record, i: usize| r.cells.get(i).cloned().unwrap_or_default();

  Ok(
    records
      .map(|r| RawRow {
        row:     r.number,
        zone:    cell(&r, zone),
        school:  cell(&r, school),
        teacher: cell(&r, teacher),
        year:    cell(&r, year),
        class:   cell(&r, class),
      })
      .collect(),
  )
}
