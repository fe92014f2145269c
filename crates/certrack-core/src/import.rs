//! Spreadsheet reconciliation. Maps tabular rows onto the entity graph.
//!
//! Each row names a zone, a school, a teacher, a year and a class label
//! (`"number/year"`). [`reconcile`] validates every row and hands it to
//! [`CertStore::apply_import_row`], which get-or-creates each entity in turn
//! and finally inserts at most one certification per (teacher, class):
//!
//! - schools are looked up by name; an existing school filed under a
//!   different zone is moved to the row's zone (last write wins) and the move
//!   is reported as a [`RowNotice`];
//! - teachers are looked up by (name, school), so the same name under two
//!   schools yields two teachers;
//! - a class label whose number cannot be read (including one with no `/`)
//!   falls back to class 1.
//!
//! A failing row never aborts the batch. Each row commits on its own, so a
//! re-run of the same rows creates nothing new.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, store::CertStore};

// ─── Input ───────────────────────────────────────────────────────────────────

/// One row as read from the sheet, untrimmed and unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
  /// 1-based row number in the sheet; the header is row 1.
  pub row:     usize,
  pub zone:    String,
  pub school:  String,
  pub teacher: String,
  pub year:    String,
  /// `"number/year"`; only the number is used.
  pub class:   String,
}

/// A row that passed validation, ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
  pub zone:         String,
  pub school:       String,
  pub teacher:      String,
  pub year:         i64,
  pub class_number: i64,
}

impl RawRow {
  /// Trim every field and check that none is empty and that the year is a
  /// number.
  pub fn validate(&self) -> Result<ImportRow> {
    let zone = self.zone.trim();
    let school = self.school.trim();
    let teacher = self.teacher.trim();
    let year = self.year.trim();
    let class = self.class.trim();

    if [zone, school, teacher, year, class].iter().any(|f| f.is_empty()) {
      return Err(Error::EmptyFields);
    }

    Ok(ImportRow {
      zone:         zone.to_owned(),
      school:       school.to_owned(),
      teacher:      teacher.to_owned(),
      year:         parse_year(year).ok_or_else(|| Error::InvalidYear(year.to_owned()))?,
      class_number: class_number(class),
    })
  }
}

/// Read a year cell. Spreadsheet numeric cells may come through as `2024.0`,
/// which is accepted as long as there is no fractional part.
pub fn parse_year(s: &str) -> Option<i64> {
  s.parse::<i64>().ok().or_else(|| {
    s.parse::<f64>()
      .ok()
      .filter(|f| f.is_finite() && f.fract() == 0.0)
      .map(|f| f as i64)
  })
}

/// The class number is whatever precedes the first `/`. A label without a
/// `/`, or with an unreadable number, is class 1.
pub fn class_number(label: &str) -> i64 {
  label
    .split_once('/')
    .and_then(|(n, _)| n.trim().parse().ok())
    .unwrap_or(1)
}

// ─── Per-row result ──────────────────────────────────────────────────────────

/// Which entities a single row brought into existence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreatedEntities {
  pub zone:          bool,
  pub school:        bool,
  pub teacher:       bool,
  pub year:          bool,
  pub class:         bool,
  /// `false` means the (teacher, class) certification already existed.
  pub certification: bool,
}

/// An existing school that a row moved to another zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolRelink {
  pub school:    String,
  pub from_zone: String,
  pub to_zone:   String,
}

/// What [`CertStore::apply_import_row`] did for one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowOutcome {
  pub created:       CreatedEntities,
  pub school_relink: Option<SchoolRelink>,
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedCounts {
  pub zone:          usize,
  pub school:        usize,
  pub teacher:       usize,
  pub year:          usize,
  pub class:         usize,
  pub certification: usize,
}

impl CreatedCounts {
  fn add(&mut self, created: &CreatedEntities) {
    self.zone += usize::from(created.zone);
    self.school += usize::from(created.school);
    self.teacher += usize::from(created.teacher);
    self.year += usize::from(created.year);
    self.class += usize::from(created.class);
    self.certification += usize::from(created.certification);
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
  pub row:   usize,
  pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowNotice {
  pub row:     usize,
  pub message: String,
}

/// Totals for a whole import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
  pub created:          CreatedCounts,
  /// Rows whose certification already existed.
  pub skipped_existing: usize,
  pub failures:         Vec<RowFailure>,
  /// Schools moved to another zone by a later row.
  pub relinked:         Vec<RowNotice>,
}

impl ImportSummary {
  fn record(&mut self, row: usize, outcome: RowOutcome) {
    self.created.add(&outcome.created);
    if !outcome.created.certification {
      self.skipped_existing += 1;
    }
    if let Some(relink) = outcome.school_relink {
      self.relinked.push(RowNotice {
        row,
        message: format!(
          "school {:?} moved from zone {:?} to zone {:?}",
          relink.school, relink.from_zone, relink.to_zone
        ),
      });
    }
  }

  fn fail(&mut self, row: usize, error: impl ToString) {
    self.failures.push(RowFailure { row, error: error.to_string() });
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Reconcile `rows` against `store`, in order, one transaction per row.
pub async fn reconcile<S, I>(store: &S, rows: I) -> ImportSummary
where
  S: CertStore,
  I: IntoIterator<Item = RawRow>,
{
  let mut summary = ImportSummary::default();

  for raw in rows {
    let row = match raw.validate() {
      Ok(row) => row,
      Err(e) => {
        summary.fail(raw.row, e);
        continue;
      }
    };

    match store.apply_import_row(row).await {
      Ok(outcome) => summary.record(raw.row, outcome),
      Err(e) => summary.fail(raw.row, e),
    }
  }

  summary
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(teacher: &str, year: &str, class: &str) -> RawRow {
    RawRow {
      row:     2,
      zone:    " Z1 ".into(),
      school:  "S1".into(),
      teacher: teacher.into(),
      year:    year.into(),
      class:   class.into(),
    }
  }

  #[test]
  fn validate_trims_fields() {
    let row = raw("  Alice ", " 2024 ", "2/2024").validate().unwrap();
    assert_eq!(row.zone, "Z1");
    assert_eq!(row.teacher, "Alice");
    assert_eq!(row.year, 2024);
    assert_eq!(row.class_number, 2);
  }

  #[test]
  fn validate_rejects_blank_fields() {
    assert_eq!(raw("   ", "2024", "1/2024").validate(), Err(Error::EmptyFields));
    assert_eq!(raw("Alice", "", "1/2024").validate(), Err(Error::EmptyFields));
    assert_eq!(
      Error::EmptyFields.to_string(),
      "row has empty fields"
    );
  }

  #[test]
  fn validate_rejects_non_numeric_year() {
    assert_eq!(
      raw("Alice", "next", "1/2024").validate(),
      Err(Error::InvalidYear("next".into()))
    );
    assert_eq!(
      raw("Alice", "2024.5", "1/2024").validate(),
      Err(Error::InvalidYear("2024.5".into()))
    );
  }

  #[test]
  fn spreadsheet_float_years_are_accepted() {
    assert_eq!(parse_year("2024.0"), Some(2024));
    assert_eq!(parse_year("inf"), None);
  }

  #[test]
  fn class_number_falls_back_to_one() {
    assert_eq!(class_number("4/2024"), 4);
    assert_eq!(class_number(" 4 /2024"), 4);
    assert_eq!(class_number("4"), 1);
    assert_eq!(class_number("A/2024"), 1);
    assert_eq!(class_number("first"), 1);
  }
}
