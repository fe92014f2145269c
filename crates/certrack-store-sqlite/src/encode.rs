//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and statuses as their
//! SCREAMING_SNAKE_CASE names.

use certrack_core::model::{CertStatus, Certification, CertificationView};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── CertStatus ──────────────────────────────────────────────────────────────

pub fn encode_status(status: CertStatus) -> &'static str {
  match status {
    CertStatus::Certified => "CERTIFIED",
    CertStatus::NotCertified => "NOT_CERTIFIED",
  }
}

pub fn decode_status(s: &str) -> Result<CertStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown certification status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawCertification::from_row`], for a table aliased
/// `ce`.
pub const CERTIFICATION_COLUMNS: &str = "ce.id, ce.teacher_id, ce.class_id, \
  ce.year_id, ce.status, ce.file_path, ce.created_at";

/// Raw values read directly from a `certifications` row.
pub struct RawCertification {
  pub id:         i64,
  pub teacher_id: i64,
  pub class_id:   i64,
  pub year_id:    i64,
  pub status:     String,
  pub file_path:  Option<String>,
  pub created_at: String,
}

impl RawCertification {
  /// Read the seven [`CERTIFICATION_COLUMNS`] starting at column 0.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      teacher_id: row.get(1)?,
      class_id:   row.get(2)?,
      year_id:    row.get(3)?,
      status:     row.get(4)?,
      file_path:  row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_certification(self) -> Result<Certification> {
    Ok(Certification {
      id:         self.id,
      teacher_id: self.teacher_id,
      class_id:   self.class_id,
      year_id:    self.year_id,
      status:     decode_status(&self.status)?,
      file_path:  self.file_path,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A certification row joined with teacher, school, zone and class names.
pub struct RawCertificationView {
  pub certification: RawCertification,
  pub teacher:       String,
  pub school:        String,
  pub zone:          String,
  pub class_number:  i64,
  pub year:          i64,
}

impl RawCertificationView {
  pub fn into_view(self) -> Result<CertificationView> {
    Ok(CertificationView {
      certification: self.certification.into_certification()?,
      teacher:       self.teacher,
      school:        self.school,
      zone:          self.zone,
      class:         format!("{}/{}", self.class_number, self.year),
    })
  }
}
