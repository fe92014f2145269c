//! Entity types: zones, schools, teachers, years, classes and the
//! certification pivot that ties a teacher to a class.
//!
//! Every entity is identified by an opaque `i64` assigned by the store.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::Error;

// ─── Administrative hierarchy ────────────────────────────────────────────────

/// Top-level administrative grouping of schools. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
  pub id:   i64,
  pub name: String,
}

/// An institution belonging to exactly one [`Zone`]. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
  pub id:      i64,
  pub name:    String,
  pub zone_id: i64,
}

/// A person teaching at exactly one [`School`].
///
/// Nothing makes `(name, school_id)` unique; the importer treats it as a loose
/// lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
  pub id:        i64,
  pub name:      String,
  pub document:  Option<String>,
  pub email:     Option<String>,
  pub school_id: i64,
}

// ─── Calendar ────────────────────────────────────────────────────────────────

/// A school year, identified by its numeric value (e.g. `2024`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Year {
  pub id:    i64,
  pub value: i64,
}

/// A numbered group within a [`Year`]. `(number, year_id)` is unique.
///
/// `year` carries the year's value so the label can be rendered without a
/// second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassGroup {
  pub id:      i64,
  pub number:  i64,
  pub year_id: i64,
  pub year:    i64,
}

impl ClassGroup {
  pub fn label(&self) -> ClassLabel {
    ClassLabel { number: self.number, year: self.year }
  }
}

/// The `"number/year"` rendering of a class, e.g. `1/2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassLabel {
  pub number: i64,
  pub year:   i64,
}

impl ClassLabel {
  /// Parse `"N/YYYY"`; anything else is `None`.
  pub fn parse(s: &str) -> Option<Self> { s.parse().ok() }
}

impl FromStr for ClassLabel {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || Error::InvalidClassLabel(s.to_owned());
    let (number, year) = s.split_once('/').ok_or_else(invalid)?;
    Ok(Self {
      number: number.trim().parse().map_err(|_| invalid())?,
      year:   year.trim().parse().map_err(|_| invalid())?,
    })
  }
}

impl fmt::Display for ClassLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.number, self.year)
  }
}

// ─── Certification ───────────────────────────────────────────────────────────

/// Whether a teacher is certified for a class.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CertStatus {
  Certified,
  #[default]
  NotCertified,
}

/// The pivot record between a [`Teacher`] and a [`ClassGroup`].
///
/// `year_id` is a denormalised copy of the class's year, fixed at creation.
/// A file upload sets the status to [`CertStatus::Certified`]; removing the
/// file only resets it when the caller asks for that, so a certified record
/// without a file is a reachable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
  pub id:         i64,
  pub teacher_id: i64,
  pub class_id:   i64,
  pub year_id:    i64,
  pub status:     CertStatus,
  pub file_path:  Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Certification {
  pub fn has_file(&self) -> bool { self.file_path.is_some() }
}

/// A certification joined with the display names of everything it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationView {
  #[serde(flatten)]
  pub certification: Certification,
  pub teacher:       String,
  pub school:        String,
  pub zone:          String,
  /// `"number/year"`.
  pub class:         String,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input for [`CertStore::create_teacher`](crate::store::CertStore::create_teacher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeacher {
  pub name:       String,
  pub school_id:  i64,
  pub document:   Option<String>,
  pub email:      Option<String>,
  /// When set, the teacher is enrolled in the class and a
  /// `NOT_CERTIFIED` certification is created alongside.
  pub enrollment: Option<Enrollment>,
}

/// A class to enrol a new teacher in.
///
/// `year` is authoritative: the year half of `class` is ignored if the two
/// disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enrollment {
  pub year:  i64,
  pub class: ClassLabel,
}
