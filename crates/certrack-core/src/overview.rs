//! Read models for the dashboard overview.
//!
//! Rows are always projected from the certification outward, so every row
//! has a certification behind it and a teacher without one never shows up.

use serde::{Deserialize, Serialize};

use crate::model::{CertStatus, ClassLabel};

/// Parameters for [`CertStore::overview`](crate::store::CertStore::overview).
#[derive(Debug, Clone, Default)]
pub struct OverviewQuery {
  /// Exact match on class number and year value.
  pub class:          Option<ClassLabel>,
  /// Restrict to [`CertStatus::Certified`] rows.
  pub only_certified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewRow {
  pub zone:             String,
  pub school:           String,
  pub teacher:          String,
  pub year:             i64,
  /// `"number/year"`.
  pub class:            String,
  pub has_file:         bool,
  pub status:           CertStatus,
  pub certification_id: i64,
}

/// One bar of a group-count chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
  pub label: String,
  pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
  /// Ordered by zone, school, teacher.
  pub rows:      Vec<OverviewRow>,
  pub by_zone:   Vec<GroupCount>,
  pub by_school: Vec<GroupCount>,
  pub by_year:   Vec<GroupCount>,
}
