//! The `CertStore` trait and the write outcome type.
//!
//! The trait is implemented by storage backends (e.g.
//! `certrack-store-sqlite`). The server depends on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::{
  import::{ImportRow, RowOutcome},
  model::{
    CertStatus, Certification, CertificationView, ClassGroup, NewTeacher,
    School, Teacher, Year, Zone,
  },
  overview::{Overview, OverviewQuery},
};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Result of a CRUD write that may be refused by the data itself rather than
/// by a failure of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
  /// The write was committed.
  Applied(T),
  /// An id named by the write does not resolve. Nothing was written.
  NotFound,
  /// A uniqueness or foreign-key constraint refused the write and the
  /// transaction was rolled back.
  Conflict(String),
}

impl<T> Outcome<T> {
  pub fn is_applied(&self) -> bool { matches!(self, Self::Applied(_)) }

  pub fn applied(self) -> Option<T> {
    match self {
      Self::Applied(t) => Some(t),
      _ => None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
    match self {
      Self::Applied(t) => Outcome::Applied(f(t)),
      Self::NotFound => Outcome::NotFound,
      Self::Conflict(m) => Outcome::Conflict(m),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a certrack store backend.
///
/// Deleting a zone, school, year or class that still has dependants yields
/// [`Outcome::Conflict`]. Deleting a teacher removes its certifications.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CertStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Zones ─────────────────────────────────────────────────────────────

  /// All zones ordered by name.
  fn list_zones(
    &self,
  ) -> impl Future<Output = Result<Vec<Zone>, Self::Error>> + Send + '_;

  fn get_zone(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Zone>, Self::Error>> + Send + '_;

  fn create_zone(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Outcome<Zone>, Self::Error>> + Send + '_;

  fn rename_zone(
    &self,
    id: i64,
    name: String,
  ) -> impl Future<Output = Result<Outcome<Zone>, Self::Error>> + Send + '_;

  fn delete_zone(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Outcome<()>, Self::Error>> + Send + '_;

  // ── Schools ───────────────────────────────────────────────────────────

  /// All schools ordered by name.
  fn list_schools(
    &self,
  ) -> impl Future<Output = Result<Vec<School>, Self::Error>> + Send + '_;

  fn get_school(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<School>, Self::Error>> + Send + '_;

  /// [`Outcome::NotFound`] if `zone_id` does not resolve.
  fn create_school(
    &self,
    name: String,
    zone_id: i64,
  ) -> impl Future<Output = Result<Outcome<School>, Self::Error>> + Send + '_;

  /// Rename a school and move it to `zone_id`. [`Outcome::NotFound`] if
  /// either id does not resolve.
  fn update_school(
    &self,
    id: i64,
    name: String,
    zone_id: i64,
  ) -> impl Future<Output = Result<Outcome<School>, Self::Error>> + Send + '_;

  fn delete_school(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Outcome<()>, Self::Error>> + Send + '_;

  // ── Teachers ──────────────────────────────────────────────────────────

  /// All teachers ordered by name.
  fn list_teachers(
    &self,
  ) -> impl Future<Output = Result<Vec<Teacher>, Self::Error>> + Send + '_;

  fn get_teacher(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Teacher>, Self::Error>> + Send + '_;

  /// Create a teacher and, when `enrollment` is set, the year, class and
  /// certification it implies, in one transaction.
  /// [`Outcome::NotFound`] if `school_id` does not resolve.
  fn create_teacher(
    &self,
    input: NewTeacher,
  ) -> impl Future<Output = Result<Outcome<Teacher>, Self::Error>> + Send + '_;

  /// Delete a teacher together with its certifications.
  fn delete_teacher(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Outcome<()>, Self::Error>> + Send + '_;

  // ── Years and classes ─────────────────────────────────────────────────

  /// All years ordered by value.
  fn list_years(
    &self,
  ) -> impl Future<Output = Result<Vec<Year>, Self::Error>> + Send + '_;

  fn create_year(
    &self,
    value: i64,
  ) -> impl Future<Output = Result<Outcome<Year>, Self::Error>> + Send + '_;

  fn delete_year(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Outcome<()>, Self::Error>> + Send + '_;

  /// Classes ordered by year value then number, optionally restricted to
  /// one year value.
  fn list_classes(
    &self,
    year: Option<i64>,
  ) -> impl Future<Output = Result<Vec<ClassGroup>, Self::Error>> + Send + '_;

  /// Create the next class of `year` (highest existing number + 1, starting
  /// at 1), creating the year if needed.
  fn create_next_class(
    &self,
    year: i64,
  ) -> impl Future<Output = Result<ClassGroup, Self::Error>> + Send + '_;

  fn delete_class(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Outcome<()>, Self::Error>> + Send + '_;

  // ── Certifications ────────────────────────────────────────────────────

  fn get_certification(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Certification>, Self::Error>> + Send + '_;

  /// Certifications with `status`, newest first.
  fn list_certifications(
    &self,
    status: CertStatus,
  ) -> impl Future<Output = Result<Vec<CertificationView>, Self::Error>> + Send + '_;

  /// Overwrite the file path and status of a certification.
  /// Returns the updated record, or `None` if `id` does not resolve.
  fn set_certificate_file(
    &self,
    id: i64,
    file_path: Option<String>,
    status: CertStatus,
  ) -> impl Future<Output = Result<Option<Certification>, Self::Error>> + Send + '_;

  // ── Import ────────────────────────────────────────────────────────────

  /// Reconcile one validated spreadsheet row onto the entity graph in a
  /// single transaction. See [`crate::import`] for the rules.
  fn apply_import_row(
    &self,
    row: ImportRow,
  ) -> impl Future<Output = Result<RowOutcome, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Materialise the dashboard rows and group counts for `query`.
  fn overview<'a>(
    &'a self,
    query: &'a OverviewQuery,
  ) -> impl Future<Output = Result<Overview, Self::Error>> + Send + 'a;
}
