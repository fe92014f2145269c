//! Route handlers, one module per resource.
//!
//! Form posts follow the post/redirect/get pattern: they always answer
//! `303 See Other` to the resource's list path, whatever happened to the
//! write. Refused writes are logged instead of surfaced.

pub mod certificates;
pub mod certifications;
pub mod classes;
pub mod import;
pub mod overview;
pub mod schools;
pub mod teachers;
pub mod years;
pub mod zones;

use axum::response::Redirect;
use certrack_core::store::Outcome;

/// Log a refused write and redirect to `location`.
pub(crate) fn settle<T>(outcome: Outcome<T>, action: &str, location: &str) -> Redirect {
  match outcome {
    Outcome::Applied(_) => tracing::debug!(action, "write applied"),
    Outcome::NotFound => tracing::debug!(action, "write skipped: id not found"),
    Outcome::Conflict(reason) => {
      tracing::warn!(action, %reason, "write refused by a constraint");
    }
  }
  Redirect::to(location)
}

/// Trim a form field, treating blank input as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}
