//! `POST /import`: bulk spreadsheet import.
//!
//! Multipart body with a single `file` field holding a `.csv` or `.xlsx`
//! sheet. A file that cannot be read at all is a 400; row-level problems are
//! reported in the returned [`ImportSummary`].

use axum::{
  Json,
  extract::{Multipart, State},
};
use certrack_core::{
  import::{ImportSummary, reconcile},
  store::CertStore,
};

use crate::{
  AppState,
  error::{Error, Result},
};

pub async fn handler<S: CertStore>(
  State(state): State<AppState<S>>,
  mut multipart: Multipart,
) -> Result<Json<ImportSummary>> {
  let mut upload = None;

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| Error::BadRequest(format!("multipart error: {e}")))?
  {
    if field.name() == Some("file") {
      let filename = field.file_name().unwrap_or_default().to_owned();
      let bytes = field
        .bytes()
        .await
        .map_err(|e| Error::BadRequest(format!("failed to read file: {e}")))?;
      upload = Some((filename, bytes));
    }
  }

  let (filename, bytes) =
    upload.ok_or_else(|| Error::BadRequest("missing 'file' field".into()))?;

  let rows = certrack_sheet::parse_rows(&bytes, &filename)?;
  let total = rows.len();
  let summary = reconcile(state.store.as_ref(), rows).await;

  for failure in &summary.failures {
    tracing::warn!(row = failure.row, error = %failure.error, "import row failed");
  }
  for notice in &summary.relinked {
    tracing::warn!(row = notice.row, "{}", notice.message);
  }
  tracing::info!(
    file = %filename,
    rows = total,
    certifications = summary.created.certification,
    skipped = summary.skipped_existing,
    failed = summary.failures.len(),
    "import finished"
  );

  Ok(Json(summary))
}
