//! Handlers for `/certificates`: upload, removal and download of the
//! certificate document behind a certification.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/certificates/upload` | Multipart: `certification_id`, `file` |
//! | `POST` | `/certificates/delete` | Form: `certification_id`, `keep_status` (default `true`) |
//! | `GET`  | `/certificates/{id}/download` | 404 without a file, 410 when it is missing on disk |

use axum::{
  Form, Json,
  extract::{Multipart, Path, State},
  http::header,
  response::IntoResponse,
};
use certrack_core::store::CertStore;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  error::{Error, Result},
};

/// `POST /certificates/upload`
pub async fn upload<S: CertStore>(
  State(state): State<AppState<S>>,
  mut multipart: Multipart,
) -> Result<Json<Value>> {
  let mut certification_id: Option<i64> = None;
  let mut upload = None;

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| Error::BadRequest(format!("multipart error: {e}")))?
  {
    match field.name() {
      Some("certification_id") => {
        let text = field
          .text()
          .await
          .map_err(|e| Error::BadRequest(format!("failed to read certification_id: {e}")))?;
        let id = text
          .trim()
          .parse()
          .map_err(|_| Error::BadRequest(format!("invalid certification_id: {text:?}")))?;
        certification_id = Some(id);
      }
      Some("file") => {
        let filename = field.file_name().unwrap_or_default().to_owned();
        let bytes = field
          .bytes()
          .await
          .map_err(|e| Error::BadRequest(format!("failed to read file: {e}")))?;
        upload = Some((filename, bytes));
      }
      _ => {}
    }
  }

  let id = certification_id
    .ok_or_else(|| Error::BadRequest("missing 'certification_id' field".into()))?;
  let (filename, bytes) =
    upload.ok_or_else(|| Error::BadRequest("missing 'file' field".into()))?;

  let attached = state.documents.attach(id, &bytes, &filename).await?;
  Ok(Json(json!({ "ok": true, "certificate": attached })))
}

fn keep_by_default() -> bool { true }

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
  pub certification_id: i64,
  #[serde(default = "keep_by_default")]
  pub keep_status:      bool,
}

/// `POST /certificates/delete`
pub async fn delete<S: CertStore>(
  State(state): State<AppState<S>>,
  Form(form): Form<DeleteForm>,
) -> Result<Json<Value>> {
  state.documents.detach(form.certification_id, form.keep_status).await?;
  Ok(Json(json!({ "ok": true })))
}

/// `GET /certificates/{id}/download`
pub async fn download<S: CertStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
  let doc = state.documents.open(id).await?;
  let disposition = format!("attachment; filename=\"{}\"", doc.file_name);
  Ok((
    [(header::CONTENT_TYPE, doc.content_type), (header::CONTENT_DISPOSITION, disposition)],
    doc.bytes,
  ))
}
