//! Handlers for `/zones`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/zones` | JSON list ordered by name |
//! | `POST` | `/zones` | Form: `name` |
//! | `POST` | `/zones/{id}/update` | Form: `name` |
//! | `POST` | `/zones/{id}/delete` | Refused while schools remain |

use axum::{
  Form, Json,
  extract::{Path, State},
  response::Redirect,
};
use certrack_core::{model::Zone, store::CertStore};
use serde::Deserialize;

use crate::{
  AppState,
  error::{Error, Result},
  handlers::settle,
};

const LIST: &str = "/zones";

#[derive(Debug, Deserialize)]
pub struct ZoneForm {
  pub name: String,
}

/// `GET /zones`
pub async fn list<S: CertStore>(State(state): State<AppState<S>>) -> Result<Json<Vec<Zone>>> {
  let zones = state.store.list_zones().await.map_err(Error::store)?;
  Ok(Json(zones))
}

/// `POST /zones`
pub async fn create<S: CertStore>(
  State(state): State<AppState<S>>,
  Form(form): Form<ZoneForm>,
) -> Result<Redirect> {
  let name = form.name.trim();
  if name.is_empty() {
    return Ok(Redirect::to(LIST));
  }
  let outcome = state.store.create_zone(name.to_owned()).await.map_err(Error::store)?;
  Ok(settle(outcome, "create zone", LIST))
}

/// `POST /zones/{id}/update`
pub async fn update<S: CertStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  Form(form): Form<ZoneForm>,
) -> Result<Redirect> {
  let outcome = state
    .store
    .rename_zone(id, form.name.trim().to_owned())
    .await
    .map_err(Error::store)?;
  Ok(settle(outcome, "rename zone", LIST))
}

/// `POST /zones/{id}/delete`
pub async fn delete<S: CertStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Redirect> {
  let outcome = state.store.delete_zone(id).await.map_err(Error::store)?;
  Ok(settle(outcome, "delete zone", LIST))
}
