//! Handlers for `/schools`.

use axum::{
  Form, Json,
  extract::{Path, State},
  response::Redirect,
};
use certrack_core::{model::School, store::CertStore};
use serde::Deserialize;

use crate::{
  AppState,
  error::{Error, Result},
  handlers::settle,
};

const LIST: &str = "/schools";

#[derive(Debug, Deserialize)]
pub struct SchoolForm {
  pub name:    String,
  pub zone_id: i64,
}

/// `GET /schools`
pub async fn list<S: CertStore>(State(state): State<AppState<S>>) -> Result<Json<Vec<School>>> {
  let schools = state.store.list_schools().await.map_err(Error::store)?;
  Ok(Json(schools))
}

/// `POST /schools`. An unknown `zone_id` writes nothing.
pub async fn create<S: CertStore>(
  State(state): State<AppState<S>>,
  Form(form): Form<SchoolForm>,
) -> Result<Redirect> {
  let name = form.name.trim();
  if name.is_empty() {
    return Ok(Redirect::to(LIST));
  }
  let outcome = state
    .store
    .create_school(name.to_owned(), form.zone_id)
    .await
    .map_err(Error::store)?;
  Ok(settle(outcome, "create school", LIST))
}

/// `POST /schools/{id}/update`: rename and move to another zone.
pub async fn update<S: CertStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  Form(form): Form<SchoolForm>,
) -> Result<Redirect> {
  let outcome = state
    .store
    .update_school(id, form.name.trim().to_owned(), form.zone_id)
    .await
    .map_err(Error::store)?;
  Ok(settle(outcome, "update school", LIST))
}

/// `POST /schools/{id}/delete`
pub async fn delete<S: CertStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Redirect> {
  let outcome = state.store.delete_school(id).await.map_err(Error::store)?;
  Ok(settle(outcome, "delete school", LIST))
}
