//! Handlers for `/years`.

use axum::{
  Form, Json,
  extract::{Path, State},
  response::Redirect,
};
use certrack_core::{import::parse_year, model::Year, store::CertStore};
use serde::Deserialize;

use crate::{
  AppState,
  error::{Error, Result},
  handlers::settle,
};

const LIST: &str = "/years";

#[derive(Debug, Deserialize)]
pub struct YearForm {
  pub value: String,
}

/// `GET /years`
pub async fn list<S: CertStore>(State(state): State<AppState<S>>) -> Result<Json<Vec<Year>>> {
  let years = state.store.list_years().await.map_err(Error::store)?;
  Ok(Json(years))
}

/// `POST /years`. A value that is not a year number writes nothing.
pub async fn create<S: CertStore>(
  State(state): State<AppState<S>>,
  Form(form): Form<YearForm>,
) -> Result<Redirect> {
  let Some(value) = parse_year(form.value.trim()) else {
    return Ok(Redirect::to(LIST));
  };
  let outcome = state.store.create_year(value).await.map_err(Error::store)?;
  Ok(settle(outcome, "create year", LIST))
}

/// `POST /years/{id}/delete`
pub async fn delete<S: CertStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Redirect> {
  let outcome = state.store.delete_year(id).await.map_err(Error::store)?;
  Ok(settle(outcome, "delete year", LIST))
}
