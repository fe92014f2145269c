//! Handlers for `/classes`.

use axum::{
  Form, Json,
  extract::{Path, Query, State},
  response::Redirect,
};
use certrack_core::{model::ClassGroup, store::CertStore};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
  AppState,
  error::{Error, Result},
  handlers::settle,
};

const LIST: &str = "/classes";

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub year: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ClassEntry {
  pub id:     i64,
  pub label:  String,
  pub year:   i64,
  pub number: i64,
}

impl From<ClassGroup> for ClassEntry {
  fn from(class: ClassGroup) -> Self {
    Self {
      id:     class.id,
      label:  class.label().to_string(),
      year:   class.year,
      number: class.number,
    }
  }
}

/// `GET /classes[?year=YYYY]`
pub async fn list<S: CertStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ClassEntry>>> {
  let classes = state.store.list_classes(params.year).await.map_err(Error::store)?;
  Ok(Json(classes.into_iter().map(ClassEntry::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateForm {
  pub year: i64,
}

/// `POST /classes/{id}/delete`
pub async fn delete<S: CertStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Redirect> {
  let outcome = state.store.delete_class(id).await.map_err(Error::store)?;
  Ok(settle(outcome, "delete class", LIST))
}

/// `POST /classes/create` adds the next class of `year`.
pub async fn create<S: CertStore>(
  State(state): State<AppState<S>>,
  Form(form): Form<CreateForm>,
) -> Result<Json<Value>> {
  let class = state.store.create_next_class(form.year).await.map_err(Error::store)?;
  tracing::info!(class = %class.label(), "class created");
  Ok(Json(json!({
    "ok": true,
    "class": { "id": class.id, "label": class.label().to_string() },
  })))
}
