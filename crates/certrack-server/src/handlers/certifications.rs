//! `GET /certifications?view=certified|pending`

use axum::{
  Json,
  extract::{Query, State},
};
use certrack_core::{
  model::{CertStatus, CertificationView},
  store::CertStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  error::{Error, Result},
};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
  #[default]
  Certified,
  Pending,
}

impl From<View> for CertStatus {
  fn from(view: View) -> Self {
    match view {
      View::Certified => CertStatus::Certified,
      View::Pending => CertStatus::NotCertified,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub view: View,
}

/// Newest first.
pub async fn list<S: CertStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CertificationView>>> {
  let views = state
    .store
    .list_certifications(params.view.into())
    .await
    .map_err(Error::store)?;
  Ok(Json(views))
}
