//! Dashboard data.

use axum::{
  Json,
  extract::{Query, State},
  response::Redirect,
};
use certrack_core::{
  model::ClassLabel,
  overview::{Overview, OverviewQuery},
  store::CertStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  error::{Error, Result},
};

#[derive(Debug, Default, Deserialize)]
pub struct OverviewParams {
  /// `"N/YYYY"`; anything else is ignored.
  pub class:          Option<String>,
  /// Non-zero restricts to certified rows.
  #[serde(default)]
  pub only_certified: u8,
}

impl From<&OverviewParams> for OverviewQuery {
  fn from(params: &OverviewParams) -> Self {
    Self {
      class:          params.class.as_deref().and_then(|c| ClassLabel::parse(c.trim())),
      only_certified: params.only_certified != 0,
    }
  }
}

/// `GET /`
pub async fn root() -> Redirect { Redirect::to("/api/overview") }

/// `GET /api/overview[?class=N/YYYY][&only_certified=1]`
pub async fn handler<S: CertStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<OverviewParams>,
) -> Result<Json<Overview>> {
  let query = OverviewQuery::from(&params);
  let overview = state.store.overview(&query).await.map_err(Error::store)?;
  Ok(Json(overview))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unparseable_class_filter_is_dropped() {
    let params = OverviewParams { class: Some("soon".into()), only_certified: 1 };
    let query = OverviewQuery::from(&params);
    assert_eq!(query.class, None);
    assert!(query.only_certified);

    let params = OverviewParams { class: Some("3/2025".into()), only_certified: 0 };
    assert_eq!(
      OverviewQuery::from(&params).class,
      Some(ClassLabel { number: 3, year: 2025 })
    );
  }
}
