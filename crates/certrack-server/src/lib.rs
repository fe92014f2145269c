//! HTTP layer for certrack.
//!
//! Exposes an axum [`Router`] over any [`CertStore`]: CRUD for the entity
//! graph, the spreadsheet importer, the certificate document manager and the
//! dashboard overview.

pub mod documents;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use certrack_core::store::CertStore;
use documents::Documents;
use handlers::{
  certificates, certifications, classes, import, overview, schools, teachers, years, zones,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CERTRACK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub database_path:    PathBuf,
  /// Certificate files are stored under this directory.
  pub storage_root:     PathBuf,
  /// Cap on import and upload request bodies.
  pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             "127.0.0.1".to_owned(),
      port:             8000,
      database_path:    PathBuf::from("certrack.db"),
      storage_root:     PathBuf::from("storage/certificates"),
      max_upload_bytes: 32 * 1024 * 1024,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CertStore> {
  pub store:     Arc<S>,
  pub documents: Documents<S>,
  pub config:    Arc<ServerConfig>,
}

impl<S: CertStore> AppState<S> {
  pub fn new(store: Arc<S>, config: ServerConfig) -> Self {
    let documents = Documents::new(Arc::clone(&store), config.storage_root.clone());
    Self { store, documents, config: Arc::new(config) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the certrack [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CertStore + Clone + 'static,
{
  let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

  Router::new()
    .route("/", get(overview::root))
    .route("/api/overview", get(overview::handler::<S>))
    // Zones
    .route("/zones", get(zones::list::<S>).post(zones::create::<S>))
    .route("/zones/{id}/update", post(zones::update::<S>))
    .route("/zones/{id}/delete", post(zones::delete::<S>))
    // Schools
    .route("/schools", get(schools::list::<S>).post(schools::create::<S>))
    .route("/schools/{id}/update", post(schools::update::<S>))
    .route("/schools/{id}/delete", post(schools::delete::<S>))
    // Teachers
    .route("/teachers", get(teachers::list::<S>).post(teachers::create::<S>))
    .route("/teachers/{id}/delete", post(teachers::delete::<S>))
    // Years and classes
    .route("/years", get(years::list::<S>).post(years::create::<S>))
    .route("/years/{id}/delete", post(years::delete::<S>))
    .route("/classes", get(classes::list::<S>))
    .route("/classes/create", post(classes::create::<S>))
    .route("/classes/{id}/delete", post(classes::delete::<S>))
    // Certifications and their documents
    .route("/certifications", get(certifications::list::<S>))
    .route("/import", post(import::handler::<S>).layer(body_limit.clone()))
    .route("/certificates/upload", post(certificates::upload::<S>).layer(body_limit))
    .route("/certificates/delete", post(certificates::delete::<S>))
    .route("/certificates/{id}/download", get(certificates::download::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
