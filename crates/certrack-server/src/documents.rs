//! Certificate files on disk, kept in step with their certification records.
//!
//! Files live at `<root>/<teacher_id>/<uuid><ext>` and the record stores the
//! path relative to `root`. The file system and the database are not updated
//! atomically. Writes go new-file first, then the record, then removal of the
//! old file, so a crash can leave an orphaned file but never a record that
//! points at nothing it just wrote.

use std::{
  ffi::OsStr,
  io::ErrorKind,
  path::{Path, PathBuf},
  sync::Arc,
};

use certrack_core::{
  model::{CertStatus, Certification},
  store::CertStore,
};
use serde::Serialize;
use tokio::{fs, io::AsyncWriteExt as _};
use uuid::Uuid;

use crate::error::{Error, Result};

const DEFAULT_EXTENSION: &str = ".pdf";

/// Where an uploaded certificate ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachedDocument {
  pub id:   i64,
  /// Relative to the storage root.
  pub path: String,
}

/// A certificate read back from disk.
#[derive(Debug)]
pub struct StoredDocument {
  pub file_name:    String,
  pub content_type: String,
  pub bytes:        Vec<u8>,
}

/// The certification document manager.
pub struct Documents<S> {
  store: Arc<S>,
  root:  PathBuf,
}

impl<S> Clone for Documents<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), root: self.root.clone() }
  }
}

impl<S: CertStore> Documents<S> {
  pub fn new(store: Arc<S>, root: impl Into<PathBuf>) -> Self {
    Self { store, root: root.into() }
  }

  pub fn root(&self) -> &Path { &self.root }

  async fn certification(&self, id: i64) -> Result<Certification> {
    self
      .store
      .get_certification(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("certification {id} not found")))
  }

  /// Store `bytes` as the certificate of certification `id` and mark it
  /// certified. Any previous file is removed afterwards.
  pub async fn attach(
    &self,
    id: i64,
    bytes: &[u8],
    filename: &str,
  ) -> Result<AttachedDocument> {
    let cert = self.certification(id).await?;

    let dir = self.root.join(cert.teacher_id.to_string());
    fs::create_dir_all(&dir).await?;

    let name = format!("{}{}", Uuid::new_v4().simple(), extension(filename));
    let relative = format!("{}/{name}", cert.teacher_id);
    let full = dir.join(&name);
    write_synced(&full, bytes).await?;

    let updated = self
      .store
      .set_certificate_file(id, Some(relative.clone()), CertStatus::Certified)
      .await;
    let updated = match updated {
      Ok(Some(updated)) => updated,
      Ok(None) => {
        remove_quietly(&full).await;
        return Err(Error::NotFound(format!("certification {id} not found")));
      }
      Err(e) => {
        remove_quietly(&full).await;
        return Err(Error::store(e));
      }
    };

    if let Some(previous) = cert.file_path {
      remove_quietly(&self.root.join(previous)).await;
    }

    tracing::info!(certification = id, path = %relative, "certificate attached");
    Ok(AttachedDocument { id: updated.id, path: relative })
  }

  /// Remove the certificate file of certification `id`. The status drops to
  /// `NOT_CERTIFIED` unless `keep_status` is set.
  pub async fn detach(&self, id: i64, keep_status: bool) -> Result<Certification> {
    let cert = self.certification(id).await?;

    if let Some(previous) = &cert.file_path {
      remove_quietly(&self.root.join(previous)).await;
    }

    let status = if keep_status { cert.status } else { CertStatus::NotCertified };
    let updated = self
      .store
      .set_certificate_file(id, None, status)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("certification {id} not found")))?;

    tracing::info!(certification = id, status = %updated.status, "certificate removed");
    Ok(updated)
  }

  /// Read the certificate of certification `id`.
  ///
  /// [`Error::NotFound`] when there is no record or no file recorded,
  /// [`Error::Gone`] when the recorded file is missing on disk.
  pub async fn open(&self, id: i64) -> Result<StoredDocument> {
    let cert = self.certification(id).await?;
    let relative = cert
      .file_path
      .ok_or_else(|| Error::NotFound(format!("certification {id} has no certificate")))?;

    let path = self.root.join(&relative);
    let bytes = match fs::read(&path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        return Err(Error::Gone(format!("certificate file for certification {id} is missing")));
      }
      Err(e) => return Err(e.into()),
    };

    let file_name = path
      .file_name()
      .and_then(OsStr::to_str)
      .unwrap_or("certificate")
      .to_owned();
    let content_type = mime_guess::from_path(&path).first_or_octet_stream().to_string();

    Ok(StoredDocument { file_name, content_type, bytes })
  }

  /// Remove every stored file of a deleted teacher.
  pub async fn purge_teacher(&self, teacher_id: i64) {
    let dir = self.root.join(teacher_id.to_string());
    match fs::remove_dir_all(&dir).await {
      Ok(()) => tracing::debug!(teacher = teacher_id, "certificate directory removed"),
      Err(e) if e.kind() == ErrorKind::NotFound => {}
      Err(e) => tracing::debug!(teacher = teacher_id, error = %e, "could not remove certificate directory"),
    }
  }
}

/// Lower-cased extension of `filename` with its dot, `.pdf` when there is
/// none or it is not plain alphanumeric.
fn extension(filename: &str) -> String {
  Path::new(filename)
    .extension()
    .and_then(OsStr::to_str)
    .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    .map_or_else(|| DEFAULT_EXTENSION.to_owned(), |ext| format!(".{}", ext.to_ascii_lowercase()))
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
  let mut file = fs::File::create(path).await?;
  file.write_all(bytes).await?;
  file.sync_all().await
}

async fn remove_quietly(path: &Path) {
  if let Err(e) = fs::remove_file(path).await {
    tracing::debug!(path = %path.display(), error = %e, "could not remove certificate file");
  }
}
