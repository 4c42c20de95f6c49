//! Evidence uploads: bytes go to a [`BlobStore`], metadata to the record
//! store.

use bytes::Bytes;
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use rca_core::{
  attachment::{Attachment, NewAttachment, StorageFolder, file_extension, stored_file_name},
  store::RcaStore,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  storage::{BlobStore, FsBlobStore},
};

/// An upload as received from a client.
#[derive(Debug, Clone)]
pub struct Upload {
  pub rca_id:       Uuid,
  pub file_name:    String,
  pub content_type: Option<String>,
  pub bytes:        Bytes,
  pub uploaded_by:  Option<String>,
}

/// Attachment metadata plus the URL it can be downloaded from.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentView {
  #[serde(flatten)]
  pub attachment: Attachment,
  pub url:        String,
}

pub struct AttachmentRegistry<B = FsBlobStore> {
  blobs:      B,
  url_prefix: String,
}

impl<B: BlobStore> AttachmentRegistry<B> {
  pub fn new(blobs: B, url_prefix: impl Into<String>) -> Self {
    Self { blobs, url_prefix: url_prefix.into() }
  }

  pub fn url_for(&self, stored_path: &str) -> String {
    format!("{}/{}", self.url_prefix.trim_end_matches('/'), stored_path)
  }

  fn view(&self, attachment: Attachment) -> AttachmentView {
    let url = self.url_for(&attachment.stored_path);
    AttachmentView { attachment, url }
  }

  /// Store the bytes under a collision-resistant name and record the row.
  pub async fn upload<S: RcaStore>(&self, store: &S, upload: Upload) -> Result<AttachmentView> {
    if upload.file_name.trim().is_empty() {
      return Err(Error::BadRequest("file name must not be blank".into()));
    }
    require_rca(store, upload.rca_id).await?;

    let ext = file_extension(&upload.file_name);
    let folder = StorageFolder::for_extension(&ext);
    let nonce = format!("{:08x}", OsRng.next_u32());
    let name = stored_file_name(upload.rca_id, Utc::now(), &nonce, &upload.file_name);
    let stored_path = format!("{}/{name}", folder.as_ref());

    self.blobs.write(&stored_path, &upload.bytes).await?;

    let input = NewAttachment {
      rca_id: upload.rca_id,
      file_name: upload.file_name,
      stored_path,
      file_type: ext,
      content_type: upload.content_type,
      size_bytes: upload.bytes.len() as u64,
      sha256: hex::encode(Sha256::digest(&upload.bytes)),
      uploaded_by: upload.uploaded_by,
    };
    // The file write and the row insert are not atomic; a failed insert
    // leaves the file behind.
    let attachment = store.record_attachment(input).await.map_err(Error::store)?;

    info!(
      attachment_id = %attachment.attachment_id,
      rca_id = %attachment.rca_id,
      path = %attachment.stored_path,
      size = attachment.size_bytes,
      "stored attachment"
    );
    Ok(self.view(attachment))
  }

  pub async fn list<S: RcaStore>(&self, store: &S, rca_id: Uuid) -> Result<Vec<AttachmentView>> {
    require_rca(store, rca_id).await?;
    let rows = store.list_attachments(rca_id).await.map_err(Error::store)?;
    Ok(rows.into_iter().map(|a| self.view(a)).collect())
  }

  /// Remove the row, and the file on a best-effort basis.
  pub async fn delete<S: RcaStore>(&self, store: &S, attachment_id: Uuid) -> Result<()> {
    let attachment = store
      .get_attachment(attachment_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("attachment not found: {attachment_id}")))?;

    store.delete_attachment(attachment_id).await.map_err(Error::store)?;
    self.remove_file(&attachment.stored_path).await;
    info!(%attachment_id, "deleted attachment");
    Ok(())
  }

  /// Delete an RCA with everything it owns, files included.
  pub async fn delete_rca<S: RcaStore>(&self, store: &S, rca_id: Uuid) -> Result<()> {
    let attachments = store.list_attachments(rca_id).await.map_err(Error::store)?;
    store.delete_rca(rca_id).await.map_err(Error::store)?;
    for attachment in &attachments {
      self.remove_file(&attachment.stored_path).await;
    }
    info!(%rca_id, files = attachments.len(), "deleted rca");
    Ok(())
  }

  async fn remove_file(&self, path: &str) {
    match self.blobs.exists(path).await {
      Ok(false) => debug!(path, "attachment file already missing"),
      Ok(true) => {
        if let Err(e) = self.blobs.delete(path).await {
          warn!(path, error = %e, "could not remove attachment file");
        }
      }
      Err(e) => warn!(path, error = %e, "could not check attachment file"),
    }
  }
}

async fn require_rca<S: RcaStore>(store: &S, rca_id: Uuid) -> Result<()> {
  match store.get_rca(rca_id).await.map_err(Error::store)? {
    Some(_) => Ok(()),
    None => Err(Error::NotFound(format!("rca not found: {rca_id}"))),
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use rca_core::{
    analysis::Analysis,
    rca::{NewRca, RcaFields},
  };
  use rca_store_sqlite::SqliteStore;

  use super::*;

  async fn setup() -> (SqliteStore, AttachmentRegistry, tempfile::TempDir, Uuid) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let rca = store
      .create_rca(
        NewRca::new("RCA-1", RcaFields::new("Pump trip", Utc::now())),
        Analysis::default(),
      )
      .await
      .unwrap();
    let registry = AttachmentRegistry::new(FsBlobStore::new(dir.path()), "/files/");
    (store, registry, dir, rca.rca.rca_id)
  }

  fn upload(rca_id: Uuid, name: &str, bytes: &'static [u8]) -> Upload {
    Upload {
      rca_id,
      file_name: name.into(),
      content_type: None,
      bytes: Bytes::from_static(bytes),
      uploaded_by: Some("tech1".into()),
    }
  }

  #[tokio::test]
  async fn uploads_are_classified_and_hashed() {
    let (store, registry, dir, rca_id) = setup().await;

    let photo = registry.upload(&store, upload(rca_id, "Seal.JPG", b"JPEG")).await.unwrap();
    let a = &photo.attachment;
    assert!(a.stored_path.starts_with("photos/"));
    assert!(a.stored_path.ends_with("_Seal.JPG"));
    assert_eq!(a.file_type, "jpg");
    assert_eq!(a.size_bytes, 4);
    assert_eq!(a.sha256, hex::encode(Sha256::digest(b"JPEG")));
    assert_eq!(photo.url, format!("/files/{}", a.stored_path));
    assert_eq!(std::fs::read(dir.path().join(&a.stored_path)).unwrap(), b"JPEG");

    let pdf = registry.upload(&store, upload(rca_id, "manual.pdf", b"%PDF")).await.unwrap();
    assert!(pdf.attachment.stored_path.starts_with("pdfs/"));
    let log = registry.upload(&store, upload(rca_id, "trend.csv", b"t,v")).await.unwrap();
    assert!(log.attachment.stored_path.starts_with("evidence/"));

    assert_eq!(registry.list(&store, rca_id).await.unwrap().len(), 3);
  }

  #[tokio::test]
  async fn same_name_twice_does_not_collide() {
    let (store, registry, _dir, rca_id) = setup().await;
    let a = registry.upload(&store, upload(rca_id, "a.png", b"1")).await.unwrap();
    let b = registry.upload(&store, upload(rca_id, "a.png", b"2")).await.unwrap();
    assert_ne!(a.attachment.stored_path, b.attachment.stored_path);
  }

  #[tokio::test]
  async fn upload_to_missing_rca_writes_nothing() {
    let (store, registry, dir, _) = setup().await;
    let err = registry
      .upload(&store, upload(Uuid::new_v4(), "a.png", b"1"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(!dir.path().join("photos").exists());
  }

  #[tokio::test]
  async fn delete_survives_a_missing_file() {
    let (store, registry, dir, rca_id) = setup().await;
    let view = registry.upload(&store, upload(rca_id, "a.png", b"1")).await.unwrap();
    std::fs::remove_file(dir.path().join(&view.attachment.stored_path)).unwrap();

    registry.delete(&store, view.attachment.attachment_id).await.unwrap();
    assert!(store.get_attachment(view.attachment.attachment_id).await.unwrap().is_none());

    let err = registry.delete(&store, view.attachment.attachment_id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
  }

  /// Records, at each file delete, how many rows the RCA still has.
  struct WatchingBlobs {
    store:  SqliteStore,
    rca_id: Uuid,
    seen:   std::sync::Mutex<Vec<usize>>,
  }

  impl BlobStore for WatchingBlobs {
    async fn write(&self, _path: &str, _bytes: &[u8]) -> std::io::Result<()> { Ok(()) }

    async fn exists(&self, _path: &str) -> std::io::Result<bool> { Ok(true) }

    async fn delete(&self, _path: &str) -> std::io::Result<()> {
      let rows = self
        .store
        .list_attachments(self.rca_id)
        .await
        .map_err(std::io::Error::other)?;
      self.seen.lock().unwrap().push(rows.len());
      Err(std::io::Error::other("disk is read-only"))
    }
  }

  #[tokio::test]
  async fn row_goes_before_the_file() {
    let (store, _, _dir, rca_id) = setup().await;
    let blobs = WatchingBlobs { store: store.clone(), rca_id, seen: Default::default() };
    let registry = AttachmentRegistry::new(blobs, "/files");
    let view = registry.upload(&store, upload(rca_id, "a.png", b"1")).await.unwrap();

    registry.delete(&store, view.attachment.attachment_id).await.unwrap();
    assert!(store.get_attachment(view.attachment.attachment_id).await.unwrap().is_none());
    assert_eq!(*registry.blobs.seen.lock().unwrap(), [0]);

    let err = registry.delete(&store, view.attachment.attachment_id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(registry.blobs.seen.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn deleting_an_rca_removes_its_files() {
    let (store, registry, dir, rca_id) = setup().await;
    let view = registry.upload(&store, upload(rca_id, "a.png", b"1")).await.unwrap();

    registry.delete_rca(&store, rca_id).await.unwrap();
    assert!(store.get_rca(rca_id).await.unwrap().is_none());
    assert!(!dir.path().join(&view.attachment.stored_path).exists());
  }
}
