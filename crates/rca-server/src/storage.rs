//! Where attachment bytes live.

use std::{
  io,
  path::{Component, Path, PathBuf},
};

/// Byte storage addressed by `/`-separated relative paths.
pub trait BlobStore: Send + Sync {
  fn write(&self, path: &str, bytes: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

  fn exists(&self, path: &str) -> impl Future<Output = io::Result<bool>> + Send;

  fn delete(&self, path: &str) -> impl Future<Output = io::Result<()>> + Send;
}

/// Files under a root directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
  root: PathBuf,
}

impl FsBlobStore {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  /// Join `path` onto the root, refusing anything that could escape it.
  fn resolve(&self, path: &str) -> io::Result<PathBuf> {
    let rel = Path::new(path);
    if rel.as_os_str().is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
      return Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("refusing storage path {path:?}"),
      ));
    }
    Ok(self.root.join(rel))
  }
}

impl BlobStore for FsBlobStore {
  async fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
    let full = self.resolve(path)?;
    if let Some(parent) = full.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&full, bytes).await
  }

  async fn exists(&self, path: &str) -> io::Result<bool> {
    tokio::fs::try_exists(self.resolve(path)?).await
  }

  async fn delete(&self, path: &str) -> io::Result<()> {
    tokio::fs::remove_file(self.resolve(path)?).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn write_creates_folders() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path());

    blobs.write("photos/a.jpg", b"JPEG").await.unwrap();
    assert!(blobs.exists("photos/a.jpg").await.unwrap());
    assert_eq!(std::fs::read(dir.path().join("photos/a.jpg")).unwrap(), b"JPEG");

    blobs.delete("photos/a.jpg").await.unwrap();
    assert!(!blobs.exists("photos/a.jpg").await.unwrap());
  }

  #[tokio::test]
  async fn escaping_paths_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path());

    for path in ["../x", "/etc/passwd", "photos/../../x", ""] {
      let err = blobs.write(path, b"x").await.unwrap_err();
      assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "{path}");
    }
  }
}
