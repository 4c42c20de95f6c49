//! Point-in-time copies of the database and the attachment tree.

use std::{
  fs, io,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use rca_store_sqlite::SqliteStore;
use tracing::info;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
  pub database: PathBuf,
  /// `None` when there was no storage root to copy.
  pub files:    Option<PathBuf>,
}

/// Write `db_backup_<stamp>.sqlite3` and `files_<stamp>/` under
/// `backup_root`.
pub async fn write_backup(
  store: &SqliteStore,
  storage_root: &Path,
  backup_root: &Path,
  at: DateTime<Utc>,
) -> Result<BackupReport> {
  let stamp = at.format("%Y%m%d_%H%M%S");
  tokio::fs::create_dir_all(backup_root).await?;

  let database = backup_root.join(format!("db_backup_{stamp}.sqlite3"));
  store.backup(&database).await.map_err(Error::store)?;

  let files = if tokio::fs::try_exists(storage_root).await? {
    let src = storage_root.to_path_buf();
    let dst = backup_root.join(format!("files_{stamp}"));
    let target = dst.clone();
    tokio::task::spawn_blocking(move || copy_tree(&src, &target))
      .await
      .map_err(|e| Error::Internal(format!("backup task failed: {e}")))??;
    Some(dst)
  } else {
    None
  };

  info!(database = %database.display(), files = ?files, "backup written");
  Ok(BackupReport { database, files })
}

fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
  fs::create_dir_all(dst)?;
  for entry in fs::read_dir(src)? {
    let entry = entry?;
    let target = dst.join(entry.file_name());
    if entry.file_type()?.is_dir() {
      copy_tree(&entry.path(), &target)?;
    } else {
      fs::copy(entry.path(), target)?;
    }
  }
  Ok(())
}
