//! Evidence files attached to an RCA.
//!
//! No binary data lives in the database; a row records where the bytes were
//! written, relative to the configured storage root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extensions filed under [`StorageFolder::Photos`].
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Subfolder of the storage root a file is classified into.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StorageFolder {
  Photos,
  Pdfs,
  Evidence,
}

impl StorageFolder {
  /// Classify by lowercase extension (without the dot).
  pub fn for_extension(ext: &str) -> Self {
    if IMAGE_EXTENSIONS.contains(&ext) {
      Self::Photos
    } else if ext == "pdf" {
      Self::Pdfs
    } else {
      Self::Evidence
    }
  }
}

/// Lowercase extension of `file_name`, or an empty string if it has none.
pub fn file_extension(file_name: &str) -> String {
  match file_name.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
    _ => String::new(),
  }
}

/// Reduce a client-supplied file name to a single safe path component.
pub fn sanitize_file_name(file_name: &str) -> String {
  let base = file_name
    .rsplit(['/', '\\'])
    .next()
    .unwrap_or_default()
    .trim();

  let cleaned: String = base
    .chars()
    .map(|c| if c.is_control() || c == ':' { '_' } else { c })
    .collect();

  let cleaned = cleaned.trim_start_matches('.');
  if cleaned.is_empty() {
    "file".to_owned()
  } else {
    cleaned.to_owned()
  }
}

/// Collision-resistant stored name: the owning RCA, the upload time, a
/// random nonce, and the sanitised original name.
pub fn stored_file_name(
  rca_id: Uuid,
  uploaded_at: DateTime<Utc>,
  nonce: &str,
  original: &str,
) -> String {
  format!(
    "{}_{}_{}_{}",
    rca_id.simple(),
    uploaded_at.format("%Y%m%d_%H%M%S"),
    nonce,
    sanitize_file_name(original),
  )
}

/// Input to [`crate::store::RcaStore::record_attachment`].
#[derive(Debug, Clone)]
pub struct NewAttachment {
  pub rca_id:       Uuid,
  pub file_name:    String,
  pub stored_path:  String,
  pub file_type:    String,
  pub content_type: Option<String>,
  pub size_bytes:   u64,
  /// SHA-256 hex digest of the stored bytes.
  pub sha256:       String,
  pub uploaded_by:  Option<String>,
}

/// Metadata for a stored evidence file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub attachment_id: Uuid,
  pub rca_id:        Uuid,
  /// Name as uploaded by the client.
  pub file_name:     String,
  /// Path relative to the storage root, always `/`-separated.
  pub stored_path:   String,
  /// Lowercase extension.
  pub file_type:     String,
  pub content_type:  Option<String>,
  pub size_bytes:    u64,
  pub sha256:        String,
  pub uploaded_by:   Option<String>,
  pub uploaded_at:   DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn classification_by_extension() {
    assert_eq!(StorageFolder::for_extension("jpg"), StorageFolder::Photos);
    assert_eq!(StorageFolder::for_extension("gif"), StorageFolder::Photos);
    assert_eq!(StorageFolder::for_extension("pdf"), StorageFolder::Pdfs);
    assert_eq!(StorageFolder::for_extension("xlsx"), StorageFolder::Evidence);
    assert_eq!(StorageFolder::for_extension(""), StorageFolder::Evidence);
    assert_eq!(StorageFolder::Photos.as_ref(), "photos");
  }

  #[test]
  fn extension_is_lowercased() {
    assert_eq!(file_extension("Pump.JPG"), "jpg");
    assert_eq!(file_extension("report.final.pdf"), "pdf");
    assert_eq!(file_extension("README"), "");
    assert_eq!(file_extension(".bashrc"), "");
  }

  #[test]
  fn sanitising_strips_directories() {
    assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
    assert_eq!(sanitize_file_name(r"C:\photos\pump.jpg"), "pump.jpg");
    assert_eq!(sanitize_file_name(".."), "file");
    assert_eq!(sanitize_file_name(""), "file");
  }

  #[test]
  fn stored_name_layout() {
    let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
    let name = stored_file_name(Uuid::nil(), at, "ab12cd34", "pump.jpg");
    assert_eq!(
      name,
      "00000000000000000000000000000000_20240506_070809_ab12cd34_pump.jpg"
    );
  }
}
