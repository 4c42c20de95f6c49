//! Runtime configuration.

use std::{
  fmt,
  path::{Path, PathBuf},
};

use chrono::Duration;
use serde::Deserialize;

/// Longest session a token may be issued for: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;

/// Server configuration, deserialised once at startup from `config.toml`
/// layered with `RCA_*` environment variables.
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  pub database_path:    PathBuf,
  /// Root directory for uploaded evidence files.
  pub storage_root:     PathBuf,
  #[serde(default = "default_backup_root")]
  pub backup_root:      PathBuf,
  /// HMAC secret for session tokens.
  pub jwt_secret:       String,
  #[serde(default = "default_token_ttl_hours")]
  pub token_ttl_hours:  i64,
  /// Upper bound applied to every `limit` query parameter.
  #[serde(default = "default_max_page_size")]
  pub max_page_size:    usize,
  /// URL prefix under which `storage_root` is served.
  #[serde(default = "default_files_url_prefix")]
  pub files_url_prefix: String,
}

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 8000 }
fn default_backup_root() -> PathBuf { PathBuf::from("backups") }
fn default_token_ttl_hours() -> i64 { 24 }
fn default_max_page_size() -> usize { 100 }
fn default_files_url_prefix() -> String { "/files".to_owned() }

impl ServerConfig {
  /// Expand a leading `~/` in every configured path.
  pub fn expand_paths(mut self) -> Self {
    self.database_path = expand_tilde(&self.database_path);
    self.storage_root = expand_tilde(&self.storage_root);
    self.backup_root = expand_tilde(&self.backup_root);
    self
  }

  /// `token_ttl_hours` as a duration, or `None` when it is outside
  /// `1..=MAX_TOKEN_TTL_HOURS`.
  pub fn token_ttl(&self) -> Option<Duration> {
    (1..=MAX_TOKEN_TTL_HOURS)
      .contains(&self.token_ttl_hours)
      .then(|| Duration::hours(self.token_ttl_hours))
  }

  /// Clamp a client-requested page size to `max_page_size`.
  pub fn page_size(&self, requested: Option<usize>) -> usize {
    requested.unwrap_or(self.max_page_size).min(self.max_page_size)
  }
}

impl fmt::Debug for ServerConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ServerConfig")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("database_path", &self.database_path)
      .field("storage_root", &self.storage_root)
      .field("backup_root", &self.backup_root)
      .field("jwt_secret", &"<redacted>")
      .field("token_ttl_hours", &self.token_ttl_hours)
      .field("max_page_size", &self.max_page_size)
      .field("files_url_prefix", &self.files_url_prefix)
      .finish()
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_fill_optional_fields() {
    let cfg: ServerConfig = serde_json::from_value(serde_json::json!({
      "database_path": "rca.sqlite3",
      "storage_root":  "files",
      "jwt_secret":    "s3cret",
    }))
    .unwrap();

    assert_eq!(cfg.port, 8000);
    assert_eq!(cfg.token_ttl_hours, 24);
    assert_eq!(cfg.files_url_prefix, "/files");
    assert_eq!(cfg.page_size(None), 100);
    assert_eq!(cfg.page_size(Some(10)), 10);
    assert_eq!(cfg.page_size(Some(10_000)), 100);
    assert!(!format!("{cfg:?}").contains("s3cret"));
  }

  #[test]
  fn token_ttl_must_be_in_range() {
    let mut cfg: ServerConfig = serde_json::from_value(serde_json::json!({
      "database_path": "rca.sqlite3",
      "storage_root":  "files",
      "jwt_secret":    "s3cret",
    }))
    .unwrap();
    assert_eq!(cfg.token_ttl(), Some(Duration::hours(24)));

    for hours in [0, -5, MAX_TOKEN_TTL_HOURS + 1, i64::MAX] {
      cfg.token_ttl_hours = hours;
      assert_eq!(cfg.token_ttl(), None, "{hours}");
    }
    cfg.token_ttl_hours = MAX_TOKEN_TTL_HOURS;
    assert!(cfg.token_ttl().is_some());
  }

  #[test]
  fn relative_paths_are_untouched() {
    assert_eq!(expand_tilde(Path::new("data/rca.db")), PathBuf::from("data/rca.db"));
  }
}
