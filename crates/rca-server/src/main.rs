//! rca-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `RCA_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.
//!
//! # Backups
//!
//! ```text
//! rca-server --config config.toml --backup
//! ```
//!
//! writes a database snapshot and a copy of the evidence files under
//! `backup_root`, then exits.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use rca_core::attachment::StorageFolder;
use rca_server::{AppState, ServerConfig, backup, config::MAX_TOKEN_TTL_HOURS};
use rca_store_sqlite::SqliteStore;
use strum::IntoEnumIterator as _;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "RCA record-keeping server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Write a backup of the database and evidence files, then exit.
  #[arg(long)]
  backup: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("RCA"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize::<ServerConfig>()
    .context("failed to deserialise ServerConfig")?
    .expand_paths();
  anyhow::ensure!(!server_cfg.jwt_secret.trim().is_empty(), "jwt_secret must not be empty");
  anyhow::ensure!(
    server_cfg.token_ttl().is_some(),
    "token_ttl_hours must be between 1 and {}, got {}",
    MAX_TOKEN_TTL_HOURS,
    server_cfg.token_ttl_hours,
  );
  tracing::debug!(config = ?server_cfg, "configuration loaded");

  if let Some(parent) = server_cfg.database_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&server_cfg.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.database_path))?;

  if cli.backup {
    let report = backup::write_backup(
      &store,
      &server_cfg.storage_root,
      &server_cfg.backup_root,
      chrono::Utc::now(),
    )
    .await
    .context("backup failed")?;
    println!("{}", report.database.display());
    if let Some(files) = report.files {
      println!("{}", files.display());
    }
    return Ok(());
  }

  for folder in StorageFolder::iter() {
    let dir = server_cfg.storage_root.join(folder.as_ref());
    tokio::fs::create_dir_all(&dir)
      .await
      .with_context(|| format!("failed to create {dir:?}"))?;
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let app = rca_server::router(AppState::new(store, server_cfg));

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
