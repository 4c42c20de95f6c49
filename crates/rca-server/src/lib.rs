//! HTTP layer for the RCA record service.
//!
//! Exposes an axum [`Router`] serving the JSON API over any [`RcaStore`],
//! plus the uploaded evidence files under the configured URL prefix.
//! Every route except `/`, `/health`, `/auth/login`, `/auth/logout` and the
//! file tree requires a bearer token; see [`auth`].

pub mod attachments;
pub mod auth;
pub mod backup;
pub mod config;
pub mod error;
pub mod handlers;
pub mod storage;

pub use config::ServerConfig;
pub use error::Error;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, patch, post},
};
use rca_core::store::RcaStore;
use tower_http::{services::ServeDir, trace::TraceLayer};

use attachments::AttachmentRegistry;
use auth::TokenIssuer;
use handlers::{attachments as files, auth as account, rca, reports, system};
use storage::FsBlobStore;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: RcaStore> {
  pub store:       Arc<S>,
  pub config:      Arc<ServerConfig>,
  pub tokens:      Arc<TokenIssuer>,
  pub attachments: Arc<AttachmentRegistry<FsBlobStore>>,
}

impl<S: RcaStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    let ttl = config.token_ttl().unwrap_or_else(|| chrono::Duration::hours(24));
    let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), ttl);
    let attachments = AttachmentRegistry::new(
      FsBlobStore::new(&config.storage_root),
      config.files_url_prefix.clone(),
    );
    Self {
      store:       Arc::new(store),
      config:      Arc::new(config),
      tokens:      Arc::new(tokens),
      attachments: Arc::new(attachments),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let files_prefix = format!("/{}", state.config.files_url_prefix.trim_matches('/'));
  let files = ServeDir::new(&state.config.storage_root);

  Router::new()
    .route("/",                             get(system::root))
    .route("/health",                       get(system::health::<S>))
    // Accounts
    .route("/auth/login",                   post(account::login::<S>))
    .route("/auth/register",                post(account::register::<S>))
    .route("/auth/logout",                  post(account::logout))
    .route("/auth/me",                      get(account::me))
    .route("/auth/users",                   get(account::list_users::<S>))
    .route("/auth/users/{id}/active",       patch(account::set_active::<S>))
    // Records
    .route("/rca",                          get(rca::list::<S>).post(rca::create::<S>))
    .route("/rca/by-code/{code}",           get(rca::get_by_code::<S>))
    .route(
      "/rca/{id}",
      get(rca::get_one::<S>).put(rca::update::<S>).delete(rca::delete_one::<S>),
    )
    .route(
      "/rca/{id}/causal-chain",
      get(rca::causal_chain::<S>).post(rca::add_causal_entry::<S>),
    )
    .route("/rca/{id}/causes",              get(rca::causes::<S>).post(rca::add_cause_entry::<S>))
    .route("/rca/{id}/attachments",         get(rca::attachments::<S>))
    // Attachments
    .route(
      "/attachments",
      post(files::upload::<S>).layer(DefaultBodyLimit::max(files::MAX_UPLOAD_BYTES)),
    )
    .route("/attachments/{id}",             get(files::get_one::<S>).delete(files::delete_one::<S>))
    // Reports
    .route("/reports/summary",              get(reports::summary::<S>))
    .route("/reports/by-area",              get(reports::by_area::<S>))
    .route("/reports/by-criticality",       get(reports::by_criticality::<S>))
    .route("/reports/rca/{id}/pdf",         get(reports::rca_pdf::<S>))
    .nest_service(&files_prefix, files)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
