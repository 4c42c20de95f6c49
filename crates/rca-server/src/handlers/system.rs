//! Unauthenticated service endpoints.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rca_core::store::RcaStore;
use serde_json::{Value, json};

use crate::AppState;

/// `GET /`
pub async fn root() -> Json<Value> {
  Json(json!({
    "name":    env!("CARGO_PKG_NAME"),
    "version": env!("CARGO_PKG_VERSION"),
    "status":  "ok",
  }))
}

/// `GET /health`: 200 while the database answers, 503 otherwise.
pub async fn health<S>(State(state): State<AppState<S>>) -> impl IntoResponse
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  match state.store.ping().await {
    Ok(()) => (StatusCode::OK, Json(json!({ "status": "healthy", "database": "connected" }))),
    Err(e) => {
      tracing::warn!(error = %e, "health check failed");
      (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "unhealthy", "database": "unreachable" })),
      )
    }
  }
}
