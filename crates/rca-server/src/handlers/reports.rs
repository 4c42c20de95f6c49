//! Handlers for `/reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports/summary` | Counts per status, critical count, closure rate |
//! | `GET`  | `/reports/by-area` | Records without an area are `"Unassigned"` |
//! | `GET`  | `/reports/by-criticality` | Only levels that occur |
//! | `GET`  | `/reports/rca/:id/pdf` | `application/pdf` download |

use axum::{
  Json,
  extract::{Path, State},
  http::header,
  response::IntoResponse,
};
use chrono::Utc;
use rca_core::{
  stats::{AreaSummary, CriticalityCount, Summary},
  store::RcaStore,
};
use uuid::Uuid;

use crate::{
  AppState,
  auth::CurrentUser,
  error::{Error, Result},
};

/// `GET /reports/summary`
pub async fn summary<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
) -> Result<Json<Summary>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.summary().await.map_err(Error::store)?))
}

/// `GET /reports/by-area`
pub async fn by_area<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
) -> Result<Json<Vec<AreaSummary>>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.summary_by_area().await.map_err(Error::store)?))
}

/// `GET /reports/by-criticality`
pub async fn by_criticality<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
) -> Result<Json<Vec<CriticalityCount>>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.summary_by_criticality().await.map_err(Error::store)?))
}

/// `GET /reports/rca/:id/pdf`
pub async fn rca_pdf<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let aggregate = state
    .store
    .get_rca(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("rca not found: {id}")))?;

  let file_name = rca_report::file_name(&aggregate.rca.code);
  let bytes = tokio::task::spawn_blocking(move || rca_report::render(&aggregate, Utc::now()))
    .await
    .map_err(|e| Error::Internal(format!("render task failed: {e}")))??;

  Ok((
    [
      (header::CONTENT_TYPE, "application/pdf".to_owned()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
    ],
    bytes,
  ))
}
