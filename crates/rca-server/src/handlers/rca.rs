//! Handlers for `/rca` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/rca` | `?offset&limit&status`; insertion order |
//! | `POST`   | `/rca` | Body: [`CreateBody`]; returns 201 + aggregate |
//! | `GET`    | `/rca/by-code/:code` | 404 if not found |
//! | `GET`    | `/rca/:id` | 404 if not found |
//! | `PUT`    | `/rca/:id` | Body: [`UpdateBody`]; partial |
//! | `DELETE` | `/rca/:id` | Also removes attachment files |
//! | `GET`    | `/rca/:id/causal-chain` | Ordered by level |
//! | `POST`   | `/rca/:id/causal-chain` | Body: `{"level":1,"answer":"..."}` |
//! | `GET`    | `/rca/:id/causes` | |
//! | `POST`   | `/rca/:id/causes` | Body: `{"category":"machine","cause":"..."}` |
//! | `GET`    | `/rca/:id/attachments` | Each entry carries its download `url` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rca_core::{
  Classify, ErrorKind,
  analysis::{Analysis, CausalEntry, CauseEntry, CauseMap, NewCausalEntry, NewCauseEntry},
  rca::{NewRca, Rca, RcaAggregate, RcaFields, RcaPatch, RcaQuery, RcaStatus},
  store::RcaStore,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  AppState,
  attachments::AttachmentView,
  auth::CurrentUser,
  error::{Error, Result},
};

fn not_found(id: Uuid) -> Error { Error::NotFound(format!("rca not found: {id}")) }

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub offset: Option<usize>,
  /// Capped at the configured `max_page_size`.
  pub limit:  Option<usize>,
  pub status: Option<RcaStatus>,
}

/// `GET /rca[?offset=&limit=&status=]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Rca>>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let query = RcaQuery {
    status: params.status,
    limit:  Some(state.config.page_size(params.limit)),
    offset: params.offset,
  };
  let rcas = state.store.list_rcas(query).await.map_err(Error::store)?;
  Ok(Json(rcas))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub code:         String,
  #[serde(flatten)]
  pub fields:       RcaFields,
  /// Answers for levels 1..=5; blank answers are skipped.
  pub causal_chain: Option<Vec<String>>,
  pub cause_map:    Option<CauseMap>,
}

/// `POST /rca`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let mut fields = body.fields;
  if fields.created_by.is_none() {
    fields.created_by = Some(user.username.clone());
  }
  let input = NewRca::new(body.code, fields);
  let code = input.code.clone();
  let analysis = Analysis { causal_chain: body.causal_chain, cause_map: body.cause_map };

  match state.store.create_rca(input, analysis).await {
    Ok(aggregate) => {
      info!(rca_id = %aggregate.rca.rca_id, code = %aggregate.rca.code, by = %user.username, "created rca");
      Ok((StatusCode::CREATED, Json(aggregate)))
    }
    Err(e) if e.kind() == ErrorKind::DuplicateKey => {
      warn!(%code, "rejected duplicate rca code");
      Err(Error::store(e))
    }
    Err(e) => Err(Error::store(e)),
  }
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /rca/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<RcaAggregate>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let aggregate = state
    .store
    .get_rca(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| not_found(id))?;
  Ok(Json(aggregate))
}

/// `GET /rca/by-code/:code`
pub async fn get_by_code<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(code): Path<String>,
) -> Result<Json<RcaAggregate>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let aggregate = state
    .store
    .get_rca_by_code(code.clone())
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("rca code {code:?} not found")))?;
  Ok(Json(aggregate))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(flatten)]
  pub patch:        RcaPatch,
  /// Replaces the whole chain when present.
  pub causal_chain: Option<Vec<String>>,
  /// Replaces every cause entry when present.
  pub cause_map:    Option<CauseMap>,
}

/// `PUT /rca/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<RcaAggregate>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let mut patch = body.patch;
  if patch.modified_by.is_none() {
    patch.modified_by = Some(user.username.clone());
  }
  let analysis = Analysis { causal_chain: body.causal_chain, cause_map: body.cause_map };

  let aggregate = state
    .store
    .update_rca(id, patch, analysis)
    .await
    .map_err(Error::store)?;
  info!(rca_id = %id, by = %user.username, "updated rca");
  Ok(Json(aggregate))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /rca/:id`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  state.attachments.delete_rca(state.store.as_ref(), id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Child collections ───────────────────────────────────────────────────────

/// `GET /rca/:id/causal-chain`
pub async fn causal_chain<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<CausalEntry>>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let entries = state.store.causal_chain(id).await.map_err(Error::store)?;
  Ok(Json(entries))
}

/// `POST /rca/:id/causal-chain`
pub async fn add_causal_entry<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<NewCausalEntry>,
) -> Result<impl IntoResponse>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let entry = state
    .store
    .add_causal_entry(id, body)
    .await
    .map_err(Error::store)?;
  Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /rca/:id/causes`
pub async fn causes<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<CauseEntry>>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let entries = state.store.causes(id).await.map_err(Error::store)?;
  Ok(Json(entries))
}

/// `POST /rca/:id/causes`
pub async fn add_cause_entry<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<Uuid>,
  Json(body): Json<NewCauseEntry>,
) -> Result<impl IntoResponse>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let entry = state
    .store
    .add_cause_entry(id, body)
    .await
    .map_err(Error::store)?;
  Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /rca/:id/attachments`
pub async fn attachments<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<AttachmentView>>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let views = state.attachments.list(state.store.as_ref(), id).await?;
  Ok(Json(views))
}
