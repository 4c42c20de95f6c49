//! Handlers for `/auth` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/auth/login` | Body: `{"email","password"}`; returns a bearer token |
//! | `POST`  | `/auth/register` | Open while no account exists, then Supervisor/Manager only |
//! | `POST`  | `/auth/logout` | Stateless acknowledgement |
//! | `GET`   | `/auth/me` | The caller's account |
//! | `GET`   | `/auth/users` | Supervisor/Manager; `?offset&limit` |
//! | `PATCH` | `/auth/users/:id/active` | Supervisor/Manager; body: `{"active":false}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rca_core::{
  store::RcaStore,
  user::{Registration, User},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{self, Administrator, CurrentUser, MaybeBearer, Session},
  error::{Error, Result},
};

#[derive(Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<Session>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let session = auth::login(state.store.as_ref(), &state.tokens, &body.email, &body.password).await?;
  Ok(Json(session))
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  MaybeBearer(bearer): MaybeBearer,
  Json(body): Json<Registration>,
) -> Result<impl IntoResponse>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let user =
    auth::register_user(state.store.as_ref(), &state.tokens, body, bearer.as_deref()).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /auth/logout`. Tokens are not revocable; the client drops its copy.
pub async fn logout() -> Json<Value> { Json(json!({ "message": "logged out" })) }

/// `GET /auth/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> { Json(user) }

#[derive(Debug, Deserialize)]
pub struct PageParams {
  pub offset: Option<usize>,
  pub limit:  Option<usize>,
}

/// `GET /auth/users[?offset=&limit=]`
pub async fn list_users<S>(
  State(state): State<AppState<S>>,
  Administrator(_): Administrator,
  Query(params): Query<PageParams>,
) -> Result<Json<Vec<User>>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let limit = state.config.page_size(params.limit);
  let users = state
    .store
    .list_users(params.offset.unwrap_or(0), limit)
    .await
    .map_err(Error::store)?;
  Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub active: bool,
}

/// `PATCH /auth/users/:id/active`
pub async fn set_active<S>(
  State(state): State<AppState<S>>,
  Administrator(admin): Administrator,
  Path(id): Path<Uuid>,
  Json(body): Json<ActiveBody>,
) -> Result<Json<User>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let user = state
    .store
    .set_user_active(id, body.active)
    .await
    .map_err(Error::store)?;
  info!(
    user_id = %user.user_id,
    by = %admin.user_id,
    active = user.active,
    "account activation changed"
  );
  Ok(Json(user))
}
