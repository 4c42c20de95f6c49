//! Handlers for `/attachments` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/attachments` | Multipart: `rca_id`, optional `content_type`, `file` |
//! | `GET`    | `/attachments/:id` | Metadata plus download `url` |
//! | `DELETE` | `/attachments/:id` | File removal is best-effort |

use axum::{
  Json,
  extract::{Multipart, Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use rca_core::store::RcaStore;
use uuid::Uuid;

use crate::{
  AppState,
  attachments::{AttachmentView, Upload},
  auth::CurrentUser,
  error::{Error, Result},
};

/// Request bodies above this size are rejected before reaching the handler.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

fn bad_multipart(e: impl std::fmt::Display) -> Error {
  Error::BadRequest(format!("invalid multipart body: {e}"))
}

/// `POST /attachments`
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  mut multipart: Multipart,
) -> Result<impl IntoResponse>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let mut rca_id: Option<Uuid> = None;
  let mut content_type: Option<String> = None;
  let mut file: Option<(String, Option<String>, Bytes)> = None;

  while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
    let name = field.name().map(str::to_owned);
    match name.as_deref() {
      Some("rca_id") => {
        let text = field.text().await.map_err(bad_multipart)?;
        let id = text
          .trim()
          .parse()
          .map_err(|_| Error::BadRequest(format!("invalid rca_id: {text:?}")))?;
        rca_id = Some(id);
      }
      Some("content_type") => {
        let text = field.text().await.map_err(bad_multipart)?;
        content_type = Some(text.trim().to_owned()).filter(|s| !s.is_empty());
      }
      Some("file") => {
        let original = field.file_name().unwrap_or_default().to_owned();
        let declared = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(bad_multipart)?;
        file = Some((original, declared, bytes));
      }
      _ => {}
    }
  }

  let rca_id = rca_id.ok_or_else(|| Error::BadRequest("missing field: rca_id".into()))?;
  let (file_name, declared, bytes) =
    file.ok_or_else(|| Error::BadRequest("missing field: file".into()))?;

  let view = state
    .attachments
    .upload(state.store.as_ref(), Upload {
      rca_id,
      file_name,
      content_type: content_type.or(declared),
      bytes,
      uploaded_by: Some(user.username),
    })
    .await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /attachments/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<Json<AttachmentView>>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  let attachment = state
    .store
    .get_attachment(id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::NotFound(format!("attachment not found: {id}")))?;
  let url = state.attachments.url_for(&attachment.stored_path);
  Ok(Json(AttachmentView { attachment, url }))
}

/// `DELETE /attachments/:id`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  CurrentUser(_): CurrentUser,
  Path(id): Path<Uuid>,
) -> Result<StatusCode>
where
  S: RcaStore + Clone + Send + Sync + 'static,
{
  state.attachments.delete(state.store.as_ref(), id).await?;
  Ok(StatusCode::NO_CONTENT)
}
