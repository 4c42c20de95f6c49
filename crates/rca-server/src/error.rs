//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use rca_core::{Classify, ErrorKind};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("authentication required")]
  Unauthenticated,
  #[error("invalid email or password")]
  InvalidCredentials,
  #[error("account is inactive")]
  AccountInactive,
  #[error("insufficient permissions")]
  Forbidden,
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Conflict(String),
  #[error("{0}")]
  BadRequest(String),
  #[error("storage error: {0}")]
  Storage(#[from] std::io::Error),
  #[error("report error: {0}")]
  Report(#[from] rca_report::Error),
  #[error("internal error: {0}")]
  Internal(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// Translate a store (or core) failure by its kind.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    match e.kind() {
      ErrorKind::DuplicateKey => Self::Conflict(e.to_string()),
      ErrorKind::NotFound => Self::NotFound(e.to_string()),
      ErrorKind::ValidationFailure => Self::BadRequest(e.to_string()),
      ErrorKind::Unauthenticated => Self::Unauthenticated,
      ErrorKind::InvalidCredentials => Self::InvalidCredentials,
      ErrorKind::AccountInactive => Self::AccountInactive,
      ErrorKind::Forbidden => Self::Forbidden,
      ErrorKind::StorageFailure | ErrorKind::Internal => Self::Store(Box::new(e)),
    }
  }
}

impl From<rca_core::Error> for Error {
  fn from(e: rca_core::Error) -> Self { Self::store(e) }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Unauthenticated => ErrorKind::Unauthenticated,
      Self::InvalidCredentials => ErrorKind::InvalidCredentials,
      Self::AccountInactive => ErrorKind::AccountInactive,
      Self::Forbidden => ErrorKind::Forbidden,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Conflict(_) => ErrorKind::DuplicateKey,
      Self::BadRequest(_) => ErrorKind::ValidationFailure,
      Self::Storage(_) => ErrorKind::StorageFailure,
      Self::Report(_) | Self::Internal(_) | Self::Store(_) => ErrorKind::Internal,
    }
  }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::DuplicateKey => StatusCode::CONFLICT,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::InvalidCredentials | ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
    ErrorKind::AccountInactive | ErrorKind::Forbidden => StatusCode::FORBIDDEN,
    ErrorKind::ValidationFailure => StatusCode::BAD_REQUEST,
    ErrorKind::StorageFailure | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let kind = self.kind();
    let status = status_for(kind);
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let body = Json(json!({ "error": self.to_string(), "kind": kind }));
    let mut res = (status, body).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn store_errors_map_by_kind() {
    let dup = Error::from(rca_core::Error::DuplicateCode("RCA-1".into()));
    assert!(matches!(dup, Error::Conflict(_)));

    let missing = Error::from(rca_core::Error::RcaNotFound(Uuid::nil()));
    assert_eq!(status_for(missing.kind()), StatusCode::NOT_FOUND);

    let closed = Error::from(rca_core::Error::BootstrapClosed);
    assert!(matches!(closed, Error::Unauthenticated));
  }

  #[test]
  fn unauthorized_responses_carry_challenge() {
    let res = Error::InvalidCredentials.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let res = Error::AccountInactive.into_response();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(!res.headers().contains_key(header::WWW_AUTHENTICATE));
  }
}
