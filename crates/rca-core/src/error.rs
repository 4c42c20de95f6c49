//! Error types for `rca-core`, and the transport-independent error taxonomy
//! shared by every crate in the workspace.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ─── Taxonomy ────────────────────────────────────────────────────────────────

/// The abstract kind of a failure. The HTTP boundary maps kinds to status
/// codes; nothing below it knows about transports.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::AsRefStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  DuplicateKey,
  NotFound,
  InvalidCredentials,
  AccountInactive,
  Unauthenticated,
  Forbidden,
  StorageFailure,
  ValidationFailure,
  Internal,
}

/// Implemented by every error type that can cross a crate boundary, so callers
/// can branch on the kind without downcasting.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

// ─── Core error ──────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error("rca code {0:?} already exists")]
  DuplicateCode(String),

  #[error("email {0:?} is already registered")]
  DuplicateEmail(String),

  #[error("username {0:?} is already taken")]
  DuplicateUsername(String),

  #[error("rca not found: {0}")]
  RcaNotFound(Uuid),

  #[error("attachment not found: {0}")]
  AttachmentNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  /// A bootstrap enrolment raced with another registration and lost.
  #[error("an account already exists; authentication is required")]
  BootstrapClosed,

  #[error("invalid {field}: {reason}")]
  Invalid { field: &'static str, reason: String },
}

impl Error {
  pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Invalid { field, reason: reason.into() }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::DuplicateCode(_)
      | Self::DuplicateEmail(_)
      | Self::DuplicateUsername(_) => ErrorKind::DuplicateKey,
      Self::RcaNotFound(_)
      | Self::AttachmentNotFound(_)
      | Self::UserNotFound(_) => ErrorKind::NotFound,
      Self::BootstrapClosed => ErrorKind::Unauthenticated,
      Self::Invalid { .. } => ErrorKind::ValidationFailure,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
