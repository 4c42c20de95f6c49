//! Error types for the report renderer.

use rca_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The PDF backend rejected the document.
  #[error("pdf rendering failed: {0}")]
  Pdf(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Classify for Error {
  fn kind(&self) -> ErrorKind { ErrorKind::Internal }
}
