//! Printable reports for RCA records.
//!
//! Rendering happens in two steps. [`layout`] turns an
//! [`RcaAggregate`](rca_core::rca::RcaAggregate) into a [`Report`], a plain
//! document model with every value already formatted. [`render_pdf`] then
//! serialises that model to A4 PDF bytes. Pure synchronous; no HTTP or
//! database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! # fn demo(aggregate: &rca_core::rca::RcaAggregate) -> rca_report::Result<()> {
//! let bytes = rca_report::render(aggregate, chrono::Utc::now())?;
//! assert!(bytes.starts_with(b"%PDF"));
//! # Ok(())
//! # }
//! ```

pub mod error;
mod layout;
mod pdf;

use chrono::{DateTime, Utc};
use rca_core::rca::RcaAggregate;

pub use error::{Error, Result};
pub use layout::{Field, NOT_AVAILABLE, Report, Section, file_name, layout};
pub use pdf::render_pdf;

/// Lay out and render `aggregate` in one go.
pub fn render(aggregate: &RcaAggregate, generated_at: DateTime<Utc>) -> Result<Vec<u8>> {
  render_pdf(&layout(aggregate, generated_at))
}
