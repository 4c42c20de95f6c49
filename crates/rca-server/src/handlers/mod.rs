//! axum handlers, one module per resource.
//!
//! Every handler is generic over the record store so the router can be
//! driven by any [`rca_core::store::RcaStore`].

pub mod attachments;
pub mod auth;
pub mod rca;
pub mod reports;
pub mod system;
