//! Core types and trait definitions for the RCA record store.
//!
//! Free of HTTP and database dependencies; every other crate in the
//! workspace builds on these types and on [`store::RcaStore`].

pub mod analysis;
pub mod attachment;
pub mod error;
pub mod rca;
pub mod stats;
pub mod store;
pub mod user;

pub use error::{Classify, Error, ErrorKind, Result};
