//! The `RcaStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `rca-store-sqlite`).
//! Higher layers (`rca-server`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  analysis::{Analysis, CausalEntry, CauseEntry, NewCausalEntry, NewCauseEntry},
  attachment::{Attachment, NewAttachment},
  error::Classify,
  rca::{NewRca, Rca, RcaAggregate, RcaPatch, RcaQuery},
  stats::{AreaSummary, CriticalityCount, Summary},
  user::{Credential, Enrollment, NewUser, User},
};

/// Abstraction over an RCA store backend.
///
/// Every operation that touches more than one row is atomic: a failure
/// leaves no partial writes behind. Point lookups report absence as
/// `Ok(None)`; operations on a specific record report absence as a
/// `NotFound`-kind error.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RcaStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// Cheap connectivity probe.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── RCA aggregate ─────────────────────────────────────────────────────

  /// Persist a new record plus the initial contents of its child
  /// collections and return the hydrated aggregate.
  ///
  /// Fails with a `DuplicateKey`-kind error, without writing anything, if
  /// the code is already in use.
  fn create_rca(
    &self,
    input: NewRca,
    analysis: Analysis,
  ) -> impl Future<Output = Result<RcaAggregate, Self::Error>> + Send + '_;

  fn get_rca(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RcaAggregate>, Self::Error>> + Send + '_;

  fn get_rca_by_code(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Option<RcaAggregate>, Self::Error>> + Send + '_;

  /// A page of records in insertion order.
  fn list_rcas(
    &self,
    query: RcaQuery,
  ) -> impl Future<Output = Result<Vec<Rca>, Self::Error>> + Send + '_;

  /// Write the filled slots of `patch`, replace whichever child collections
  /// `analysis` supplies, and refresh `updated_at`.
  fn update_rca(
    &self,
    id: Uuid,
    patch: RcaPatch,
    analysis: Analysis,
  ) -> impl Future<Output = Result<RcaAggregate, Self::Error>> + Send + '_;

  /// Remove a record together with its child entries and attachment rows.
  fn delete_rca(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Child collections ─────────────────────────────────────────────────

  fn causal_chain(
    &self,
    rca_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CausalEntry>, Self::Error>> + Send + '_;

  fn add_causal_entry(
    &self,
    rca_id: Uuid,
    entry: NewCausalEntry,
  ) -> impl Future<Output = Result<CausalEntry, Self::Error>> + Send + '_;

  fn causes(
    &self,
    rca_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CauseEntry>, Self::Error>> + Send + '_;

  fn add_cause_entry(
    &self,
    rca_id: Uuid,
    entry: NewCauseEntry,
  ) -> impl Future<Output = Result<CauseEntry, Self::Error>> + Send + '_;

  // ── Attachments ───────────────────────────────────────────────────────

  /// Insert a metadata row. Fails with `NotFound` if the RCA is absent.
  fn record_attachment(
    &self,
    input: NewAttachment,
  ) -> impl Future<Output = Result<Attachment, Self::Error>> + Send + '_;

  fn get_attachment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Attachment>, Self::Error>> + Send + '_;

  fn list_attachments(
    &self,
    rca_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Attachment>, Self::Error>> + Send + '_;

  fn delete_attachment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Statistics ────────────────────────────────────────────────────────

  fn summary(&self) -> impl Future<Output = Result<Summary, Self::Error>> + Send + '_;

  fn summary_by_area(
    &self,
  ) -> impl Future<Output = Result<Vec<AreaSummary>, Self::Error>> + Send + '_;

  fn summary_by_criticality(
    &self,
  ) -> impl Future<Output = Result<Vec<CriticalityCount>, Self::Error>> + Send + '_;

  // ── Accounts ──────────────────────────────────────────────────────────

  fn count_users(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Create an account. Fails with `DuplicateKey` if the email or username
  /// is taken. A [`Enrollment::Bootstrap`] insert additionally fails with an
  /// `Unauthenticated`-kind error unless the account table is empty at the
  /// moment of insertion.
  fn create_user(
    &self,
    input: NewUser,
    enrollment: Enrollment,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up an account and its password hash by email.
  fn get_credential(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<Credential>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
    offset: usize,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  fn record_login(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn set_user_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;
}
