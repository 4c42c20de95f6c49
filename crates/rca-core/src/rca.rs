//! The RCA record: one investigated incident.
//!
//! A record is identified internally by a UUID and externally by its
//! human-readable `code`, which is unique and never changes after creation.
//! Everything else lives in [`RcaFields`] and may be rewritten through a
//! [`RcaPatch`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  analysis::{CausalEntry, CauseEntry},
};

pub const MAX_CODE_LEN: usize = 50;
pub const MAX_TITLE_LEN: usize = 200;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Workflow state of an investigation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RcaStatus {
  #[default]
  Open,
  InAnalysis,
  InImplementation,
  Closed,
  Cancelled,
}

impl RcaStatus {
  /// Human-readable label used in rendered documents.
  pub fn label(self) -> &'static str {
    match self {
      Self::Open => "Open",
      Self::InAnalysis => "In Analysis",
      Self::InImplementation => "In Implementation",
      Self::Closed => "Closed",
      Self::Cancelled => "Cancelled",
    }
  }
}

/// Severity of the incident.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Criticality {
  Critical,
  High,
  #[default]
  Medium,
  Low,
}

impl Criticality {
  pub fn label(self) -> &'static str {
    match self {
      Self::Critical => "Critical",
      Self::High => "High",
      Self::Medium => "Medium",
      Self::Low => "Low",
    }
  }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// Every mutable attribute of an RCA record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcaFields {
  pub title:                      String,
  pub description:                Option<String>,
  /// When the failure happened, as opposed to when it was recorded.
  pub event_at:                   DateTime<Utc>,

  // ── Location ────────────────────────────────────────────────────────────
  pub area:                       Option<String>,
  pub plant:                      Option<String>,
  pub equipment:                  Option<String>,
  pub system:                     Option<String>,

  // ── Failure ─────────────────────────────────────────────────────────────
  pub failure_description:        Option<String>,
  pub impact:                     Option<String>,
  pub analysis_method:            Option<String>,

  // ── Causes ──────────────────────────────────────────────────────────────
  pub immediate_cause:            Option<String>,
  pub root_cause:                 Option<String>,
  pub contributing_causes:        Option<String>,

  // ── Actions ─────────────────────────────────────────────────────────────
  pub corrective_actions:         Option<String>,
  pub preventive_actions:         Option<String>,
  pub responsible:                Option<String>,
  pub responsible_area:           Option<String>,
  pub commitment_date:            Option<NaiveDate>,
  pub closure_date:               Option<NaiveDate>,

  // ── Classification ──────────────────────────────────────────────────────
  #[serde(default)]
  pub status:                     RcaStatus,
  #[serde(default)]
  pub criticality:                Criticality,
  pub failure_type:               Option<String>,
  pub category:                   Option<String>,
  pub downtime_hours:             Option<f64>,
  pub estimated_cost:             Option<f64>,

  // ── Effectiveness ───────────────────────────────────────────────────────
  pub effectiveness_verification: Option<String>,
  pub verification_date:          Option<NaiveDate>,
  pub effective:                  Option<bool>,

  // ── Audit ───────────────────────────────────────────────────────────────
  pub created_by:                 Option<String>,
  pub modified_by:                Option<String>,
}

impl RcaFields {
  /// Fields with only the required values set; everything else empty and
  /// enumerations at their defaults.
  pub fn new(title: impl Into<String>, event_at: DateTime<Utc>) -> Self {
    Self {
      title: title.into(),
      description: None,
      event_at,
      area: None,
      plant: None,
      equipment: None,
      system: None,
      failure_description: None,
      impact: None,
      analysis_method: None,
      immediate_cause: None,
      root_cause: None,
      contributing_causes: None,
      corrective_actions: None,
      preventive_actions: None,
      responsible: None,
      responsible_area: None,
      commitment_date: None,
      closure_date: None,
      status: RcaStatus::default(),
      criticality: Criticality::default(),
      failure_type: None,
      category: None,
      downtime_hours: None,
      estimated_cost: None,
      effectiveness_verification: None,
      verification_date: None,
      effective: None,
      created_by: None,
      modified_by: None,
    }
  }
}

fn validate_title(title: &str) -> Result<()> {
  if title.trim().is_empty() {
    return Err(Error::invalid("title", "must not be blank"));
  }
  if title.chars().count() > MAX_TITLE_LEN {
    return Err(Error::invalid(
      "title",
      format!("must be at most {MAX_TITLE_LEN} characters"),
    ));
  }
  Ok(())
}

fn validate_non_negative(field: &'static str, value: Option<f64>) -> Result<()> {
  match value {
    Some(v) if !v.is_finite() || v < 0.0 => {
      Err(Error::invalid(field, "must be a non-negative number"))
    }
    _ => Ok(()),
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::RcaStore::create_rca`]. Timestamps and the
/// internal id are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewRca {
  pub code:   String,
  pub fields: RcaFields,
}

impl NewRca {
  pub fn new(code: impl Into<String>, fields: RcaFields) -> Self {
    Self { code: code.into(), fields }
  }

  pub fn validate(&self) -> Result<()> {
    let code = self.code.trim();
    if code.is_empty() {
      return Err(Error::invalid("code", "must not be blank"));
    }
    if code.chars().count() > MAX_CODE_LEN {
      return Err(Error::invalid(
        "code",
        format!("must be at most {MAX_CODE_LEN} characters"),
      ));
    }
    validate_title(&self.fields.title)?;
    validate_non_negative("downtime_hours", self.fields.downtime_hours)?;
    validate_non_negative("estimated_cost", self.fields.estimated_cost)?;
    Ok(())
  }
}

/// A persisted RCA record without its child collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rca {
  pub rca_id:     Uuid,
  pub code:       String,
  pub created_at: DateTime<Utc>,
  /// Refreshed by the store on every successful mutation.
  pub updated_at: DateTime<Utc>,
  #[serde(flatten)]
  pub fields:     RcaFields,
}

/// An RCA record hydrated with the collections it owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcaAggregate {
  #[serde(flatten)]
  pub rca:          Rca,
  /// Ordered by level.
  pub causal_chain: Vec<CausalEntry>,
  pub causes:       Vec<CauseEntry>,
}

// ─── Partial update ──────────────────────────────────────────────────────────

/// A partial update: every updatable field is an optional slot, and only the
/// filled slots are written. `code` is deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RcaPatch {
  pub title:                      Option<String>,
  pub description:                Option<String>,
  pub event_at:                   Option<DateTime<Utc>>,
  pub area:                       Option<String>,
  pub plant:                      Option<String>,
  pub equipment:                  Option<String>,
  pub system:                     Option<String>,
  pub failure_description:        Option<String>,
  pub impact:                     Option<String>,
  pub analysis_method:            Option<String>,
  pub immediate_cause:            Option<String>,
  pub root_cause:                 Option<String>,
  pub contributing_causes:        Option<String>,
  pub corrective_actions:         Option<String>,
  pub preventive_actions:         Option<String>,
  pub responsible:                Option<String>,
  pub responsible_area:           Option<String>,
  pub commitment_date:            Option<NaiveDate>,
  pub closure_date:               Option<NaiveDate>,
  pub status:                     Option<RcaStatus>,
  pub criticality:                Option<Criticality>,
  pub failure_type:               Option<String>,
  pub category:                   Option<String>,
  pub downtime_hours:             Option<f64>,
  pub estimated_cost:             Option<f64>,
  pub effectiveness_verification: Option<String>,
  pub verification_date:          Option<NaiveDate>,
  pub effective:                  Option<bool>,
  pub created_by:                 Option<String>,
  pub modified_by:                Option<String>,
}

macro_rules! copy_slots {
  (
    $patch:ident => $fields:ident;
    required: [$($req:ident),* $(,)?];
    optional: [$($opt:ident),* $(,)?] $(;)?
  ) => {
    $(if let Some(v) = $patch.$req { $fields.$req = v; })*
    $(if let Some(v) = $patch.$opt { $fields.$opt = Some(v); })*
  };
}

impl RcaPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(title) = &self.title {
      validate_title(title)?;
    }
    validate_non_negative("downtime_hours", self.downtime_hours)?;
    validate_non_negative("estimated_cost", self.estimated_cost)?;
    Ok(())
  }

  /// Copy every filled slot onto `fields`; empty slots leave the target
  /// untouched.
  pub fn apply(self, fields: &mut RcaFields) {
    let patch = self;
    copy_slots! {
      patch => fields;
      required: [title, event_at, status, criticality];
      optional: [
        description, area, plant, equipment, system,
        failure_description, impact, analysis_method,
        immediate_cause, root_cause, contributing_causes,
        corrective_actions, preventive_actions, responsible, responsible_area,
        commitment_date, closure_date, failure_type, category,
        downtime_hours, estimated_cost,
        effectiveness_verification, verification_date, effective,
        created_by, modified_by,
      ];
    }
  }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::RcaStore::list_rcas`]. Results come back in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct RcaQuery {
  pub status: Option<RcaStatus>,
  /// `None` means no limit.
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}
