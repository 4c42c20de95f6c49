//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and calendar dates as
//! `YYYY-MM-DD`. Enumerations are stored in their snake_case wire form.
//! UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rca_core::{
  analysis::{CausalEntry, CauseCategory, CauseEntry},
  attachment::Attachment,
  rca::{Rca, RcaFields},
  user::{Credential, User},
};
use rusqlite::{Row, types::Value};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

/// Parse a snake_case enumeration column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

fn text(s: &str) -> Value { Value::Text(s.to_owned()) }

fn opt_text(s: &Option<String>) -> Value {
  s.as_ref().map_or(Value::Null, |s| Value::Text(s.clone()))
}

fn opt_date(d: Option<NaiveDate>) -> Value {
  d.map_or(Value::Null, |d| Value::Text(encode_date(d)))
}

fn opt_real(x: Option<f64>) -> Value { x.map_or(Value::Null, Value::Real) }

fn opt_bool(b: Option<bool>) -> Value {
  b.map_or(Value::Null, |b| Value::Integer(i64::from(b)))
}

// ─── RCA columns ─────────────────────────────────────────────────────────────

/// The mutable columns of `rcas`, in the order produced by
/// [`encode_fields`] and consumed by [`RawRca::from_row`].
pub const FIELD_COLUMNS: [&str; 30] = [
  "title",
  "description",
  "event_at",
  "area",
  "plant",
  "equipment",
  "system",
  "failure_description",
  "impact",
  "analysis_method",
  "immediate_cause",
  "root_cause",
  "contributing_causes",
  "corrective_actions",
  "preventive_actions",
  "responsible",
  "responsible_area",
  "commitment_date",
  "closure_date",
  "status",
  "criticality",
  "failure_type",
  "category",
  "downtime_hours",
  "estimated_cost",
  "effectiveness_verification",
  "verification_date",
  "effective",
  "created_by",
  "modified_by",
];

/// Column values for [`FIELD_COLUMNS`].
pub fn encode_fields(f: &RcaFields) -> Vec<Value> {
  vec![
    text(&f.title),
    opt_text(&f.description),
    Value::Text(encode_dt(f.event_at)),
    opt_text(&f.area),
    opt_text(&f.plant),
    opt_text(&f.equipment),
    opt_text(&f.system),
    opt_text(&f.failure_description),
    opt_text(&f.impact),
    opt_text(&f.analysis_method),
    opt_text(&f.immediate_cause),
    opt_text(&f.root_cause),
    opt_text(&f.contributing_causes),
    opt_text(&f.corrective_actions),
    opt_text(&f.preventive_actions),
    opt_text(&f.responsible),
    opt_text(&f.responsible_area),
    opt_date(f.commitment_date),
    opt_date(f.closure_date),
    text(f.status.as_ref()),
    text(f.criticality.as_ref()),
    opt_text(&f.failure_type),
    opt_text(&f.category),
    opt_real(f.downtime_hours),
    opt_real(f.estimated_cost),
    opt_text(&f.effectiveness_verification),
    opt_date(f.verification_date),
    opt_bool(f.effective),
    opt_text(&f.created_by),
    opt_text(&f.modified_by),
  ]
}

/// `SELECT` list for a full `rcas` row.
pub fn rca_select_list() -> String {
  format!("rca_id, code, created_at, updated_at, {}", FIELD_COLUMNS.join(", "))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `rcas` row with only the columns that need parsing kept as raw strings.
pub struct RawRca {
  pub rca_id:                     String,
  pub code:                       String,
  pub created_at:                 String,
  pub updated_at:                 String,
  pub title:                      String,
  pub description:                Option<String>,
  pub event_at:                   String,
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
  pub commitment_date:            Option<String>,
  pub closure_date:               Option<String>,
  pub status:                     String,
  pub criticality:                String,
  pub failure_type:               Option<String>,
  pub category:                   Option<String>,
  pub downtime_hours:             Option<f64>,
  pub estimated_cost:             Option<f64>,
  pub effectiveness_verification: Option<String>,
  pub verification_date:          Option<String>,
  pub effective:                  Option<bool>,
  pub created_by:                 Option<String>,
  pub modified_by:                Option<String>,
}

impl RawRca {
  /// Read a row selected with [`rca_select_list`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rca_id:                     row.get(0)?,
      code:                       row.get(1)?,
      created_at:                 row.get(2)?,
      updated_at:                 row.get(3)?,
      title:                      row.get(4)?,
      description:                row.get(5)?,
      event_at:                   row.get(6)?,
      area:                       row.get(7)?,
      plant:                      row.get(8)?,
      equipment:                  row.get(9)?,
      system:                     row.get(10)?,
      failure_description:        row.get(11)?,
      impact:                     row.get(12)?,
      analysis_method:            row.get(13)?,
      immediate_cause:            row.get(14)?,
      root_cause:                 row.get(15)?,
      contributing_causes:        row.get(16)?,
      corrective_actions:         row.get(17)?,
      preventive_actions:         row.get(18)?,
      responsible:                row.get(19)?,
      responsible_area:           row.get(20)?,
      commitment_date:            row.get(21)?,
      closure_date:               row.get(22)?,
      status:                     row.get(23)?,
      criticality:                row.get(24)?,
      failure_type:               row.get(25)?,
      category:                   row.get(26)?,
      downtime_hours:             row.get(27)?,
      estimated_cost:             row.get(28)?,
      effectiveness_verification: row.get(29)?,
      verification_date:          row.get(30)?,
      effective:                  row.get(31)?,
      created_by:                 row.get(32)?,
      modified_by:                row.get(33)?,
    })
  }

  pub fn into_rca(self) -> Result<Rca> {
    let fields = RcaFields {
      title:                      self.title,
      description:                self.description,
      event_at:                   decode_dt(&self.event_at)?,
      area:                       self.area,
      plant:                      self.plant,
      equipment:                  self.equipment,
      system:                     self.system,
      failure_description:        self.failure_description,
      impact:                     self.impact,
      analysis_method:            self.analysis_method,
      immediate_cause:            self.immediate_cause,
      root_cause:                 self.root_cause,
      contributing_causes:        self.contributing_causes,
      corrective_actions:         self.corrective_actions,
      preventive_actions:         self.preventive_actions,
      responsible:                self.responsible,
      responsible_area:           self.responsible_area,
      commitment_date:            decode_opt_date(self.commitment_date)?,
      closure_date:               decode_opt_date(self.closure_date)?,
      status:                     decode_enum("status", &self.status)?,
      criticality:                decode_enum("criticality", &self.criticality)?,
      failure_type:               self.failure_type,
      category:                   self.category,
      downtime_hours:             self.downtime_hours,
      estimated_cost:             self.estimated_cost,
      effectiveness_verification: self.effectiveness_verification,
      verification_date:          decode_opt_date(self.verification_date)?,
      effective:                  self.effective,
      created_by:                 self.created_by,
      modified_by:                self.modified_by,
    };

    Ok(Rca {
      rca_id: decode_uuid(&self.rca_id)?,
      code: self.code,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      fields,
    })
  }
}

/// Raw strings read from a `causal_entries` row.
pub struct RawCausalEntry {
  pub entry_id: String,
  pub rca_id:   String,
  pub level:    u8,
  pub prompt:   String,
  pub answer:   Option<String>,
}

impl RawCausalEntry {
  pub const COLUMNS: &'static str = "entry_id, rca_id, level, prompt, answer";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id: row.get(0)?,
      rca_id:   row.get(1)?,
      level:    row.get(2)?,
      prompt:   row.get(3)?,
      answer:   row.get(4)?,
    })
  }

  pub fn into_entry(self) -> Result<CausalEntry> {
    Ok(CausalEntry {
      entry_id: decode_uuid(&self.entry_id)?,
      rca_id:   decode_uuid(&self.rca_id)?,
      level:    self.level,
      prompt:   self.prompt,
      answer:   self.answer,
    })
  }
}

/// Raw strings read from a `cause_entries` row.
pub struct RawCauseEntry {
  pub entry_id:  String,
  pub rca_id:    String,
  pub category:  String,
  pub cause:     String,
  pub sub_cause: Option<String>,
}

impl RawCauseEntry {
  pub const COLUMNS: &'static str = "entry_id, rca_id, category, cause, sub_cause";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:  row.get(0)?,
      rca_id:    row.get(1)?,
      category:  row.get(2)?,
      cause:     row.get(3)?,
      sub_cause: row.get(4)?,
    })
  }

  pub fn into_entry(self) -> Result<CauseEntry> {
    Ok(CauseEntry {
      entry_id:  decode_uuid(&self.entry_id)?,
      rca_id:    decode_uuid(&self.rca_id)?,
      category:  decode_enum::<CauseCategory>("category", &self.category)?,
      cause:     self.cause,
      sub_cause: self.sub_cause,
    })
  }
}

/// Raw strings read from an `attachments` row.
pub struct RawAttachment {
  pub attachment_id: String,
  pub rca_id:        String,
  pub file_name:     String,
  pub stored_path:   String,
  pub file_type:     String,
  pub content_type:  Option<String>,
  pub size_bytes:    i64,
  pub sha256:        String,
  pub uploaded_by:   Option<String>,
  pub uploaded_at:   String,
}

impl RawAttachment {
  pub const COLUMNS: &'static str = "attachment_id, rca_id, file_name, stored_path, \
     file_type, content_type, size_bytes, sha256, uploaded_by, uploaded_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      attachment_id: row.get(0)?,
      rca_id:        row.get(1)?,
      file_name:     row.get(2)?,
      stored_path:   row.get(3)?,
      file_type:     row.get(4)?,
      content_type:  row.get(5)?,
      size_bytes:    row.get(6)?,
      sha256:        row.get(7)?,
      uploaded_by:   row.get(8)?,
      uploaded_at:   row.get(9)?,
    })
  }

  pub fn into_attachment(self) -> Result<Attachment> {
    Ok(Attachment {
      attachment_id: decode_uuid(&self.attachment_id)?,
      rca_id:        decode_uuid(&self.rca_id)?,
      file_name:     self.file_name,
      stored_path:   self.stored_path,
      file_type:     self.file_type,
      content_type:  self.content_type,
      size_bytes:    u64::try_from(self.size_bytes).unwrap_or_default(),
      sha256:        self.sha256,
      uploaded_by:   self.uploaded_by,
      uploaded_at:   decode_dt(&self.uploaded_at)?,
    })
  }
}

/// Raw strings read from a `users` row, password hash included.
pub struct RawUser {
  pub user_id:       String,
  pub username:      String,
  pub email:         String,
  pub full_name:     Option<String>,
  pub password_hash: String,
  pub role:          String,
  pub area:          Option<String>,
  pub active:        bool,
  pub created_at:    String,
  pub last_login_at: Option<String>,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, username, email, full_name, \
     password_hash, role, area, active, created_at, last_login_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      email:         row.get(2)?,
      full_name:     row.get(3)?,
      password_hash: row.get(4)?,
      role:          row.get(5)?,
      area:          row.get(6)?,
      active:        row.get(7)?,
      created_at:    row.get(8)?,
      last_login_at: row.get(9)?,
    })
  }

  pub fn into_credential(self) -> Result<Credential> {
    let user = User {
      user_id:       decode_uuid(&self.user_id)?,
      username:      self.username,
      email:         self.email,
      full_name:     self.full_name,
      role:          decode_enum("role", &self.role)?,
      area:          self.area,
      active:        self.active,
      created_at:    decode_dt(&self.created_at)?,
      last_login_at: self.last_login_at.as_deref().map(decode_dt).transpose()?,
    };
    Ok(Credential { user, password_hash: self.password_hash })
  }

  pub fn into_user(self) -> Result<User> { Ok(self.into_credential()?.user) }
}
