//! [`SqliteStore`], the SQLite implementation of [`RcaStore`].
//!
//! Every operation that touches more than one row runs inside a single
//! transaction on the connection thread, via the synchronous helpers at the
//! bottom of this file.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use rca_core::{
  analysis::{
    Analysis, CausalEntry, CauseEntry, NewCausalEntry, NewCauseEntry,
    PlannedCausalEntry, plan_causal_chain, plan_causes, prompt_for_level,
  },
  attachment::{Attachment, NewAttachment},
  rca::{Criticality, NewRca, Rca, RcaAggregate, RcaPatch, RcaQuery, RcaStatus},
  stats::{AreaSummary, CriticalityCount, StatusCounts, Summary, UNASSIGNED_AREA},
  store::RcaStore,
  user::{Credential, Enrollment, NewUser, User},
};

use crate::{
  Error, Result,
  encode::{
    FIELD_COLUMNS, RawAttachment, RawCausalEntry, RawCauseEntry, RawRca, RawUser,
    decode_enum, encode_dt, encode_fields, encode_uuid, rca_select_list,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An RCA store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Write a consistent snapshot of the database to `dest`, which must not
  /// exist yet.
  pub async fn backup(&self, dest: impl AsRef<Path>) -> Result<()> {
    let dest = dest.as_ref().to_string_lossy().into_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("VACUUM INTO ?1", params![dest])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Rows in `table` that belong to `rca_id`, read straight from SQL.
  #[cfg(test)]
  pub(crate) async fn count_owned_rows(&self, table: &'static str, rca_id: Uuid) -> Result<u64> {
    let key = encode_uuid(rca_id);
    let n: i64 = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE rca_id = ?1");
        Ok(conn.query_row(&sql, params![key], |r| r.get(0))?)
      })
      .await?;
    Ok(count(n))
  }
}

// ─── RcaStore impl ───────────────────────────────────────────────────────────

impl RcaStore for SqliteStore {
  type Error = Error;

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── RCA aggregate ─────────────────────────────────────────────────────────

  async fn create_rca(&self, input: NewRca, analysis: Analysis) -> Result<RcaAggregate> {
    input.validate()?;
    analysis.validate()?;
    self.conn.call(move |conn| Ok(create_rca(conn, input, analysis))).await?
  }

  async fn get_rca(&self, id: Uuid) -> Result<Option<RcaAggregate>> {
    let key = encode_uuid(id);
    self
      .conn
      .call(move |conn| Ok(load_aggregate(conn, "rca_id", &key)))
      .await?
  }

  async fn get_rca_by_code(&self, code: String) -> Result<Option<RcaAggregate>> {
    self
      .conn
      .call(move |conn| Ok(load_aggregate(conn, "code", code.trim())))
      .await?
  }

  async fn list_rcas(&self, query: RcaQuery) -> Result<Vec<Rca>> {
    let status = query.status.map(|s| s.as_ref().to_owned());
    let limit = query.limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
    let offset = query.offset.map_or(0, |n| i64::try_from(n).unwrap_or(i64::MAX));

    let raws: Vec<RawRca> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM rcas
           WHERE (?1 IS NULL OR status = ?1)
           ORDER BY rowid
           LIMIT ?2 OFFSET ?3",
          rca_select_list()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![status, limit, offset], RawRca::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRca::into_rca).collect()
  }

  async fn update_rca(
    &self,
    id: Uuid,
    patch: RcaPatch,
    analysis: Analysis,
  ) -> Result<RcaAggregate> {
    patch.validate()?;
    analysis.validate()?;
    self
      .conn
      .call(move |conn| Ok(update_rca(conn, id, patch, analysis)))
      .await?
  }

  async fn delete_rca(&self, id: Uuid) -> Result<()> {
    let key = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM rcas WHERE rca_id = ?1", params![key])?))
      .await?;

    if deleted == 0 {
      return Err(rca_core::Error::RcaNotFound(id).into());
    }
    Ok(())
  }

  // ── Child collections ─────────────────────────────────────────────────────

  async fn causal_chain(&self, rca_id: Uuid) -> Result<Vec<CausalEntry>> {
    self
      .conn
      .call(move |conn| {
        Ok(require_rca(conn, rca_id).and_then(|key| load_causal_chain(conn, &key)))
      })
      .await?
  }

  async fn add_causal_entry(
    &self,
    rca_id: Uuid,
    entry: NewCausalEntry,
  ) -> Result<CausalEntry> {
    entry.validate()?;
    self
      .conn
      .call(move |conn| Ok(add_causal_entry(conn, rca_id, entry)))
      .await?
  }

  async fn causes(&self, rca_id: Uuid) -> Result<Vec<CauseEntry>> {
    self
      .conn
      .call(move |conn| {
        Ok(require_rca(conn, rca_id).and_then(|key| load_causes(conn, &key)))
      })
      .await?
  }

  async fn add_cause_entry(&self, rca_id: Uuid, entry: NewCauseEntry) -> Result<CauseEntry> {
    entry.validate()?;
    self
      .conn
      .call(move |conn| Ok(add_cause_entry(conn, rca_id, entry)))
      .await?
  }

  // ── Attachments ───────────────────────────────────────────────────────────

  async fn record_attachment(&self, input: NewAttachment) -> Result<Attachment> {
    let attachment = Attachment {
      attachment_id: Uuid::new_v4(),
      rca_id:        input.rca_id,
      file_name:     input.file_name,
      stored_path:   input.stored_path,
      file_type:     input.file_type,
      content_type:  input.content_type,
      size_bytes:    input.size_bytes,
      sha256:        input.sha256,
      uploaded_by:   input.uploaded_by,
      uploaded_at:   Utc::now(),
    };

    let row = attachment.clone();
    self
      .conn
      .call(move |conn| Ok(insert_attachment(conn, &row)))
      .await??;

    Ok(attachment)
  }

  async fn get_attachment(&self, id: Uuid) -> Result<Option<Attachment>> {
    let key = encode_uuid(id);
    let raw: Option<RawAttachment> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM attachments WHERE attachment_id = ?1",
              RawAttachment::COLUMNS
            ),
            params![key],
            RawAttachment::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAttachment::into_attachment).transpose()
  }

  async fn list_attachments(&self, rca_id: Uuid) -> Result<Vec<Attachment>> {
    let key = encode_uuid(rca_id);
    let raws: Vec<RawAttachment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM attachments WHERE rca_id = ?1 ORDER BY rowid",
          RawAttachment::COLUMNS
        ))?;
        let rows = stmt
          .query_map(params![key], RawAttachment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttachment::into_attachment).collect()
  }

  async fn delete_attachment(&self, id: Uuid) -> Result<()> {
    let key = encode_uuid(id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM attachments WHERE attachment_id = ?1", params![key])?)
      })
      .await?;

    if deleted == 0 {
      return Err(rca_core::Error::AttachmentNotFound(id).into());
    }
    Ok(())
  }

  // ── Statistics ────────────────────────────────────────────────────────────

  async fn summary(&self) -> Result<Summary> {
    let (rows, critical): (Vec<(String, i64)>, i64) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM rcas GROUP BY status")?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let critical = conn.query_row(
          "SELECT COUNT(*) FROM rcas WHERE criticality = ?1",
          params![Criticality::Critical.as_ref()],
          |r| r.get(0),
        )?;
        Ok((rows, critical))
      })
      .await?;

    let mut counts = StatusCounts::default();
    for (status, n) in rows {
      counts.add(decode_enum::<RcaStatus>("status", &status)?, count(n));
    }
    Ok(Summary::new(counts, count(critical)))
  }

  async fn summary_by_area(&self) -> Result<Vec<AreaSummary>> {
    let rows: Vec<(String, i64, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT COALESCE(NULLIF(TRIM(area), ''), ?1) AS area_label,
                  COUNT(*),
                  SUM(CASE WHEN status = ?2 THEN 1 ELSE 0 END)
           FROM rcas
           GROUP BY area_label
           ORDER BY area_label",
        )?;
        let rows = stmt
          .query_map(params![UNASSIGNED_AREA, RcaStatus::Closed.as_ref()], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(area, total, closed)| AreaSummary {
          area,
          total: count(total),
          closed: count(closed),
          open: count(total - closed),
        })
        .collect(),
    )
  }

  async fn summary_by_criticality(&self) -> Result<Vec<CriticalityCount>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT criticality, COUNT(*) FROM rcas GROUP BY criticality")?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut counts = rows
      .into_iter()
      .map(|(criticality, n)| {
        Ok(CriticalityCount {
          criticality: decode_enum("criticality", &criticality)?,
          total:       count(n),
        })
      })
      .collect::<Result<Vec<_>>>()?;
    counts.sort_by_key(|c| c.criticality);
    Ok(counts)
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn count_users(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
      .await?;
    Ok(count(n))
  }

  async fn create_user(&self, input: NewUser, enrollment: Enrollment) -> Result<User> {
    self
      .conn
      .call(move |conn| Ok(create_user(conn, input, enrollment)))
      .await?
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let key = encode_uuid(id);
    self
      .conn
      .call(move |conn| Ok(load_user(conn, "user_id", &key)))
      .await?
      .map(|c| c.map(|c| c.user))
  }

  async fn get_credential(&self, email: String) -> Result<Option<Credential>> {
    self
      .conn
      .call(move |conn| Ok(load_user(conn, "email", email.trim())))
      .await?
  }

  async fn list_users(&self, offset: usize, limit: usize) -> Result<Vec<User>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM users ORDER BY rowid LIMIT ?1 OFFSET ?2",
          RawUser::COLUMNS
        ))?;
        let rows = stmt
          .query_map(params![limit, offset], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let key = encode_uuid(id);
    let at_str = encode_dt(at);
    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET last_login_at = ?2 WHERE user_id = ?1",
          params![key, at_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(rca_core::Error::UserNotFound(id).into());
    }
    Ok(())
  }

  async fn set_user_active(&self, id: Uuid, active: bool) -> Result<User> {
    let key = encode_uuid(id);
    let loaded = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let updated = tx.execute(
          "UPDATE users SET active = ?2 WHERE user_id = ?1",
          params![key, active],
        )?;
        let loaded = if updated == 0 { Ok(None) } else { load_user(&tx, "user_id", &key) };
        tx.commit()?;
        Ok(loaded)
      })
      .await??;

    loaded
      .map(|c| c.user)
      .ok_or_else(|| rca_core::Error::UserNotFound(id).into())
  }
}

// ─── Transactional helpers ───────────────────────────────────────────────────

fn count(n: i64) -> u64 { u64::try_from(n).unwrap_or_default() }

/// Encoded id of an existing RCA, or `RcaNotFound`.
fn require_rca(conn: &Connection, id: Uuid) -> Result<String> {
  let key = encode_uuid(id);
  let exists = conn
    .query_row("SELECT 1 FROM rcas WHERE rca_id = ?1", params![key], |_| Ok(()))
    .optional()?
    .is_some();
  if exists { Ok(key) } else { Err(rca_core::Error::RcaNotFound(id).into()) }
}

fn touch_rca(conn: &Connection, key: &str) -> Result<()> {
  conn.execute(
    "UPDATE rcas SET updated_at = ?2 WHERE rca_id = ?1",
    params![key, encode_dt(Utc::now())],
  )?;
  Ok(())
}

fn load_rca(conn: &Connection, column: &'static str, key: &str) -> Result<Option<Rca>> {
  let sql = format!("SELECT {} FROM rcas WHERE {column} = ?1", rca_select_list());
  let raw = conn.query_row(&sql, params![key], RawRca::from_row).optional()?;
  raw.map(RawRca::into_rca).transpose()
}

fn load_causal_chain(conn: &Connection, rca_key: &str) -> Result<Vec<CausalEntry>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM causal_entries WHERE rca_id = ?1 ORDER BY level, rowid",
    RawCausalEntry::COLUMNS
  ))?;
  let raws = stmt
    .query_map(params![rca_key], RawCausalEntry::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawCausalEntry::into_entry).collect()
}

fn load_causes(conn: &Connection, rca_key: &str) -> Result<Vec<CauseEntry>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM cause_entries WHERE rca_id = ?1 ORDER BY rowid",
    RawCauseEntry::COLUMNS
  ))?;
  let raws = stmt
    .query_map(params![rca_key], RawCauseEntry::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawCauseEntry::into_entry).collect()
}

fn load_aggregate(
  conn: &Connection,
  column: &'static str,
  key: &str,
) -> Result<Option<RcaAggregate>> {
  let Some(rca) = load_rca(conn, column, key)? else {
    return Ok(None);
  };
  let rca_key = encode_uuid(rca.rca_id);
  Ok(Some(RcaAggregate {
    causal_chain: load_causal_chain(conn, &rca_key)?,
    causes: load_causes(conn, &rca_key)?,
    rca,
  }))
}

fn insert_causal_entry(
  conn: &Connection,
  rca_key: &str,
  level: u8,
  prompt: &str,
  answer: Option<&str>,
) -> Result<Uuid> {
  let entry_id = Uuid::new_v4();
  conn.execute(
    "INSERT INTO causal_entries (entry_id, rca_id, level, prompt, answer)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![encode_uuid(entry_id), rca_key, level, prompt, answer],
  )?;
  Ok(entry_id)
}

fn insert_cause_entry(
  conn: &Connection,
  rca_key: &str,
  category: &str,
  cause: &str,
  sub_cause: Option<&str>,
) -> Result<Uuid> {
  let entry_id = Uuid::new_v4();
  conn.execute(
    "INSERT INTO cause_entries (entry_id, rca_id, category, cause, sub_cause)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![encode_uuid(entry_id), rca_key, category, cause, sub_cause],
  )?;
  Ok(entry_id)
}

/// Replace whichever child collections `analysis` supplies.
fn replace_children(conn: &Connection, rca_key: &str, analysis: &Analysis) -> Result<()> {
  if let Some(answers) = &analysis.causal_chain {
    conn.execute("DELETE FROM causal_entries WHERE rca_id = ?1", params![rca_key])?;
    for PlannedCausalEntry { level, prompt, answer } in plan_causal_chain(answers) {
      insert_causal_entry(conn, rca_key, level, &prompt, Some(&answer))?;
    }
  }
  if let Some(map) = &analysis.cause_map {
    conn.execute("DELETE FROM cause_entries WHERE rca_id = ?1", params![rca_key])?;
    for (category, cause) in plan_causes(map) {
      insert_cause_entry(conn, rca_key, category.as_ref(), &cause, None)?;
    }
  }
  Ok(())
}

fn field_assignments() -> String {
  FIELD_COLUMNS
    .iter()
    .enumerate()
    .map(|(i, col)| format!("{col} = ?{}", i + 3))
    .collect::<Vec<_>>()
    .join(", ")
}

fn create_rca(conn: &mut Connection, input: NewRca, analysis: Analysis) -> Result<RcaAggregate> {
  let code = input.code.trim().to_owned();
  let tx = conn.transaction()?;

  let taken = tx
    .query_row("SELECT 1 FROM rcas WHERE code = ?1", params![code], |_| Ok(()))
    .optional()?
    .is_some();
  if taken {
    return Err(rca_core::Error::DuplicateCode(code).into());
  }

  let rca_id = Uuid::new_v4();
  let rca_key = encode_uuid(rca_id);
  let now = encode_dt(Utc::now());

  let placeholders = (1..=FIELD_COLUMNS.len() + 4)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ");
  let sql = format!(
    "INSERT INTO rcas (rca_id, code, created_at, updated_at, {}) VALUES ({placeholders})",
    FIELD_COLUMNS.join(", ")
  );

  let mut values: Vec<rusqlite::types::Value> = vec![
    rca_key.clone().into(),
    code.into(),
    now.clone().into(),
    now.into(),
  ];
  values.extend(encode_fields(&input.fields));
  tx.execute(&sql, rusqlite::params_from_iter(values))?;

  replace_children(&tx, &rca_key, &analysis)?;

  let aggregate = load_aggregate(&tx, "rca_id", &rca_key)?
    .ok_or(rca_core::Error::RcaNotFound(rca_id))?;
  tx.commit()?;
  Ok(aggregate)
}

fn update_rca(
  conn: &mut Connection,
  id: Uuid,
  patch: RcaPatch,
  analysis: Analysis,
) -> Result<RcaAggregate> {
  let rca_key = encode_uuid(id);
  let tx = conn.transaction()?;

  let mut rca = load_rca(&tx, "rca_id", &rca_key)?.ok_or(rca_core::Error::RcaNotFound(id))?;
  patch.apply(&mut rca.fields);

  let sql = format!(
    "UPDATE rcas SET updated_at = ?2, {} WHERE rca_id = ?1",
    field_assignments()
  );
  let mut values: Vec<rusqlite::types::Value> =
    vec![rca_key.clone().into(), encode_dt(Utc::now()).into()];
  values.extend(encode_fields(&rca.fields));
  tx.execute(&sql, rusqlite::params_from_iter(values))?;

  replace_children(&tx, &rca_key, &analysis)?;

  let aggregate =
    load_aggregate(&tx, "rca_id", &rca_key)?.ok_or(rca_core::Error::RcaNotFound(id))?;
  tx.commit()?;
  Ok(aggregate)
}

fn add_causal_entry(
  conn: &mut Connection,
  rca_id: Uuid,
  entry: NewCausalEntry,
) -> Result<CausalEntry> {
  let tx = conn.transaction()?;
  let rca_key = require_rca(&tx, rca_id)?;

  let prompt = prompt_for_level(entry.level);
  let entry_id =
    insert_causal_entry(&tx, &rca_key, entry.level, &prompt, entry.answer.as_deref())?;
  touch_rca(&tx, &rca_key)?;
  tx.commit()?;

  Ok(CausalEntry { entry_id, rca_id, level: entry.level, prompt, answer: entry.answer })
}

fn add_cause_entry(
  conn: &mut Connection,
  rca_id: Uuid,
  entry: NewCauseEntry,
) -> Result<CauseEntry> {
  let tx = conn.transaction()?;
  let rca_key = require_rca(&tx, rca_id)?;

  let entry_id = insert_cause_entry(
    &tx,
    &rca_key,
    entry.category.as_ref(),
    &entry.cause,
    entry.sub_cause.as_deref(),
  )?;
  touch_rca(&tx, &rca_key)?;
  tx.commit()?;

  Ok(CauseEntry {
    entry_id,
    rca_id,
    category: entry.category,
    cause: entry.cause,
    sub_cause: entry.sub_cause,
  })
}

fn insert_attachment(conn: &Connection, a: &Attachment) -> Result<()> {
  require_rca(conn, a.rca_id)?;
  conn.execute(
    &format!(
      "INSERT INTO attachments ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      RawAttachment::COLUMNS
    ),
    params![
      encode_uuid(a.attachment_id),
      encode_uuid(a.rca_id),
      a.file_name,
      a.stored_path,
      a.file_type,
      a.content_type,
      i64::try_from(a.size_bytes).unwrap_or(i64::MAX),
      a.sha256,
      a.uploaded_by,
      encode_dt(a.uploaded_at),
    ],
  )?;
  Ok(())
}

fn load_user(conn: &Connection, column: &'static str, key: &str) -> Result<Option<Credential>> {
  let sql = format!("SELECT {} FROM users WHERE {column} = ?1", RawUser::COLUMNS);
  let raw = conn.query_row(&sql, params![key], RawUser::from_row).optional()?;
  raw.map(RawUser::into_credential).transpose()
}

fn create_user(conn: &mut Connection, input: NewUser, enrollment: Enrollment) -> Result<User> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  if enrollment == Enrollment::Bootstrap {
    let existing: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
    if existing > 0 {
      return Err(rca_core::Error::BootstrapClosed.into());
    }
  }

  let email_taken = tx
    .query_row("SELECT 1 FROM users WHERE email = ?1", params![input.email], |_| Ok(()))
    .optional()?
    .is_some();
  if email_taken {
    return Err(rca_core::Error::DuplicateEmail(input.email).into());
  }

  let username_taken = tx
    .query_row(
      "SELECT 1 FROM users WHERE username = ?1",
      params![input.username],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if username_taken {
    return Err(rca_core::Error::DuplicateUsername(input.username).into());
  }

  let user = User {
    user_id:       Uuid::new_v4(),
    username:      input.username,
    email:         input.email,
    full_name:     input.full_name,
    role:          input.role,
    area:          input.area,
    active:        true,
    created_at:    Utc::now(),
    last_login_at: None,
  };

  tx.execute(
    &format!(
      "INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      RawUser::COLUMNS
    ),
    params![
      encode_uuid(user.user_id),
      user.username,
      user.email,
      user.full_name,
      input.password_hash,
      user.role.as_ref(),
      user.area,
      user.active,
      encode_dt(user.created_at),
      Option::<String>::None,
    ],
  )?;
  tx.commit()?;

  Ok(user)
}
