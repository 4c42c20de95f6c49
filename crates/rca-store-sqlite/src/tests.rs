//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{NaiveDate, TimeZone, Utc};
use rca_core::{
  Classify, ErrorKind,
  analysis::{Analysis, CauseCategory, CauseMap, NewCausalEntry, NewCauseEntry},
  attachment::NewAttachment,
  rca::{Criticality, NewRca, RcaFields, RcaPatch, RcaQuery, RcaStatus},
  stats::UNASSIGNED_AREA,
  store::RcaStore,
  user::{Enrollment, NewUser, Role},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn strings(xs: &[&str]) -> Vec<String> { xs.iter().map(|s| s.to_string()).collect() }

fn new_rca(code: &str) -> NewRca {
  let mut fields =
    RcaFields::new("Conveyor stop", Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
  fields.area = Some("Packaging".into());
  fields.equipment = Some("Conveyor C-12".into());
  fields.root_cause = Some("Worn bearing".into());
  NewRca::new(code, fields)
}

fn new_user(username: &str, email: &str, role: Role) -> NewUser {
  NewUser {
    username:      username.into(),
    email:         email.into(),
    full_name:     Some("Test User".into()),
    password_hash: "$argon2id$v=19$placeholder".into(),
    role,
    area:          None,
  }
}

fn attachment(rca_id: Uuid, name: &str) -> NewAttachment {
  NewAttachment {
    rca_id,
    file_name: name.into(),
    stored_path: format!("photos/{name}"),
    file_type: "jpg".into(),
    content_type: Some("image/jpeg".into()),
    size_bytes: 4,
    sha256: "00".repeat(32),
    uploaded_by: Some("tech1".into()),
  }
}

// ─── RCA aggregate ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_by_id_and_code() {
  let s = store().await;

  let created = s.create_rca(new_rca("RCA-001"), Analysis::default()).await.unwrap();
  assert_eq!(created.rca.code, "RCA-001");
  assert_eq!(created.rca.fields.status, RcaStatus::Open);
  assert_eq!(created.rca.fields.criticality, Criticality::Medium);
  assert!(created.causal_chain.is_empty());

  let by_id = s.get_rca(created.rca.rca_id).await.unwrap().unwrap();
  assert_eq!(by_id.rca, created.rca);

  let by_code = s.get_rca_by_code("RCA-001".into()).await.unwrap().unwrap();
  assert_eq!(by_code.rca.rca_id, created.rca.rca_id);

  assert!(s.get_rca(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.get_rca_by_code("RCA-404".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn create_with_analysis_persists_children() {
  let s = store().await;

  let mut map = CauseMap::new();
  map.insert(CauseCategory::Machine, strings(&["Worn bearing"]));
  map.insert(CauseCategory::Method, strings(&["No lubrication schedule", ""]));
  let analysis = Analysis {
    causal_chain: Some(strings(&["Motor tripped", "Overload", "Bearing seized"])),
    cause_map:    Some(map),
  };

  let created = s.create_rca(new_rca("RCA-002"), analysis).await.unwrap();
  assert_eq!(created.causal_chain.len(), 3);
  assert_eq!(created.causal_chain[0].level, 1);
  assert_eq!(created.causal_chain[0].prompt, "Why 1?");
  assert_eq!(created.causal_chain[2].answer.as_deref(), Some("Bearing seized"));
  assert_eq!(created.causes.len(), 2);

  let fetched = s.get_rca(created.rca.rca_id).await.unwrap().unwrap();
  assert_eq!(fetched.causal_chain, created.causal_chain);
  assert_eq!(fetched.causes, created.causes);
}

#[tokio::test]
async fn duplicate_code_is_rejected_without_side_effects() {
  let s = store().await;
  s.create_rca(new_rca("RCA-001"), Analysis::default()).await.unwrap();

  let analysis = Analysis {
    causal_chain: Some(strings(&["should not be stored"])),
    cause_map:    None,
  };
  let err = s.create_rca(new_rca("RCA-001"), analysis).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::DuplicateKey);

  let all = s.list_rcas(RcaQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
  let only = s.get_rca(all[0].rca_id).await.unwrap().unwrap();
  assert!(only.causal_chain.is_empty());
}

#[tokio::test]
async fn invalid_input_is_a_validation_failure() {
  let s = store().await;
  let mut input = new_rca("RCA-001");
  input.fields.title = "   ".into();
  let err = s.create_rca(input, Analysis::default()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ValidationFailure);

  let too_long = Analysis {
    causal_chain: Some(strings(&["1", "2", "3", "4", "5", "6"])),
    cause_map:    None,
  };
  let err = s.create_rca(new_rca("RCA-002"), too_long).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ValidationFailure);
  assert!(s.list_rcas(RcaQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_chain_answers_keep_their_level() {
  let s = store().await;
  let analysis = Analysis {
    causal_chain: Some(strings(&["", "  ", "valid answer"])),
    cause_map:    None,
  };
  let created = s.create_rca(new_rca("RCA-001"), analysis).await.unwrap();

  assert_eq!(created.causal_chain.len(), 1);
  assert_eq!(created.causal_chain[0].level, 3);
  assert_eq!(created.causal_chain[0].prompt, "Why 3?");
}

#[tokio::test]
async fn partial_update_keeps_omitted_fields() {
  let s = store().await;
  let created = s.create_rca(new_rca("RCA-001"), Analysis::default()).await.unwrap();

  let patch = RcaPatch {
    status: Some(RcaStatus::Closed),
    closure_date: Some(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()),
    modified_by: Some("supervisor1".into()),
    ..RcaPatch::default()
  };
  let updated = s
    .update_rca(created.rca.rca_id, patch, Analysis::default())
    .await
    .unwrap();

  let f = &updated.rca.fields;
  assert_eq!(f.status, RcaStatus::Closed);
  assert_eq!(f.closure_date, NaiveDate::from_ymd_opt(2024, 4, 2));
  assert_eq!(f.modified_by.as_deref(), Some("supervisor1"));
  assert_eq!(f.title, "Conveyor stop");
  assert_eq!(f.area.as_deref(), Some("Packaging"));
  assert_eq!(f.root_cause.as_deref(), Some("Worn bearing"));
  assert_eq!(updated.rca.code, "RCA-001");
  assert_eq!(updated.rca.created_at, created.rca.created_at);
  assert!(updated.rca.updated_at >= created.rca.updated_at);
}

#[tokio::test]
async fn update_replaces_supplied_collections_only() {
  let s = store().await;
  let mut map = CauseMap::new();
  map.insert(CauseCategory::Machine, strings(&["Worn bearing"]));
  let created = s
    .create_rca(new_rca("RCA-001"), Analysis {
      causal_chain: Some(strings(&["a", "b"])),
      cause_map:    Some(map),
    })
    .await
    .unwrap();
  let id = created.rca.rca_id;

  // Empty chain clears it; omitted cause map is left alone.
  let updated = s
    .update_rca(id, RcaPatch::default(), Analysis {
      causal_chain: Some(vec![]),
      cause_map:    None,
    })
    .await
    .unwrap();
  assert!(updated.causal_chain.is_empty());
  assert_eq!(updated.causes.len(), 1);

  let mut replacement = CauseMap::new();
  replacement.insert(CauseCategory::Environment, strings(&["Dust", "Heat"]));
  let updated = s
    .update_rca(id, RcaPatch::default(), Analysis {
      causal_chain: None,
      cause_map:    Some(replacement),
    })
    .await
    .unwrap();
  assert_eq!(updated.causes.len(), 2);
  assert!(updated.causes.iter().all(|c| c.category == CauseCategory::Environment));
}

#[tokio::test]
async fn update_missing_rca_is_not_found() {
  let s = store().await;
  let err = s
    .update_rca(Uuid::new_v4(), RcaPatch::default(), Analysis::default())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn delete_cascades_to_children_and_attachments() {
  let s = store().await;
  let mut map = CauseMap::new();
  map.insert(CauseCategory::Machine, strings(&["Worn impeller"]));
  map.insert(CauseCategory::Method, strings(&["No inspection round"]));
  let created = s
    .create_rca(new_rca("RCA-001"), Analysis {
      causal_chain: Some(strings(&["a", "b"])),
      cause_map:    Some(map),
    })
    .await
    .unwrap();
  let id = created.rca.rca_id;
  let file = s.record_attachment(attachment(id, "pump.jpg")).await.unwrap();
  assert_eq!(s.count_owned_rows("causal_entries", id).await.unwrap(), 2);
  assert_eq!(s.count_owned_rows("cause_entries", id).await.unwrap(), 2);

  s.delete_rca(id).await.unwrap();

  assert!(s.get_rca(id).await.unwrap().is_none());
  assert!(s.get_attachment(file.attachment_id).await.unwrap().is_none());
  for table in ["causal_entries", "cause_entries", "attachments"] {
    assert_eq!(s.count_owned_rows(table, id).await.unwrap(), 0, "{table}");
  }

  let err = s.delete_rca(id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn list_pages_in_insertion_order_and_filters_status() {
  let s = store().await;
  for i in 1..=5 {
    let mut input = new_rca(&format!("RCA-{i:03}"));
    if i % 2 == 0 {
      input.fields.status = RcaStatus::Closed;
    }
    s.create_rca(input, Analysis::default()).await.unwrap();
  }

  let page = s
    .list_rcas(RcaQuery { limit: Some(2), offset: Some(1), ..RcaQuery::default() })
    .await
    .unwrap();
  let codes: Vec<_> = page.iter().map(|r| r.code.as_str()).collect();
  assert_eq!(codes, ["RCA-002", "RCA-003"]);

  let closed = s
    .list_rcas(RcaQuery { status: Some(RcaStatus::Closed), ..RcaQuery::default() })
    .await
    .unwrap();
  assert_eq!(closed.len(), 2);
  assert!(closed.iter().all(|r| r.fields.status == RcaStatus::Closed));
}

// ─── Child collections ───────────────────────────────────────────────────────

#[tokio::test]
async fn single_entries_can_be_appended() {
  let s = store().await;
  let id = s
    .create_rca(new_rca("RCA-001"), Analysis::default())
    .await
    .unwrap()
    .rca
    .rca_id;

  let entry = s
    .add_causal_entry(id, NewCausalEntry { level: 2, answer: Some("Overload".into()) })
    .await
    .unwrap();
  assert_eq!(entry.prompt, "Why 2?");

  let cause = s
    .add_cause_entry(id, NewCauseEntry {
      category:  CauseCategory::Material,
      cause:     "Wrong grease".into(),
      sub_cause: Some("Supplier change".into()),
    })
    .await
    .unwrap();
  assert_eq!(cause.sub_cause.as_deref(), Some("Supplier change"));

  assert_eq!(s.causal_chain(id).await.unwrap(), vec![entry]);
  assert_eq!(s.causes(id).await.unwrap(), vec![cause]);
}

#[tokio::test]
async fn single_entry_validation_and_missing_parent() {
  let s = store().await;
  let id = s
    .create_rca(new_rca("RCA-001"), Analysis::default())
    .await
    .unwrap()
    .rca
    .rca_id;

  let err = s
    .add_causal_entry(id, NewCausalEntry { level: 6, answer: None })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ValidationFailure);

  let err = s
    .add_cause_entry(Uuid::new_v4(), NewCauseEntry {
      category:  CauseCategory::Man,
      cause:     "Untrained operator".into(),
      sub_cause: None,
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn attachment_metadata_roundtrip() {
  let s = store().await;
  let id = s
    .create_rca(new_rca("RCA-001"), Analysis::default())
    .await
    .unwrap()
    .rca
    .rca_id;

  let a = s.record_attachment(attachment(id, "pump.jpg")).await.unwrap();
  let b = s.record_attachment(attachment(id, "valve.jpg")).await.unwrap();

  assert_eq!(s.get_attachment(a.attachment_id).await.unwrap(), Some(a.clone()));
  assert_eq!(s.list_attachments(id).await.unwrap(), vec![a.clone(), b]);

  s.delete_attachment(a.attachment_id).await.unwrap();
  assert_eq!(s.list_attachments(id).await.unwrap().len(), 1);
  let err = s.delete_attachment(a.attachment_id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn attachment_for_missing_rca_is_not_found() {
  let s = store().await;
  let err = s
    .record_attachment(attachment(Uuid::new_v4(), "pump.jpg"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn summary_of_empty_store_is_zero() {
  let s = store().await;
  let summary = s.summary().await.unwrap();
  assert_eq!(summary.total, 0);
  assert_eq!(summary.closure_rate, 0.0);
  assert!(s.summary_by_area().await.unwrap().is_empty());
  assert!(s.summary_by_criticality().await.unwrap().is_empty());
}

#[tokio::test]
async fn summary_counts_statuses_and_critical() {
  let s = store().await;
  for i in 0..10 {
    let mut input = new_rca(&format!("RCA-{i:03}"));
    input.fields.status = match i {
      0..=2 => RcaStatus::Closed,
      3 => RcaStatus::InAnalysis,
      4 => RcaStatus::Cancelled,
      _ => RcaStatus::Open,
    };
    if i < 2 {
      input.fields.criticality = Criticality::Critical;
    }
    s.create_rca(input, Analysis::default()).await.unwrap();
  }

  let summary = s.summary().await.unwrap();
  assert_eq!(summary.total, 10);
  assert_eq!(summary.by_status.closed, 3);
  assert_eq!(summary.by_status.in_analysis, 1);
  assert_eq!(summary.by_status.cancelled, 1);
  assert_eq!(summary.by_status.open, 5);
  assert_eq!(summary.critical, 2);
  assert_eq!(summary.closure_rate, 30.0);
}

#[tokio::test]
async fn summaries_by_area_and_criticality() {
  let s = store().await;

  let mut a = new_rca("RCA-001");
  a.fields.status = RcaStatus::Closed;
  a.fields.criticality = Criticality::Low;
  let mut b = new_rca("RCA-002");
  b.fields.criticality = Criticality::Critical;
  let mut c = new_rca("RCA-003");
  c.fields.area = None;
  let mut d = new_rca("RCA-004");
  d.fields.area = Some("  ".into());
  for input in [a, b, c, d] {
    s.create_rca(input, Analysis::default()).await.unwrap();
  }

  let by_area = s.summary_by_area().await.unwrap();
  assert_eq!(by_area.len(), 2);
  let packaging = by_area.iter().find(|r| r.area == "Packaging").unwrap();
  assert_eq!((packaging.total, packaging.closed, packaging.open), (2, 1, 1));
  let unassigned = by_area.iter().find(|r| r.area == UNASSIGNED_AREA).unwrap();
  assert_eq!((unassigned.total, unassigned.closed, unassigned.open), (2, 0, 2));

  let by_crit = s.summary_by_criticality().await.unwrap();
  let pairs: Vec<_> = by_crit.iter().map(|c| (c.criticality, c.total)).collect();
  assert_eq!(pairs, [
    (Criticality::Critical, 1),
    (Criticality::Medium, 2),
    (Criticality::Low, 1),
  ]);
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bootstrap_only_succeeds_on_empty_table() {
  let s = store().await;
  assert_eq!(s.count_users().await.unwrap(), 0);

  let first = s
    .create_user(new_user("admin", "admin@plant.example", Role::Manager), Enrollment::Bootstrap)
    .await
    .unwrap();
  assert!(first.active);
  assert_eq!(s.count_users().await.unwrap(), 1);

  let err = s
    .create_user(new_user("intruder", "x@plant.example", Role::Manager), Enrollment::Bootstrap)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Unauthenticated);

  s.create_user(new_user("tech1", "tech1@plant.example", Role::Maintainer), Enrollment::Authorized)
    .await
    .unwrap();
  assert_eq!(s.count_users().await.unwrap(), 2);
}

#[tokio::test]
async fn email_and_username_are_unique() {
  let s = store().await;
  s.create_user(new_user("tech1", "tech1@plant.example", Role::Maintainer), Enrollment::Authorized)
    .await
    .unwrap();

  let err = s
    .create_user(new_user("tech2", "TECH1@plant.example", Role::Maintainer), Enrollment::Authorized)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(rca_core::Error::DuplicateEmail(_))
  ));

  let err = s
    .create_user(new_user("tech1", "other@plant.example", Role::Maintainer), Enrollment::Authorized)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::DuplicateKey);
  assert_eq!(s.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn credentials_login_and_activation() {
  let s = store().await;
  let user = s
    .create_user(new_user("tech1", "tech1@plant.example", Role::Maintainer), Enrollment::Authorized)
    .await
    .unwrap();

  let cred = s.get_credential("tech1@plant.example".into()).await.unwrap().unwrap();
  assert_eq!(cred.user, user);
  assert_eq!(cred.password_hash, "$argon2id$v=19$placeholder");
  assert!(s.get_credential("nobody@plant.example".into()).await.unwrap().is_none());

  let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
  s.record_login(user.user_id, at).await.unwrap();
  let fetched = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.last_login_at, Some(at));

  let inactive = s.set_user_active(user.user_id, false).await.unwrap();
  assert!(!inactive.active);
  assert!(!s.get_user(user.user_id).await.unwrap().unwrap().active);

  let err = s.set_user_active(Uuid::new_v4(), true).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn list_users_pages() {
  let s = store().await;
  for i in 0..3 {
    s.create_user(
      new_user(&format!("user{i}"), &format!("user{i}@plant.example"), Role::Maintainer),
      Enrollment::Authorized,
    )
    .await
    .unwrap();
  }

  let page = s.list_users(1, 5).await.unwrap();
  let names: Vec<_> = page.iter().map(|u| u.username.as_str()).collect();
  assert_eq!(names, ["user1", "user2"]);
}

// ─── Maintenance ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn ping_and_backup() {
  let dir = tempfile::tempdir().unwrap();
  let s = SqliteStore::open(dir.path().join("rca.sqlite3")).await.unwrap();
  s.ping().await.unwrap();
  s.create_rca(new_rca("RCA-001"), Analysis::default()).await.unwrap();

  let dest = dir.path().join("snapshot.sqlite3");
  s.backup(&dest).await.unwrap();

  let restored = SqliteStore::open(&dest).await.unwrap();
  let rows = restored.list_rcas(RcaQuery::default()).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].code, "RCA-001");
}
