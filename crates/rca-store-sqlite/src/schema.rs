//! SQL schema for the RCA SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Listing order is rowid (insertion) order.
CREATE TABLE IF NOT EXISTS rcas (
    rca_id                     TEXT PRIMARY KEY,
    code                       TEXT NOT NULL UNIQUE,
    created_at                 TEXT NOT NULL,   -- ISO 8601 UTC
    updated_at                 TEXT NOT NULL,   -- refreshed on every write
    title                      TEXT NOT NULL,
    description                TEXT,
    event_at                   TEXT NOT NULL,
    area                       TEXT,
    plant                      TEXT,
    equipment                  TEXT,
    system                     TEXT,
    failure_description        TEXT,
    impact                     TEXT,
    analysis_method            TEXT,
    immediate_cause            TEXT,
    root_cause                 TEXT,
    contributing_causes        TEXT,
    corrective_actions         TEXT,
    preventive_actions         TEXT,
    responsible                TEXT,
    responsible_area           TEXT,
    commitment_date            TEXT,            -- YYYY-MM-DD
    closure_date               TEXT,
    status                     TEXT NOT NULL DEFAULT 'open',
    criticality                TEXT NOT NULL DEFAULT 'medium',
    failure_type               TEXT,
    category                   TEXT,
    downtime_hours             REAL,
    estimated_cost             REAL,
    effectiveness_verification TEXT,
    verification_date          TEXT,
    effective                  INTEGER,         -- 0 | 1 | NULL
    created_by                 TEXT,
    modified_by                TEXT
);

-- Five-whys entries; replaced wholesale when a new chain is submitted.
CREATE TABLE IF NOT EXISTS causal_entries (
    entry_id TEXT PRIMARY KEY,
    rca_id   TEXT NOT NULL REFERENCES rcas(rca_id) ON DELETE CASCADE,
    level    INTEGER NOT NULL CHECK (level BETWEEN 1 AND 5),
    prompt   TEXT NOT NULL,
    answer   TEXT
);

-- Ishikawa entries; same replacement rule as causal_entries.
CREATE TABLE IF NOT EXISTS cause_entries (
    entry_id  TEXT PRIMARY KEY,
    rca_id    TEXT NOT NULL REFERENCES rcas(rca_id) ON DELETE CASCADE,
    category  TEXT NOT NULL,
    cause     TEXT NOT NULL,
    sub_cause TEXT
);

-- Metadata only; the bytes live under the storage root.
CREATE TABLE IF NOT EXISTS attachments (
    attachment_id TEXT PRIMARY KEY,
    rca_id        TEXT NOT NULL REFERENCES rcas(rca_id) ON DELETE CASCADE,
    file_name     TEXT NOT NULL,
    stored_path   TEXT NOT NULL,
    file_type     TEXT NOT NULL,
    content_type  TEXT,
    size_bytes    INTEGER NOT NULL,
    sha256        TEXT NOT NULL,
    uploaded_by   TEXT,
    uploaded_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    full_name     TEXT,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,   -- 'maintainer' | 'supervisor' | 'manager'
    area          TEXT,
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    last_login_at TEXT
);

CREATE INDEX IF NOT EXISTS rcas_status_idx           ON rcas(status);
CREATE INDEX IF NOT EXISTS causal_entries_rca_idx    ON causal_entries(rca_id);
CREATE INDEX IF NOT EXISTS cause_entries_rca_idx     ON cause_entries(rca_id);
CREATE INDEX IF NOT EXISTS attachments_rca_idx       ON attachments(rca_id);

PRAGMA user_version = 1;
";
