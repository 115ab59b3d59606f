//! SQL schema for the Mapbook SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Reports are never deleted; `archived` is a soft-delete flag.
CREATE TABLE IF NOT EXISTS reports (
    id            TEXT PRIMARY KEY,
    author_email  TEXT NOT NULL,
    map_config    TEXT,              -- opaque client blob; NULL until saved
    title         TEXT,              -- NULL until saved
    archived      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,     -- ISO 8601 UTC
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS queries (
    id          TEXT PRIMARY KEY,
    report_id   TEXT NOT NULL REFERENCES reports(id),
    query_text  TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS reports_author_idx ON reports(author_email);
CREATE INDEX IF NOT EXISTS queries_report_idx ON queries(report_id);

PRAGMA user_version = 1;
";
