//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and UUIDs as hyphenated
//! lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use mapbook_core::report::{Query, Report};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width so that lexical order in SQL matches chronological order.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawReport::from_row`]. `:viewer` must be bound.
pub const REPORT_COLUMNS: &str = "
  id,
  COALESCE(map_config, '')        AS map_config,
  COALESCE(title, 'Untitled')     AS title,
  author_email = :viewer          AS can_write,
  created_at,
  updated_at";

/// Raw values read directly from a `reports` row.
pub struct RawReport {
  pub id:         String,
  pub map_config: String,
  pub title:      String,
  pub can_write:  bool,
  pub created_at: String,
  pub updated_at: String,
}

impl RawReport {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      map_config: row.get(1)?,
      title:      row.get(2)?,
      can_write:  row.get(3)?,
      created_at: row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  pub fn into_report(self) -> Result<Report> {
    Ok(Report {
      id:         decode_uuid(&self.id)?,
      title:      self.title,
      map_config: self.map_config,
      can_write:  self.can_write,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `queries` row.
pub struct RawQuery {
  pub id:         String,
  pub report_id:  String,
  pub query_text: String,
}

impl RawQuery {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      report_id:  row.get(1)?,
      query_text: row.get(2)?,
    })
  }

  pub fn into_query(self) -> Result<Query> {
    Ok(Query {
      id:         decode_uuid(&self.id)?,
      report_id:  decode_uuid(&self.report_id)?,
      query_text: self.query_text,
    })
  }
}
