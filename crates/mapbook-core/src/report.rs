//! Reports, their queries, and the snapshot pushed to live viewers.
//!
//! A report is never physically deleted; archival is a soft-delete flag and
//! archived reports are invisible to every normal read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Title shown for a report that was never given one.
pub const UNTITLED: &str = "Untitled";

/// Prefix applied to the title of a forked report.
pub const FORK_PREFIX: &str = "Fork of ";

/// A report as seen by one particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
  pub id:         Uuid,
  pub title:      String,
  /// Opaque serialised map configuration; empty when never saved.
  pub map_config: String,
  /// `true` iff the viewer owns the report.
  pub can_write:  bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A piece of query text attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
  pub id:         Uuid,
  pub report_id:  Uuid,
  pub query_text: String,
}

/// The full current state of a report plus its queries.
///
/// Every push to a live viewer carries a whole snapshot, never a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSnapshot {
  pub report:  Report,
  pub queries: Vec<Query>,
}

/// New values for the writable fields of a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportUpdate {
  pub title:      String,
  pub map_config: String,
}

/// A query text edit that travels with a report save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEdit {
  pub id:         Uuid,
  pub query_text: String,
}

/// Title given to a fork of a report titled `title`.
pub fn fork_title(title: &str) -> String { format!("{FORK_PREFIX}{title}") }

/// Parse a client-supplied identifier, naming it `what` in errors.
pub fn parse_id(what: &'static str, value: &str) -> Result<Uuid> {
  let value = value.trim();
  if value.is_empty() {
    return Err(Error::MissingIdentifier(what));
  }
  Uuid::parse_str(value).map_err(|source| Error::MalformedIdentifier {
    what,
    value: value.to_owned(),
    source,
  })
}
