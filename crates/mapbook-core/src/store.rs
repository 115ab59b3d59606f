//! The `ReportStore` trait.
//!
//! Implemented by `mapbook-store-sqlite`; `mapbook-api` is generic over it.
//!
//! Ownership is expressed by passing the caller's email as `owner` (for
//! writes, where it filters the affected rows) or `viewer` (for reads, where
//! it only decides [`Report::can_write`]).

use std::future::Future;

use uuid::Uuid;

use crate::report::{Query, QueryEdit, Report, ReportSnapshot, ReportUpdate};

/// Abstraction over a Mapbook report store backend.
///
/// Every multi-row write is atomic: it either commits in full or leaves the
/// store untouched. Writes that return `bool` or `Option` report "no matching
/// row" through that value rather than through `Self::Error`, which is
/// reserved for genuine storage failures.
pub trait ReportStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reports ───────────────────────────────────────────────────────────

  /// Create and persist an empty report owned by `owner`.
  fn create_report<'a>(
    &'a self,
    owner: &'a str,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + 'a;

  /// Retrieve a non-archived report. Returns `None` if absent or archived.
  fn get_report<'a>(
    &'a self,
    id: Uuid,
    viewer: &'a str,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + 'a;

  /// List the non-archived reports owned by `viewer`, most recently updated
  /// first.
  fn list_reports<'a>(
    &'a self,
    viewer: &'a str,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + 'a;

  /// Read a report and all of its queries as one consistent snapshot.
  fn snapshot<'a>(
    &'a self,
    id: Uuid,
    viewer: &'a str,
  ) -> impl Future<Output = Result<Option<ReportSnapshot>, Self::Error>> + Send + 'a;

  /// Overwrite title and map config of a report owned by `owner`, and apply
  /// `edits` to queries of that report, all in one transaction.
  ///
  /// Returns `false` (and changes nothing) if the report is absent, archived,
  /// or not owned by `owner`, or if any edit names a query outside the report.
  fn update_report<'a>(
    &'a self,
    id: Uuid,
    owner: &'a str,
    update: ReportUpdate,
    edits: Vec<QueryEdit>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Set the archived flag of a report owned by `owner`.
  ///
  /// Returns `false` if the report is absent or not owned by `owner`.
  fn set_archived<'a>(
    &'a self,
    id: Uuid,
    owner: &'a str,
    archived: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Copy a readable report and all of its queries into a new report owned
  /// by `owner`. Returns `None` if the source is absent or archived.
  fn fork_report<'a>(
    &'a self,
    source: Uuid,
    owner: &'a str,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + 'a;

  // ── Queries ───────────────────────────────────────────────────────────

  /// List the queries of a report in creation order.
  fn get_queries(
    &self,
    report_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Query>, Self::Error>> + Send + '_;

  /// Attach a new query to a report. Returns `None` if the report is absent
  /// or archived.
  fn create_query(
    &self,
    report_id: Uuid,
    query_text: String,
  ) -> impl Future<Output = Result<Option<Query>, Self::Error>> + Send + '_;

  /// Replace the text of a query and return the id of the report that owns
  /// it. Returns `None` if no such query exists.
  fn update_query(
    &self,
    id: Uuid,
    query_text: String,
  ) -> impl Future<Output = Result<Option<Uuid>, Self::Error>> + Send + '_;
}
