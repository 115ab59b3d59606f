//! Report and query mutations, each followed by a hub publish.
//!
//! Every write commits before its publish, and a write that fails or matches
//! no row publishes nothing. Identifiers arrive as client-supplied strings and
//! are validated here, before storage is touched.

use std::sync::Arc;

use mapbook_core::{
  claims::Claims,
  report::{Query, QueryEdit, Report, ReportSnapshot, ReportUpdate, parse_id},
  store::ReportStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, hub::ReportHub};

/// A query text edit as sent alongside a report save.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryEditRequest {
  pub id:         String,
  #[serde(default)]
  pub query_text: String,
}

/// Storage plus the hub it notifies.
pub struct ReportService<S> {
  store: Arc<S>,
  hub:   Arc<ReportHub>,
}

// Manual impl: only the `Arc`s are cloned, so `S` itself need not be `Clone`.
impl<S> Clone for ReportService<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      hub:   Arc::clone(&self.hub),
    }
  }
}

/// Log a storage failure where it happened and surface it as internal.
fn internal<E>(op: &'static str) -> impl FnOnce(E) -> ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  move |e| {
    tracing::error!(error = %e, op, "storage failure");
    ApiError::Internal(Box::new(e))
  }
}

fn not_found(what: String) -> ApiError {
  tracing::warn!(%what, "not found");
  ApiError::NotFound(what)
}

impl<S: ReportStore> ReportService<S> {
  pub fn new(store: Arc<S>, hub: Arc<ReportHub>) -> Self { Self { store, hub } }

  pub fn hub(&self) -> &Arc<ReportHub> { &self.hub }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// The caller's own active reports.
  pub async fn list_reports(&self, claims: &Claims) -> Result<Vec<Report>, ApiError> {
    self
      .store
      .list_reports(&claims.email)
      .await
      .map_err(internal("list_reports"))
  }

  pub async fn snapshot(&self, claims: &Claims, report_id: &str) -> Result<ReportSnapshot, ApiError> {
    let id = parse_id("report id", report_id)?;
    self.snapshot_by_id(claims, id).await
  }

  /// Read the current snapshot of a report the caller can see.
  pub async fn snapshot_by_id(&self, claims: &Claims, id: Uuid) -> Result<ReportSnapshot, ApiError> {
    self
      .store
      .snapshot(id, &claims.email)
      .await
      .map_err(internal("snapshot"))?
      .ok_or_else(|| not_found(format!("report {id}")))
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  /// Nobody can be watching an id that did not exist, so nothing is published.
  pub async fn create_report(&self, claims: &Claims) -> Result<Report, ApiError> {
    let report = self
      .store
      .create_report(&claims.email)
      .await
      .map_err(internal("create_report"))?;
    tracing::info!(report_id = %report.id, owner = %claims.email, "report created");
    Ok(report)
  }

  /// Save title, map config and any bundled query edits as one transaction.
  pub async fn update_report(
    &self,
    claims:    &Claims,
    report_id: &str,
    update:    ReportUpdate,
    edits:     Vec<QueryEditRequest>,
  ) -> Result<(), ApiError> {
    let id = parse_id("report id", report_id)?;
    let edits = edits
      .into_iter()
      .map(|e| -> Result<QueryEdit, ApiError> {
        Ok(QueryEdit {
          id:         parse_id("query id", &e.id)?,
          query_text: e.query_text,
        })
      })
      .collect::<Result<Vec<_>, _>>()?;

    let applied = self
      .store
      .update_report(id, &claims.email, update, edits)
      .await
      .map_err(internal("update_report"))?;
    if !applied {
      return Err(not_found(format!("report {id}")));
    }

    self.hub.publish(id);
    Ok(())
  }

  /// Archive (`archive = true`) or restore a report owned by the caller.
  pub async fn archive_report(
    &self,
    claims:    &Claims,
    report_id: &str,
    archive:   bool,
  ) -> Result<(), ApiError> {
    let id = parse_id("report id", report_id)?;
    let applied = self
      .store
      .set_archived(id, &claims.email, archive)
      .await
      .map_err(internal("set_archived"))?;
    if !applied {
      return Err(not_found(format!("report {id}")));
    }

    self.hub.publish(id);
    Ok(())
  }

  /// Copy any readable report into a new one owned by the caller.
  pub async fn fork_report(&self, claims: &Claims, report_id: &str) -> Result<Report, ApiError> {
    let source = parse_id("report id", report_id)?;
    let fork = self
      .store
      .fork_report(source, &claims.email)
      .await
      .map_err(internal("fork_report"))?
      .ok_or_else(|| not_found(format!("report {source}")))?;
    tracing::info!(%source, report_id = %fork.id, owner = %claims.email, "report forked");
    Ok(fork)
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  pub async fn create_query(
    &self,
    claims:     &Claims,
    report_id:  &str,
    query_text: String,
  ) -> Result<Query, ApiError> {
    let id = parse_id("report id", report_id)?;
    tracing::debug!(report_id = %id, editor = %claims.email, "creating query");
    let query = self
      .store
      .create_query(id, query_text)
      .await
      .map_err(internal("create_query"))?
      .ok_or_else(|| not_found(format!("report {id}")))?;

    self.hub.publish(id);
    Ok(query)
  }

  /// The request names only the query; the store reports which report owns
  /// it so the right viewers are notified.
  pub async fn update_query(
    &self,
    claims:     &Claims,
    query_id:   &str,
    query_text: String,
  ) -> Result<Query, ApiError> {
    let id = parse_id("query id", query_id)?;
    tracing::debug!(query_id = %id, editor = %claims.email, "updating query");
    let report_id = self
      .store
      .update_query(id, query_text.clone())
      .await
      .map_err(internal("update_query"))?
      .ok_or_else(|| not_found(format!("query {id}")))?;

    self.hub.publish(report_id);
    Ok(Query {
      id,
      report_id,
      query_text,
    })
  }
}
