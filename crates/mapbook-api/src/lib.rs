//! Live-update engine and JSON/SSE API for Mapbook.
//!
//! - [`hub`]: the in-process registry that turns "report X changed" into
//!   wake-ups for the streams watching X.
//! - [`service`]: report and query mutations; each commit is followed by a
//!   publish to the affected report.
//! - [`stream`]: the per-client session that pushes a fresh snapshot after
//!   every publish and recycles itself when idle.
//!
//! [`api_router`] exposes all of it as an axum [`Router`]. Authentication and
//! transport concerns are the caller's responsibility: a layer in front of the
//! router must insert [`Claims`](mapbook_core::claims::Claims) into the
//! request extensions.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mapbook_api::api_router(state))
//! ```

pub mod caller;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod service;
pub mod stream;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post, put},
};
use mapbook_core::store::ReportStore;

pub use error::ApiError;
pub use hub::ReportHub;
pub use service::ReportService;

use handlers::{queries, reports, stream as report_stream};

/// Shared state threaded through all API handlers.
#[derive(Clone)]
pub struct ApiState<S> {
  pub service:     ReportService<S>,
  /// Idle timeout after which a live stream is recycled.
  pub stream_idle: Duration,
}

impl<S: ReportStore> ApiState<S> {
  pub fn new(store: Arc<S>, hub: Arc<ReportHub>) -> Self {
    Self {
      service:     ReportService::new(store, hub),
      stream_idle: stream::DEFAULT_IDLE_TIMEOUT,
    }
  }

  pub fn with_stream_idle(mut self, idle: Duration) -> Self {
    self.stream_idle = idle;
    self
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: ReportStore + Clone + 'static,
{
  Router::new()
    // Reports
    .route("/reports", get(reports::list::<S>).post(reports::create::<S>))
    .route("/reports/{id}", get(reports::get_one::<S>).put(reports::update::<S>))
    .route("/reports/{id}/archive", post(reports::archive::<S>))
    .route("/reports/{id}/fork", post(reports::fork::<S>))
    .route("/reports/{id}/stream", get(report_stream::handler::<S>))
    // Queries
    .route("/reports/{id}/queries", post(queries::create::<S>))
    .route("/queries/{id}", put(queries::update::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
