//! Live report streams.
//!
//! A session registers with the hub, sends a snapshot, then re-sends a fresh
//! snapshot every time the report is published. If nothing happens for the
//! idle timeout the session ends cleanly and the client is expected to open a
//! new one; this keeps proxies from silently killing quiet connections.

use std::time::Duration;

use mapbook_core::{
  claims::Claims,
  report::{ReportSnapshot, parse_id},
  store::ReportStore,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::{error::ApiError, hub::Subscription, service::ReportService};

/// How long a stream may sit without a publish before it is recycled.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// One item pushed to the client.
pub type StreamItem = Result<ReportSnapshot, ApiError>;

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
  /// No publish arrived within the idle timeout.
  Idle,
  /// The client went away.
  Cancelled,
  /// A re-read failed; the error was the last item sent.
  Failed,
}

/// One client watching one report.
pub struct ReportSession<S> {
  service:      ReportService<S>,
  claims:       Claims,
  subscription: Subscription,
  idle_timeout: Duration,
}

impl<S> ReportSession<S>
where
  S: ReportStore + 'static,
{
  /// Validate the id, register with the hub and read the first snapshot.
  ///
  /// Registration happens before the read, so a publish racing with the
  /// first snapshot still wakes the session. On error the registration is
  /// released before returning.
  pub async fn open(
    service:      &ReportService<S>,
    claims:       Claims,
    report_id:    &str,
    idle_timeout: Duration,
  ) -> Result<(Self, ReportSnapshot), ApiError> {
    let report_id = parse_id("report id", report_id)?;
    let subscription = service.hub().subscribe(report_id);
    let snapshot = service.snapshot_by_id(&claims, report_id).await?;

    let session = Self {
      service: service.clone(),
      claims,
      subscription,
      idle_timeout,
    };
    Ok((session, snapshot))
  }

  pub fn report_id(&self) -> Uuid { self.subscription.report_id() }

  /// Push snapshots into `tx` until the session ends.
  ///
  /// The idle timer restarts on every iteration. Dropping the receiving end
  /// of `tx` cancels the session.
  pub async fn run(mut self, tx: mpsc::Sender<StreamItem>) -> SessionEnd {
    loop {
      tokio::select! {
        _ = tx.closed() => return SessionEnd::Cancelled,
        _ = tokio::time::sleep(self.idle_timeout) => return SessionEnd::Idle,
        pinged = self.subscription.pinged() => {
          if !pinged {
            return SessionEnd::Cancelled;
          }
          let item = self
            .service
            .snapshot_by_id(&self.claims, self.subscription.report_id())
            .await;
          let failed = item.is_err();
          if tx.send(item).await.is_err() {
            return SessionEnd::Cancelled;
          }
          if failed {
            return SessionEnd::Failed;
          }
        }
      }
    }
  }

  /// Run the session on its own task, yielding `initial` first.
  ///
  /// The task outlives the request that opened it; it stops on idle timeout,
  /// on a failed re-read, or when the returned stream is dropped.
  pub fn spawn(self, initial: ReportSnapshot) -> ReceiverStream<StreamItem> {
    let (tx, rx) = mpsc::channel(1);
    // The channel is fresh, so the first slot is free.
    let _ = tx.try_send(Ok(initial));

    let report_id     = self.report_id();
    let subscriber_id = self.subscription.subscriber_id();
    tokio::spawn(async move {
      let end = self.run(tx).await;
      tracing::debug!(%report_id, %subscriber_id, ?end, "report stream closed");
    });

    ReceiverStream::new(rx)
  }
}
