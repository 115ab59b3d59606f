//! In-process notification hub: "report X changed".
//!
//! Writers call [`ReportHub::publish`] after a commit without knowing who is
//! listening; each live stream holds a [`Subscription`] whose ping fires when
//! its report changes.
//!
//! Every subscriber has a single-slot mailbox. A publish that finds the slot
//! already full is absorbed, so a burst of publishes costs the subscriber one
//! re-read and never blocks the publisher.

use std::{
  collections::{HashMap, hash_map::Entry},
  sync::Arc,
};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Receiving end of a subscriber's wake-up slot.
pub type Ping = mpsc::Receiver<()>;

/// Registry of live subscribers keyed by report id.
///
/// One instance is built at startup and shared by reference; there is no
/// global.
#[derive(Default)]
pub struct ReportHub {
  streams: Mutex<HashMap<Uuid, HashMap<Uuid, mpsc::Sender<()>>>>,
}

impl ReportHub {
  pub fn new() -> Self { Self::default() }

  /// Register `subscriber_id` for changes to `report_id`.
  ///
  /// The subscriber is visible to [`publish`](Self::publish) as soon as this
  /// returns. Registering the same pair twice replaces the earlier slot.
  pub fn register(&self, report_id: Uuid, subscriber_id: Uuid) -> Ping {
    let (tx, rx) = mpsc::channel(1);
    self
      .streams
      .lock()
      .entry(report_id)
      .or_default()
      .insert(subscriber_id, tx);
    tracing::debug!(%report_id, %subscriber_id, "stream registered");
    rx
  }

  /// Remove one subscriber. Unknown pairs are ignored.
  pub fn deregister(&self, report_id: Uuid, subscriber_id: Uuid) {
    let mut streams = self.streams.lock();
    if let Entry::Occupied(mut entry) = streams.entry(report_id) {
      if entry.get_mut().remove(&subscriber_id).is_some() {
        tracing::debug!(%report_id, %subscriber_id, "stream deregistered");
      }
      if entry.get().is_empty() {
        entry.remove();
      }
    }
  }

  /// Wake every subscriber of `report_id`. Never blocks.
  pub fn publish(&self, report_id: Uuid) {
    // Clone the senders out so the lock is not held while delivering.
    let targets: Vec<(Uuid, mpsc::Sender<()>)> = {
      let streams = self.streams.lock();
      match streams.get(&report_id) {
        Some(subs) => subs.iter().map(|(id, tx)| (*id, tx.clone())).collect(),
        None => Vec::new(),
      }
    };

    if targets.is_empty() {
      tracing::trace!(%report_id, "publish with no subscribers");
      return;
    }

    tracing::debug!(%report_id, subscribers = targets.len(), "publishing");

    for (subscriber_id, tx) in targets {
      match tx.try_send(()) {
        Ok(()) => {}
        // A wake-up is already pending; the pending re-read will see this
        // change too.
        Err(TrySendError::Full(())) => {}
        Err(TrySendError::Closed(())) => {
          tracing::trace!(%report_id, %subscriber_id, "subscriber already gone");
        }
      }
    }
  }

  /// Register under a freshly generated subscriber id and return a guard that
  /// deregisters when dropped.
  pub fn subscribe(self: &Arc<Self>, report_id: Uuid) -> Subscription {
    let subscriber_id = Uuid::new_v4();
    let ping = self.register(report_id, subscriber_id);
    Subscription {
      hub: Arc::clone(self),
      report_id,
      subscriber_id,
      ping,
    }
  }

  #[cfg(test)]
  pub(crate) fn subscriber_count(&self, report_id: Uuid) -> usize {
    self.streams.lock().get(&report_id).map_or(0, HashMap::len)
  }
}

// ─── Subscription guard ──────────────────────────────────────────────────────

/// One stream's registration with the hub.
///
/// Dropping the guard deregisters it, whichever way the owning session ends.
pub struct Subscription {
  hub:           Arc<ReportHub>,
  report_id:     Uuid,
  subscriber_id: Uuid,
  ping:          Ping,
}

impl Subscription {
  pub fn report_id(&self) -> Uuid { self.report_id }

  pub fn subscriber_id(&self) -> Uuid { self.subscriber_id }

  /// Wait for the next publish. Returns `false` if the hub dropped this
  /// subscriber's slot.
  pub async fn pinged(&mut self) -> bool { self.ping.recv().await.is_some() }
}

impl Drop for Subscription {
  fn drop(&mut self) { self.hub.deregister(self.report_id, self.subscriber_id); }
}
