//! Change notifier: pushes the full snapshot to every live subscriber.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::db::{DbError, ProbeOutcome, ResultStore, Snapshot};

/// Messages buffered per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 16;

/// Records outcomes and fans the resulting snapshot out to subscribers.
#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn ResultStore>,
    tx: broadcast::Sender<Arc<Snapshot>>,
}

impl Notifier {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { store, tx }
    }

    /// Register a new subscriber for `update` pushes.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Current snapshot, served on demand.
    pub fn snapshot(&self) -> Result<Snapshot, DbError> {
        self.store.query_all()
    }

    /// Persist an outcome; on success, broadcast the new snapshot once.
    ///
    /// A failed append is returned to the caller and nothing is broadcast.
    pub fn record(&self, outcome: &ProbeOutcome) -> Result<(), DbError> {
        self.store.append(outcome)?;
        self.publish();
        Ok(())
    }

    /// Broadcast the current snapshot. Returns the number of subscribers
    /// it was queued for.
    pub fn publish(&self) -> usize {
        let snapshot = match self.store.query_all() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Notifier: Failed to build snapshot: {}", e);
                return 0;
            }
        };

        if !snapshot.is_complete() {
            tracing::warn!(
                "Notifier: Broadcasting incomplete snapshot, omitted: {}",
                snapshot.omitted.join(", ")
            );
        }

        // No subscribers is not an error.
        let sent = self.tx.send(Arc::new(snapshot)).unwrap_or(0);
        tracing::debug!("Notifier: Broadcast snapshot to {} subscribers", sent);
        sent
    }
}
