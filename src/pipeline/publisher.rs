//! Latest-replay broadcast of derived snapshots.
//!
//! Uses `tokio::sync::watch` for multi-subscriber fan-out:
//!
//! - the snapshot is computed once and shared as an `Arc`, so every subscriber sees
//!   the same instance,
//! - a new subscriber receives the current snapshot immediately, then later ones,
//! - a subscriber that falls behind skips to the newest snapshot instead of
//!   buffering.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut subscription = pipeline.subscribe();
//! while let Some(snapshot) = subscription.next().await {
//!     println!("{:.1} spm", snapshot.stroke_rate);
//! }
//! ```

use std::sync::Arc;

use futures::Stream;
use tokio::sync::watch;

use crate::measurement::DerivedSnapshot;

type Slot = Option<Arc<DerivedSnapshot>>;

/// Write side, owned by the pipeline task. Dropping it ends every subscription.
#[derive(Debug)]
pub struct SnapshotPublisher {
    sender: watch::Sender<Slot>,
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotPublisher {
    /// Publisher with no snapshot yet.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Replace the current snapshot and wake all subscribers.
    pub fn publish(&self, snapshot: Arc<DerivedSnapshot>) {
        self.sender.send_replace(Some(snapshot));
    }

    /// Subscribe with latest-replay semantics.
    pub fn subscribe(&self) -> SnapshotSubscription {
        SnapshotSubscription::new(self.sender.subscribe())
    }

    /// Receiver that can mint subscriptions after this publisher is moved.
    pub(crate) fn receiver(&self) -> watch::Receiver<Slot> {
        self.sender.subscribe()
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Option<Arc<DerivedSnapshot>> {
        self.sender.borrow().clone()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Read side held by one consumer.
#[derive(Debug)]
pub struct SnapshotSubscription {
    receiver: watch::Receiver<Slot>,
}

impl SnapshotSubscription {
    pub(crate) fn new(mut receiver: watch::Receiver<Slot>) -> Self {
        // Treat whatever is current as unseen so it is replayed first.
        if receiver.borrow().is_some() {
            receiver.mark_changed();
        }
        Self { receiver }
    }

    /// Wait for the next snapshot not yet seen by this subscription.
    ///
    /// Returns `None` once the pipeline has stopped and the last snapshot was
    /// delivered.
    pub async fn next(&mut self) -> Option<Arc<DerivedSnapshot>> {
        loop {
            self.receiver.changed().await.ok()?;
            if let Some(snapshot) = self.receiver.borrow_and_update().clone() {
                return Some(snapshot);
            }
        }
    }

    /// Current snapshot without waiting and without marking it seen.
    pub fn latest(&self) -> Option<Arc<DerivedSnapshot>> {
        self.receiver.borrow().clone()
    }

    /// Adapt into a `Stream` of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = Arc<DerivedSnapshot>> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            let snapshot = subscription.next().await?;
            Some((snapshot, subscription))
        })
    }
}

impl Clone for SnapshotSubscription {
    fn clone(&self) -> Self {
        Self::new(self.receiver.clone())
    }
}
