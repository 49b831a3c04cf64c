//! Single-slot cache for the most recent heart-rate reading.
//!
//! Backed by `tokio::sync::watch`, so writes replace the slot under a short lock and
//! reads never wait for the next sample. The pipeline only ever reads it.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::measurement::HeartRateSample;

/// Latest-value slot shared between the heart-rate forwarder and the pipeline.
#[derive(Clone, Debug)]
pub struct LatestHeartRate {
    sender: Arc<watch::Sender<Option<HeartRateSample>>>,
}

impl Default for LatestHeartRate {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestHeartRate {
    /// Empty slot; [`Self::latest`] returns `None` until the first reading.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replace the cached reading.
    pub fn publish(&self, sample: HeartRateSample) {
        trace!(bpm = sample.bpm, contact = sample.contact_detected, "Heart rate sample");
        self.sender.send_replace(Some(sample));
    }

    /// Most recent reading, if any has ever arrived.
    pub fn latest(&self) -> Option<HeartRateSample> {
        *self.sender.borrow()
    }

    /// Watch the slot for changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<HeartRateSample>> {
        self.sender.subscribe()
    }

    /// Pump `source` into this slot on a background task.
    ///
    /// The task ends with the stream; a source that never yields simply leaves
    /// the slot empty.
    pub fn forward<S>(&self, source: S) -> JoinHandle<()>
    where
        S: Stream<Item = HeartRateSample> + Send + 'static,
    {
        let slot = self.clone();
        tokio::spawn(async move {
            let mut source = Box::pin(source);
            while let Some(sample) = source.next().await {
                slot.publish(sample);
            }
            debug!("Heart rate source ended");
        })
    }
}
