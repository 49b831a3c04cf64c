//! Recorder boundary and the in-memory recorder.
//!
//! The pipeline hands every derived snapshot and its raw frame to a
//! [`SessionRecorder`], and asks it to open a new segment on reset. What a recorder
//! does with them (keep in memory, write to disk, export) is its own business.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::measurement::{DerivedSnapshot, HeartRateSample, RawFrame};

/// Trait for a session recorder.
#[async_trait]
pub trait SessionRecorder: Send {
    /// Append one derived sample. `heart_rate` is only present when the strap had contact.
    async fn add(
        &mut self,
        snapshot: &DerivedSnapshot,
        heart_rate: Option<HeartRateSample>,
    ) -> AppResult<()>;

    /// Append the raw frame the sample was derived from.
    async fn add_raw(&mut self, frame: &RawFrame) -> AppResult<()>;

    /// Close the current segment and start a new one.
    async fn reset(&mut self) -> AppResult<()>;

    /// Flush buffered data when the pipeline stops.
    async fn shutdown(&mut self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<R: SessionRecorder + ?Sized> SessionRecorder for Box<R> {
    async fn add(
        &mut self,
        snapshot: &DerivedSnapshot,
        heart_rate: Option<HeartRateSample>,
    ) -> AppResult<()> {
        (**self).add(snapshot, heart_rate).await
    }

    async fn add_raw(&mut self, frame: &RawFrame) -> AppResult<()> {
        (**self).add_raw(frame).await
    }

    async fn reset(&mut self) -> AppResult<()> {
        (**self).reset().await
    }

    async fn shutdown(&mut self) -> AppResult<()> {
        (**self).shutdown().await
    }
}

/// Recorder that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

#[async_trait]
impl SessionRecorder for NullRecorder {
    async fn add(&mut self, _: &DerivedSnapshot, _: Option<HeartRateSample>) -> AppResult<()> {
        Ok(())
    }

    async fn add_raw(&mut self, _: &RawFrame) -> AppResult<()> {
        Ok(())
    }

    async fn reset(&mut self) -> AppResult<()> {
        Ok(())
    }
}

/// A derived sample as stored by a recorder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedSample {
    /// Wall-clock time the sample was stored.
    pub recorded_at: DateTime<Utc>,
    /// The derived values.
    pub snapshot: DerivedSnapshot,
    /// Paired reading, present only with skin contact.
    pub heart_rate: Option<HeartRateSample>,
}

/// Everything recorded between two resets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedSegment {
    /// Unique segment id.
    pub id: Uuid,
    /// When the segment was opened.
    pub started_at: DateTime<Utc>,
    /// Derived samples in arrival order.
    pub samples: Vec<RecordedSample>,
    /// Raw frames in arrival order.
    pub raw: Vec<RawFrame>,
}

impl RecordedSegment {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            samples: Vec::new(),
            raw: Vec::new(),
        }
    }
}

/// Keeps all segments in memory. Clones share the same storage.
#[derive(Clone, Debug)]
pub struct MemoryRecorder {
    segments: Arc<Mutex<Vec<RecordedSegment>>>,
}

impl Default for MemoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecorder {
    /// Recorder with one empty segment open.
    pub fn new() -> Self {
        Self {
            segments: Arc::new(Mutex::new(vec![RecordedSegment::new()])),
        }
    }

    /// Copy of every segment, oldest first.
    pub fn segments(&self) -> Vec<RecordedSegment> {
        self.segments.lock().clone()
    }

    /// Copy of the segment currently being written.
    pub fn current(&self) -> RecordedSegment {
        self.segments
            .lock()
            .last()
            .cloned()
            .unwrap_or_else(RecordedSegment::new)
    }

    fn with_current<T>(&self, f: impl FnOnce(&mut RecordedSegment) -> T) -> T {
        let mut segments = self.segments.lock();
        if segments.is_empty() {
            segments.push(RecordedSegment::new());
        }
        let last = segments.len() - 1;
        f(&mut segments[last])
    }
}

#[async_trait]
impl SessionRecorder for MemoryRecorder {
    async fn add(
        &mut self,
        snapshot: &DerivedSnapshot,
        heart_rate: Option<HeartRateSample>,
    ) -> AppResult<()> {
        let sample = RecordedSample {
            recorded_at: Utc::now(),
            snapshot: snapshot.clone(),
            heart_rate,
        };
        self.with_current(|segment| segment.samples.push(sample));
        Ok(())
    }

    async fn add_raw(&mut self, frame: &RawFrame) -> AppResult<()> {
        self.with_current(|segment| segment.raw.push(frame.clone()));
        Ok(())
    }

    async fn reset(&mut self) -> AppResult<()> {
        self.segments.lock().push(RecordedSegment::new());
        Ok(())
    }
}
