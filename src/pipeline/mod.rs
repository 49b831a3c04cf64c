//! Aggregation pipeline.
//!
//! Turns the raw telemetry stream into published [`DerivedSnapshot`]s:
//!
//! ```text
//! telemetry ──► forwarder ──┐
//!                           ├─► mpsc<PipelineEvent> ──► actor loop ──► recorder
//! reset() ──────────────────┘          ▲                    │
//!                                      │                    └──► SnapshotPublisher ──► subscribers
//! heart rate ──► LatestHeartRate ──────┘ (read when a frame or reset is enqueued)
//! ```
//!
//! A single task owns [`PipelineState`] and consumes one ordered channel, so frames
//! and resets are applied strictly in arrival order. Heart rate is joined by reading
//! the latest cached sample as each event enters the channel, and the reading travels
//! with it; nothing ever waits for a reading.

pub mod derive;
pub mod heart_rate;
pub mod publisher;
pub mod state;

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn, Instrument};

pub use heart_rate::LatestHeartRate;
pub use publisher::{SnapshotPublisher, SnapshotSubscription};
pub use state::{DeviceSettings, PipelineState, SessionBaseline};

use crate::data::SessionRecorder;
use crate::error::{AppResult, RowerError};
use crate::measurement::{
    AutoDragFactor, BleServiceFlag, DerivedSnapshot, HeartRateSample, LogLevel, RawFrame,
};

/// One entry of the pipeline's ordered input.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    /// A frame from the telemetry source, with the heart rate current at its arrival.
    Frame(RawFrame, Option<HeartRateSample>),
    /// Start a new logical session at the current counters.
    Reset(Option<HeartRateSample>),
    /// The telemetry source is exhausted.
    SourceEnded,
}

/// Cloneable access to a running pipeline.
#[derive(Clone, Debug)]
pub struct PipelineHandle {
    events: mpsc::UnboundedSender<PipelineEvent>,
    snapshots: watch::Receiver<Option<Arc<DerivedSnapshot>>>,
    device: watch::Receiver<DeviceSettings>,
    heart_rate: LatestHeartRate,
}

impl PipelineHandle {
    /// Subscribe to derived snapshots; the latest one is delivered first.
    pub fn subscribe(&self) -> SnapshotSubscription {
        SnapshotSubscription::new(self.snapshots.clone())
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Option<Arc<DerivedSnapshot>> {
        self.snapshots.borrow().clone()
    }

    /// Rebase the session on the last observed counters.
    ///
    /// Ignored once the pipeline has stopped.
    pub fn reset(&self) {
        if self.try_reset().is_err() {
            debug!("Reset ignored, pipeline already stopped");
        }
    }

    /// Like [`Self::reset`], but reports a stopped pipeline.
    pub fn try_reset(&self) -> AppResult<()> {
        self.events
            .send(PipelineEvent::Reset(self.heart_rate.latest()))
            .map_err(|_| RowerError::PipelineClosed)
    }

    /// Whether the pipeline task has stopped consuming events.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    /// Heart-rate slot the pipeline joins against.
    pub fn heart_rate(&self) -> &LatestHeartRate {
        &self.heart_rate
    }

    /// All device settings of the last processed frame.
    pub fn device_settings(&self) -> DeviceSettings {
        *self.device.borrow()
    }

    /// Drag factor reported by the last frame.
    pub fn drag_factor(&self) -> f64 {
        self.device.borrow().drag_factor
    }

    /// Flywheel moment of inertia reported by the last frame.
    pub fn flywheel_inertia(&self) -> f64 {
        self.device.borrow().flywheel_inertia
    }

    /// Distance calibration constant reported by the last frame.
    pub fn magic_number(&self) -> f64 {
        self.device.borrow().magic_number
    }

    /// Whether the monitor adjusts the drag factor itself.
    pub fn auto_drag_factor(&self) -> AutoDragFactor {
        self.device.borrow().auto_drag_factor
    }

    /// Monitor log level.
    pub fn log_level(&self) -> LogLevel {
        self.device.borrow().log_level
    }

    /// Bluetooth profile the monitor advertises.
    pub fn ble_service_flag(&self) -> BleServiceFlag {
        self.device.borrow().ble_service_flag
    }
}

/// A running aggregation pipeline.
///
/// Owns the background tasks; use [`AggregationPipeline::handle`] to share access.
#[derive(Debug)]
pub struct AggregationPipeline {
    handle: PipelineHandle,
    task: JoinHandle<()>,
}

impl AggregationPipeline {
    /// Spawn the pipeline on the current tokio runtime.
    ///
    /// `heart_rate` may never yield; frames then carry no heart-rate sample.
    pub fn spawn<T, H, R>(telemetry: T, heart_rate: H, recorder: R) -> Self
    where
        T: Stream<Item = RawFrame> + Send + 'static,
        H: Stream<Item = HeartRateSample> + Send + 'static,
        R: SessionRecorder + 'static,
    {
        let slot = LatestHeartRate::new();
        let forwarder = slot.forward(heart_rate);
        Self::start(telemetry, slot, Some(forwarder), recorder)
    }

    /// Spawn against a heart-rate slot fed by the caller.
    pub fn with_heart_rate<T, R>(telemetry: T, heart_rate: LatestHeartRate, recorder: R) -> Self
    where
        T: Stream<Item = RawFrame> + Send + 'static,
        R: SessionRecorder + 'static,
    {
        Self::start(telemetry, heart_rate, None, recorder)
    }

    fn start<T, R>(
        telemetry: T,
        heart_rate: LatestHeartRate,
        heart_rate_task: Option<JoinHandle<()>>,
        recorder: R,
    ) -> Self
    where
        T: Stream<Item = RawFrame> + Send + 'static,
        R: SessionRecorder + 'static,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let publisher = SnapshotPublisher::new();
        let (device_tx, device_rx) = watch::channel(DeviceSettings::default());

        let handle = PipelineHandle {
            events: events_tx.clone(),
            snapshots: publisher.receiver(),
            device: device_rx,
            heart_rate: heart_rate.clone(),
        };

        let telemetry_task = tokio::spawn(
            forward_telemetry(telemetry, heart_rate, events_tx).in_current_span(),
        );

        let actor = PipelineActor {
            state: PipelineState::new(),
            recorder,
            publisher,
            device: device_tx,
            processed: 0,
        };
        // Both tasks log inside the caller's span.
        let task = tokio::spawn(
            async move {
                actor.run(events_rx).await;
                telemetry_task.abort();
                if let Some(task) = heart_rate_task {
                    task.abort();
                }
            }
            .in_current_span(),
        );

        info!("Aggregation pipeline started");
        Self { handle, task }
    }

    /// Shareable handle for subscribers and the session controller.
    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Subscribe to derived snapshots; the latest one is delivered first.
    pub fn subscribe(&self) -> SnapshotSubscription {
        self.handle.subscribe()
    }

    /// Rebase the session on the last observed counters.
    pub fn reset(&self) {
        self.handle.reset();
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Option<Arc<DerivedSnapshot>> {
        self.handle.latest()
    }

    /// Stop consuming telemetry, let the recorder shut down, and wait for the task.
    ///
    /// Events already queued are still processed.
    pub async fn stop(self) -> AppResult<()> {
        if self.handle.events.send(PipelineEvent::SourceEnded).is_err() {
            debug!("Pipeline already stopped");
        }
        self.join().await
    }

    /// Wait until the telemetry source is exhausted and the pipeline has stopped.
    pub async fn join(self) -> AppResult<()> {
        self.task
            .await
            .map_err(|e| RowerError::TaskFailed(e.to_string()))
    }
}

async fn forward_telemetry<T>(
    telemetry: T,
    heart_rate: LatestHeartRate,
    events: mpsc::UnboundedSender<PipelineEvent>,
) where
    T: Stream<Item = RawFrame> + Send + 'static,
{
    let mut telemetry = Box::pin(telemetry);
    while let Some(frame) = telemetry.next().await {
        // Pair at arrival, not when the actor gets to it.
        let reading = heart_rate.latest();
        if events.send(PipelineEvent::Frame(frame, reading)).is_err() {
            return;
        }
    }
    debug!("Telemetry source ended");
    let _ = events.send(PipelineEvent::SourceEnded);
}

struct PipelineActor<R> {
    state: PipelineState,
    recorder: R,
    publisher: SnapshotPublisher,
    device: watch::Sender<DeviceSettings>,
    processed: u64,
}

impl<R: SessionRecorder> PipelineActor<R> {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<PipelineEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                PipelineEvent::Frame(frame, heart_rate) => self.process(frame, heart_rate).await,
                PipelineEvent::Reset(heart_rate) => self.reset(heart_rate).await,
                PipelineEvent::SourceEnded => break,
            }
        }

        if let Err(e) = self.recorder.shutdown().await {
            warn!(error = %e, "Recorder shutdown failed");
        }
        info!(events = self.processed, "Aggregation pipeline stopped");
    }

    async fn reset(&mut self, heart_rate: Option<HeartRateSample>) {
        let frame = self.state.rebase();
        let baseline = self.state.baseline();
        info!(
            start_distance = baseline.start_distance,
            start_stroke_count = baseline.start_stroke_count,
            "Session reset"
        );
        if let Err(e) = self.recorder.reset().await {
            warn!(error = %e, "Recorder failed to start a new segment");
        }
        self.process(frame, heart_rate).await;
    }

    async fn process(&mut self, frame: RawFrame, heart_rate: Option<HeartRateSample>) {
        let snapshot = Arc::new(self.state.derive(&frame, heart_rate));
        self.processed += 1;

        trace!(
            distance = snapshot.distance,
            stroke_count = snapshot.stroke_count,
            stroke_rate = snapshot.stroke_rate,
            speed = snapshot.speed,
            "Derived snapshot"
        );
        if !snapshot.has_finite_rates() {
            debug!(
                stroke_rate = snapshot.stroke_rate,
                speed = snapshot.speed,
                dist_per_stroke = snapshot.dist_per_stroke,
                "Non-finite rate in snapshot"
            );
        }

        let recorded_heart_rate = heart_rate.and_then(HeartRateSample::with_contact);
        if let Err(e) = self.recorder.add(&snapshot, recorded_heart_rate).await {
            warn!(error = %e, "Recorder rejected derived sample");
        }
        if let Err(e) = self.recorder.add_raw(&frame).await {
            warn!(error = %e, "Recorder rejected raw frame");
        }

        let settings = self.state.device_settings();
        self.device.send_if_modified(|current| {
            if *current == settings {
                false
            } else {
                *current = settings;
                true
            }
        });
        self.publisher.publish(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryRecorder;
    use async_trait::async_trait;
    use tokio_stream::wrappers::UnboundedReceiverStream;
    use tracing_test::traced_test;

    struct FailingRecorder;

    #[async_trait]
    impl SessionRecorder for FailingRecorder {
        async fn add(&mut self, _: &DerivedSnapshot, _: Option<HeartRateSample>) -> AppResult<()> {
            Err(RowerError::Recorder("disk full".into()))
        }

        async fn add_raw(&mut self, _: &RawFrame) -> AppResult<()> {
            Err(RowerError::Recorder("disk full".into()))
        }

        async fn reset(&mut self) -> AppResult<()> {
            Err(RowerError::Recorder("disk full".into()))
        }
    }

    fn frame(distance: f64, stroke_count: u64, time_us: u64) -> RawFrame {
        RawFrame {
            distance,
            stroke_count,
            rev_time: time_us,
            stroke_time: time_us,
            handle_forces: vec![100.0, 250.0],
            drag_factor: 120.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn recorder_failures_are_logged_not_fatal() {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = AggregationPipeline::with_heart_rate(
            UnboundedReceiverStream::new(rx),
            LatestHeartRate::new(),
            FailingRecorder,
        );
        let mut snapshots = pipeline.subscribe();

        tx.send(frame(1000.0, 10, 10_000_000)).unwrap();
        let snapshot = snapshots.next().await.unwrap();
        assert_eq!(snapshot.stroke_count, 10);

        pipeline.reset();
        let reset = snapshots.next().await.unwrap();
        assert_eq!(reset.stroke_count, 0);

        assert!(logs_contain("Recorder rejected derived sample"));
        assert!(logs_contain("Recorder rejected raw frame"));
        assert!(logs_contain("Recorder failed to start a new segment"));
        assert!(logs_contain("disk full"));
    }

    #[tokio::test]
    async fn stop_ends_an_endless_source() {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = MemoryRecorder::new();
        let pipeline = AggregationPipeline::with_heart_rate(
            UnboundedReceiverStream::new(rx),
            LatestHeartRate::new(),
            recorder.clone(),
        );
        let handle = pipeline.handle();
        let mut snapshots = pipeline.subscribe();

        tx.send(frame(500.0, 5, 5_000_000)).unwrap();
        snapshots.next().await.unwrap();

        pipeline.stop().await.unwrap();
        assert!(handle.is_closed());
        assert!(matches!(handle.try_reset(), Err(RowerError::PipelineClosed)));
        assert!(snapshots.next().await.is_none());
        assert_eq!(recorder.current().samples.len(), 1);
    }

    #[tokio::test]
    async fn device_settings_track_frames() {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = AggregationPipeline::with_heart_rate(
            UnboundedReceiverStream::new(rx),
            LatestHeartRate::new(),
            crate::data::NullRecorder,
        );
        let handle = pipeline.handle();
        let mut snapshots = pipeline.subscribe();
        assert_eq!(handle.device_settings(), DeviceSettings::default());

        let mut sample = frame(100.0, 1, 1_000_000);
        sample.flywheel_inertia = 0.073;
        sample.magic_number = 2.8;
        sample.auto_drag_factor = AutoDragFactor::On;
        sample.log_level = LogLevel::Error;
        sample.ble_service_flag = BleServiceFlag::CpsService;
        tx.send(sample).unwrap();
        snapshots.next().await.unwrap();

        assert_eq!(handle.drag_factor(), 120.0);
        assert_eq!(handle.flywheel_inertia(), 0.073);
        assert_eq!(handle.magic_number(), 2.8);
        assert_eq!(handle.auto_drag_factor(), AutoDragFactor::On);
        assert_eq!(handle.log_level(), LogLevel::Error);
        assert_eq!(handle.ble_service_flag(), BleServiceFlag::CpsService);
    }
}
