//! End-to-end tests of the aggregation pipeline: derivation, fan-out and shutdown.

use std::sync::Arc;

use futures::{stream, StreamExt};
use rowing_daq::data::MemoryRecorder;
use rowing_daq::measurement::RawFrame;
use rowing_daq::pipeline::{AggregationPipeline, LatestHeartRate, PipelineState};
use rowing_daq::source::SimulatedRower;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Frame with both time counters at `time_us`.
fn frame(distance: f64, stroke_count: u64, time_us: u64) -> RawFrame {
    RawFrame {
        distance,
        stroke_count,
        rev_time: time_us,
        stroke_time: time_us,
        drive_duration: 800_000,
        recovery_duration: 1_700_000,
        avg_stroke_power: 185.0,
        total_calories: 30.0,
        handle_forces: vec![12.0, 288.5, 401.25, 97.0],
        battery_level: 90,
        drag_factor: 112.0,
        ..Default::default()
    }
}

/// Pipeline fed from a channel the test controls; the source never ends on its own.
fn controlled_pipeline() -> (
    mpsc::UnboundedSender<RawFrame>,
    AggregationPipeline,
    MemoryRecorder,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let recorder = MemoryRecorder::new();
    let pipeline = AggregationPipeline::with_heart_rate(
        UnboundedReceiverStream::new(rx),
        LatestHeartRate::new(),
        recorder.clone(),
    );
    (tx, pipeline, recorder)
}

#[tokio::test]
async fn derives_rates_between_consecutive_frames() {
    let (tx, pipeline, _recorder) = controlled_pipeline();
    let mut snapshots = pipeline.subscribe();

    tx.send(frame(1000.0, 10, 10_000_000)).unwrap();
    snapshots.next().await.unwrap();
    tx.send(frame(1010.0, 11, 10_500_000)).unwrap();
    let snapshot = snapshots.next().await.unwrap();

    assert_eq!(snapshot.distance, 1010.0);
    assert_eq!(snapshot.stroke_count, 11);
    assert_eq!(snapshot.stroke_rate, 120.0);
    assert!((snapshot.speed - 0.2).abs() < 1e-12);
    assert!((snapshot.dist_per_stroke - 0.1).abs() < 1e-12);
    assert_eq!(snapshot.peak_force, 401.25);
    assert_eq!(snapshot.drive_duration, 0.8);
    assert_eq!(snapshot.recovery_duration, 1.7);
    assert_eq!(snapshot.avg_stroke_power, 185.0);
    assert_eq!(snapshot.drag_factor, 112.0);
}

#[tokio::test]
async fn no_snapshot_before_first_event() {
    let (_tx, pipeline, _recorder) = controlled_pipeline();
    let mut snapshots = pipeline.subscribe();

    assert!(pipeline.latest().is_none());
    let waited =
        tokio::time::timeout(std::time::Duration::from_millis(50), snapshots.next()).await;
    assert!(waited.is_err(), "no snapshot should exist yet");
}

#[tokio::test]
async fn late_subscriber_receives_latest_first() {
    let (tx, pipeline, _recorder) = controlled_pipeline();
    let mut early = pipeline.subscribe();

    tx.send(frame(100.0, 1, 2_000_000)).unwrap();
    early.next().await.unwrap();
    tx.send(frame(200.0, 2, 4_000_000)).unwrap();
    let second = early.next().await.unwrap();

    let mut late = pipeline.subscribe();
    let replayed = late.next().await.unwrap();
    assert!(Arc::ptr_eq(&second, &replayed));
    assert_eq!(replayed.stroke_count, 2);
}

#[tokio::test]
async fn every_subscriber_sees_the_same_instance() {
    let (tx, pipeline, _recorder) = controlled_pipeline();
    let mut a = pipeline.subscribe();
    let mut b = pipeline.handle().subscribe();

    tx.send(frame(300.0, 3, 6_000_000)).unwrap();
    let from_a = a.next().await.unwrap();
    let from_b = b.next().await.unwrap();

    assert!(Arc::ptr_eq(&from_a, &from_b));
    assert!(Arc::ptr_eq(&from_a, &pipeline.latest().unwrap()));
}

#[tokio::test]
async fn finite_source_runs_to_completion() {
    let frames = vec![
        frame(100.0, 1, 2_000_000),
        frame(200.0, 2, 4_000_000),
        frame(300.0, 3, 6_000_000),
    ];
    let recorder = MemoryRecorder::new();
    let pipeline =
        AggregationPipeline::spawn(stream::iter(frames), stream::pending(), recorder.clone());
    let handle = pipeline.handle();

    pipeline.join().await.unwrap();

    let latest = handle.latest().unwrap();
    assert_eq!(latest.stroke_count, 3);
    assert_eq!(latest.stroke_rate, 30.0);

    let segment = recorder.current();
    assert_eq!(segment.samples.len(), 3);
    assert_eq!(segment.raw.len(), 3);
    assert_eq!(segment.raw[2].distance, 300.0);
    assert!(handle.is_closed());
}

#[tokio::test]
async fn subscription_stream_ends_with_pipeline() {
    let frames = (1..=4).map(|i| frame(100.0 * i as f64, i, i * 2_000_000));
    let pipeline = AggregationPipeline::spawn(
        stream::iter(frames.collect::<Vec<_>>()),
        stream::pending(),
        MemoryRecorder::new(),
    );
    let collected: Vec<_> = pipeline.subscribe().into_stream().collect().await;

    // Slow consumers may skip intermediate snapshots, never the last one.
    assert!(!collected.is_empty());
    assert_eq!(collected.last().unwrap().stroke_count, 4);
    pipeline.join().await.unwrap();
}

#[tokio::test]
async fn empty_force_curve_reports_zero_peak() {
    let (tx, pipeline, _recorder) = controlled_pipeline();
    let mut snapshots = pipeline.subscribe();

    let mut sample = frame(100.0, 1, 2_000_000);
    sample.handle_forces.clear();
    tx.send(sample).unwrap();

    let snapshot = snapshots.next().await.unwrap();
    assert_eq!(snapshot.peak_force, 0.0);
    assert!(snapshot.handle_forces.is_empty());
}

#[tokio::test]
async fn repeated_frame_yields_non_finite_rates() {
    let (tx, pipeline, _recorder) = controlled_pipeline();
    let mut snapshots = pipeline.subscribe();

    tx.send(frame(1000.0, 10, 10_000_000)).unwrap();
    snapshots.next().await.unwrap();
    tx.send(frame(1000.0, 10, 10_000_000)).unwrap();
    let snapshot = snapshots.next().await.unwrap();

    assert!(snapshot.stroke_rate.is_nan());
    assert!(snapshot.speed.is_nan());
    assert_eq!(snapshot.dist_per_stroke, 0.0);
    assert!(!snapshot.has_finite_rates());
}

#[test]
fn advancing_stroke_time_keeps_stroke_rate_finite() {
    let mut rower = SimulatedRower::new(std::time::Duration::from_millis(1), Some(1234));
    let mut state = PipelineState::new();
    let mut previous_stroke_time = 0;

    for _ in 0..1000 {
        let frame = rower.next_frame();
        assert!(frame.stroke_time > previous_stroke_time);
        previous_stroke_time = frame.stroke_time;

        let snapshot = state.derive(&frame, None);
        assert!(
            snapshot.stroke_rate.is_finite() && snapshot.stroke_rate >= 0.0,
            "stroke {} gave rate {}",
            frame.stroke_count,
            snapshot.stroke_rate
        );
        assert!(snapshot.has_finite_rates());
    }
}
