//! Recorders driven by a live pipeline, and replay of what they wrote.

#![cfg(feature = "storage_csv")]

use std::path::{Path, PathBuf};

use futures::{stream, StreamExt};
use rowing_daq::data::CsvRecorder;
use rowing_daq::measurement::{HeartRateSample, RawFrame};
use rowing_daq::pipeline::{AggregationPipeline, LatestHeartRate};
use rowing_daq::source::{replay_frames, SimulatedRower};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.to_string_lossy().ends_with(suffix))
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn csv_recorder_splits_session_on_reset() {
    let dir = TempDir::new().unwrap();
    let recorder = CsvRecorder::new(dir.path()).unwrap();
    let slot = LatestHeartRate::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let pipeline = AggregationPipeline::with_heart_rate(
        UnboundedReceiverStream::new(rx),
        slot.clone(),
        recorder,
    );
    let mut snapshots = pipeline.subscribe();

    let mut rower = SimulatedRower::new(std::time::Duration::from_millis(1), Some(11));
    slot.publish(HeartRateSample::new(132));
    for _ in 0..5 {
        tx.send(rower.next_frame()).unwrap();
        snapshots.next().await.unwrap();
    }
    pipeline.reset();
    snapshots.next().await.unwrap();
    slot.publish(HeartRateSample::without_contact(60));
    for _ in 0..3 {
        tx.send(rower.next_frame()).unwrap();
        snapshots.next().await.unwrap();
    }
    drop(tx);
    pipeline.join().await.unwrap();

    let csv_files = files_with_suffix(dir.path(), ".csv");
    let raw_files = files_with_suffix(dir.path(), ".raw.jsonl");
    assert_eq!(csv_files.len(), 2);
    assert_eq!(raw_files.len(), 2);

    let mut first = csv::Reader::from_path(&csv_files[0]).unwrap();
    let headers = first.headers().unwrap().clone();
    let hr_column = headers.iter().position(|h| h == "heart_rate_bpm").unwrap();
    let rows: Vec<_> = first.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|row| &row[hr_column] == "132"));

    let mut second = csv::Reader::from_path(&csv_files[1]).unwrap();
    let rows: Vec<_> = second.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[0][2], "0"); // stroke_count of the reset sample
    // Reset sample still had contact; the rest lost it.
    assert_eq!(&rows[0][hr_column], "132");
    assert!(rows[1..].iter().all(|row| row[hr_column].is_empty()));
}

#[tokio::test]
async fn raw_log_replays_to_identical_snapshots() {
    let dir = TempDir::new().unwrap();
    let frames: Vec<RawFrame> = {
        let mut rower = SimulatedRower::new(std::time::Duration::from_millis(1), Some(5));
        (0..6).map(|_| rower.next_frame()).collect()
    };

    let live = AggregationPipeline::spawn(
        stream::iter(frames.clone()),
        stream::pending(),
        CsvRecorder::new(dir.path()).unwrap(),
    );
    let live_handle = live.handle();
    live.join().await.unwrap();
    let live_last = live_handle.latest().unwrap();

    let raw = files_with_suffix(dir.path(), ".raw.jsonl");
    assert_eq!(raw.len(), 1);
    let replayed: Vec<_> = replay_frames(&raw[0]).await.unwrap().collect().await;
    assert_eq!(replayed, frames);

    let replay = AggregationPipeline::spawn(
        stream::iter(replayed),
        stream::pending(),
        rowing_daq::data::NullRecorder,
    );
    let replay_handle = replay.handle();
    replay.join().await.unwrap();
    assert_eq!(*replay_handle.latest().unwrap(), *live_last);
}
