//! CSV recorder: one derived-sample CSV and one raw JSON-lines log per segment.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::recorder::SessionRecorder;
use crate::error::{AppResult, RowerError};
use crate::measurement::{DerivedSnapshot, HeartRateSample, RawFrame};

const HEADER: [&str; 16] = [
    "timestamp",
    "distance_cm",
    "stroke_count",
    "stroke_rate_spm",
    "speed_mps",
    "dist_per_stroke_m",
    "peak_force",
    "avg_stroke_power_w",
    "drive_duration_s",
    "recovery_duration_s",
    "total_calories",
    "battery_level",
    "drag_factor",
    "elapsed_time",
    "heart_rate_bpm",
    "handle_forces",
];

struct SegmentFiles {
    derived: csv::Writer<File>,
    raw: BufWriter<File>,
    derived_path: PathBuf,
}

/// A recorder writing CSV files into a directory.
pub struct CsvRecorder {
    output_dir: PathBuf,
    session_started: DateTime<Utc>,
    segment_index: usize,
    files: Option<SegmentFiles>,
}

impl CsvRecorder {
    /// Create the output directory if needed. Files are opened lazily on first write.
    pub fn new(output_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let output_dir = output_dir.into();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
        }
        tracing::info!(dir = %output_dir.display(), "CSV recorder ready");
        Ok(Self {
            output_dir,
            session_started: Utc::now(),
            segment_index: 0,
            files: None,
        })
    }

    /// Directory the segment files are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn stem(&self) -> String {
        format!(
            "session_{}_{:03}",
            self.session_started.format("%Y%m%d_%H%M%S"),
            self.segment_index
        )
    }

    fn open(&mut self) -> AppResult<&mut SegmentFiles> {
        if self.files.is_none() {
            let stem = self.stem();
            let derived_path = self.output_dir.join(format!("{stem}.csv"));
            let raw_path = self.output_dir.join(format!("{stem}.raw.jsonl"));

            let mut derived = csv::Writer::from_path(&derived_path)?;
            derived.write_record(HEADER)?;
            let raw = BufWriter::new(File::create(&raw_path)?);

            tracing::debug!(path = %derived_path.display(), "Opened recording segment");
            self.files = Some(SegmentFiles {
                derived,
                raw,
                derived_path,
            });
        }
        self.files
            .as_mut()
            .ok_or_else(|| RowerError::Recorder("segment files unavailable".into()))
    }

    fn close(&mut self) -> AppResult<()> {
        if let Some(mut files) = self.files.take() {
            files.derived.flush()?;
            files.raw.flush()?;
            tracing::debug!(path = %files.derived_path.display(), "Closed recording segment");
        }
        Ok(())
    }
}

fn row(snapshot: &DerivedSnapshot, heart_rate: Option<HeartRateSample>) -> Vec<String> {
    let forces = snapshot
        .handle_forces
        .iter()
        .map(|force| force.to_string())
        .collect::<Vec<_>>()
        .join(";");
    vec![
        Utc::now().to_rfc3339(),
        snapshot.distance.to_string(),
        snapshot.stroke_count.to_string(),
        snapshot.stroke_rate.to_string(),
        snapshot.speed.to_string(),
        snapshot.dist_per_stroke.to_string(),
        snapshot.peak_force.to_string(),
        snapshot.avg_stroke_power.to_string(),
        snapshot.drive_duration.to_string(),
        snapshot.recovery_duration.to_string(),
        snapshot.total_calories.to_string(),
        snapshot.battery_level.to_string(),
        snapshot.drag_factor.to_string(),
        snapshot.elapsed_time.to_string(),
        heart_rate.map_or(String::new(), |hr| hr.bpm.to_string()),
        forces,
    ]
}

#[async_trait]
impl SessionRecorder for CsvRecorder {
    async fn add(
        &mut self,
        snapshot: &DerivedSnapshot,
        heart_rate: Option<HeartRateSample>,
    ) -> AppResult<()> {
        let files = self.open()?;
        files.derived.write_record(row(snapshot, heart_rate))?;
        Ok(())
    }

    async fn add_raw(&mut self, frame: &RawFrame) -> AppResult<()> {
        let files = self.open()?;
        serde_json::to_writer(&mut files.raw, frame)?;
        files.raw.write_all(b"\n")?;
        Ok(())
    }

    async fn reset(&mut self) -> AppResult<()> {
        self.close()?;
        self.segment_index += 1;
        Ok(())
    }

    async fn shutdown(&mut self) -> AppResult<()> {
        self.close()?;
        tracing::info!("CSV recorder shut down.");
        Ok(())
    }
}
