//! CLI entry point for rowing-daq
//!
//! Runs the aggregation pipeline against a simulated rowing monitor or a recorded
//! capture and logs every derived snapshot.
//!
//! # Usage
//!
//! Row a simulated piece of 40 strokes, starting a new session after 10:
//! ```bash
//! rowing-daq simulate --frames 40 --reset-after 10
//! ```
//!
//! Replay a raw log written by the CSV recorder:
//! ```bash
//! rowing-daq replay data/session_20240501_181500_000.raw.jsonl
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use tracing::{info, warn};

use rowing_daq::config::{RecorderFormat, Settings};
use rowing_daq::data::{MemoryRecorder, NullRecorder, SessionRecorder};
use rowing_daq::measurement::{HeartRateSample, RawFrame};
use rowing_daq::pipeline::AggregationPipeline;
use rowing_daq::session::SessionController;
use rowing_daq::source::{replay_frames, SimulatedHeartRate, SimulatedRower};
use rowing_daq::tracing_init::{self, OutputFormat, TracingConfig};

// Use mimalloc for allocation-heavy snapshot fan-out
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "rowing-daq")]
#[command(about = "Rowing ergometer telemetry aggregation", long_about = None)]
struct Cli {
    /// Configuration file (defaults to config/rowing_daq.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format: pretty, compact or json
    #[arg(long, global = true, default_value = "pretty")]
    log_format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Row against the built-in simulator
    Simulate {
        /// Stop after this many frames (runs until Ctrl-C otherwise)
        #[arg(long)]
        frames: Option<usize>,

        /// Start a new session after this many snapshots
        #[arg(long)]
        reset_after: Option<usize>,
    },

    /// Replay a recorded raw frame log
    Replay {
        /// Path to a `.raw.jsonl` capture
        file: PathBuf,

        /// Start a new session after this many snapshots
        #[arg(long)]
        reset_after: Option<usize>,
    },

    /// Print the effective configuration and exit
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("loading configuration")?;
    settings.validate()?;

    let tracing_config = TracingConfig::from_settings(&settings)?.with_format(cli.log_format);
    tracing_init::init(tracing_config)?;

    match cli.command {
        Commands::Simulate {
            frames,
            reset_after,
        } => {
            let rower = SimulatedRower::from_config(&settings.simulation).into_stream();
            let telemetry: BoxStream<'static, RawFrame> = match frames {
                Some(n) => rower.take(n).boxed(),
                None => rower.boxed(),
            };
            run(&settings, telemetry, heart_rate_source(&settings), reset_after).await
        }
        Commands::Replay { file, reset_after } => {
            let telemetry = replay_frames(&file)
                .await
                .with_context(|| format!("reading capture {}", file.display()))?;
            run(&settings, telemetry, stream::pending(), reset_after).await
        }
        Commands::ShowConfig => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
    }
}

fn heart_rate_source(settings: &Settings) -> BoxStream<'static, HeartRateSample> {
    if settings.simulation.heart_rate {
        SimulatedHeartRate::from_config(&settings.simulation)
            .into_stream()
            .boxed()
    } else {
        stream::pending().boxed()
    }
}

fn build_recorder(settings: &Settings) -> Result<Box<dyn SessionRecorder>> {
    if !settings.recorder.enabled {
        return Ok(Box::new(NullRecorder));
    }
    match settings.recorder.format {
        RecorderFormat::Memory => Ok(Box::new(MemoryRecorder::new())),
        #[cfg(feature = "storage_csv")]
        RecorderFormat::Csv => {
            let recorder = rowing_daq::data::CsvRecorder::new(&settings.recorder.output_dir)?;
            info!(dir = %recorder.output_dir().display(), "Recording to CSV");
            Ok(Box::new(recorder))
        }
        #[cfg(not(feature = "storage_csv"))]
        RecorderFormat::Csv => {
            Err(rowing_daq::error::RowerError::FeatureNotEnabled("storage_csv".into()).into())
        }
    }
}

async fn run<T, H>(
    settings: &Settings,
    telemetry: T,
    heart_rate: H,
    reset_after: Option<usize>,
) -> Result<()>
where
    T: Stream<Item = RawFrame> + Send + 'static,
    H: Stream<Item = HeartRateSample> + Send + 'static,
{
    let recorder = build_recorder(settings)?;
    let pipeline = AggregationPipeline::spawn(telemetry, heart_rate, recorder);
    let controller = SessionController::new(pipeline.handle());
    let mut snapshots = pipeline.subscribe();

    info!(app = %settings.application.name, "Rowing session started");

    let mut seen = 0usize;
    let mut interrupted = false;
    loop {
        tokio::select! {
            next = snapshots.next() => {
                let Some(snapshot) = next else { break };
                seen += 1;
                info!(
                    distance_m = snapshot.distance / 100.0,
                    strokes = snapshot.stroke_count,
                    stroke_rate = %format_args!("{:.1}", snapshot.stroke_rate),
                    speed = %format_args!("{:.2}", snapshot.speed),
                    split_s = snapshot.split_seconds().map(|s| (s * 10.0).round() / 10.0),
                    peak_force = %format_args!("{:.0}", snapshot.peak_force),
                    heart_rate = snapshot.heart_rate.map(|hr| hr.bpm),
                    "Snapshot"
                );
                if reset_after == Some(seen) {
                    controller.reset();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping");
                interrupted = true;
                break;
            }
        }
    }

    let latest = pipeline.latest();
    if interrupted {
        pipeline.stop().await?;
    } else {
        pipeline.join().await?;
    }
    if let Some(last) = latest {
        info!(
            distance_m = last.distance / 100.0,
            strokes = last.stroke_count,
            snapshots = seen,
            "Session finished"
        );
    }
    Ok(())
}
