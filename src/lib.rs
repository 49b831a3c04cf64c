//! # Rowing DAQ Core Library
//!
//! Aggregates the raw telemetry of a rowing ergometer monitor into session-relative
//! snapshots with derived rates, joined with the latest heart-rate reading, and fans
//! them out to any number of subscribers. The binary (`main.rs`) drives it from a
//! simulator or a recorded capture; other frontends only need the library.
//!
//! ## Crate Structure
//!
//! - **`config`**: Figment-based `Settings` loaded from TOML and `ROWING_DAQ_*`
//!   environment variables.
//! - **`data`**: The `SessionRecorder` collaborator boundary and its in-memory, CSV and
//!   null implementations.
//! - **`error`**: The `RowerError` enum and the `AppResult` alias.
//! - **`measurement`**: `RawFrame`, `HeartRateSample` and `DerivedSnapshot`.
//! - **`pipeline`**: The aggregation pipeline: reset-aware baselines, rate derivation,
//!   the heart-rate join and the latest-replay snapshot publisher.
//! - **`session`**: `SessionController`, the single entry point for starting a new
//!   session.
//! - **`source`**: Simulated rower and heart-rate strap, and replay of raw captures.
//! - **`tracing_init`**: Structured logging setup.
//!
//! ## Example
//!
//! ```no_run
//! use futures::stream;
//! use rowing_daq::data::MemoryRecorder;
//! use rowing_daq::pipeline::AggregationPipeline;
//! use rowing_daq::session::SessionController;
//! use rowing_daq::source::SimulatedRower;
//! use std::time::Duration;
//!
//! # async fn demo() -> rowing_daq::error::AppResult<()> {
//! let telemetry = SimulatedRower::new(Duration::from_millis(500), Some(1)).into_stream();
//! let pipeline = AggregationPipeline::spawn(telemetry, stream::pending(), MemoryRecorder::new());
//! let session = SessionController::new(pipeline.handle());
//!
//! let mut snapshots = pipeline.subscribe();
//! while let Some(snapshot) = snapshots.next().await {
//!     println!("{:.0} m at {:.1} spm", snapshot.distance / 100.0, snapshot.stroke_rate);
//!     if snapshot.stroke_count >= 10 {
//!         session.reset();
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod measurement;
pub mod pipeline;
pub mod session;
pub mod source;
pub mod tracing_init;

pub use error::{AppResult, RowerError};
pub use measurement::{DerivedSnapshot, HeartRateSample, RawFrame};
pub use pipeline::{AggregationPipeline, PipelineHandle, SnapshotSubscription};
pub use session::SessionController;
