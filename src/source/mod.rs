//! Telemetry and heart-rate sources.
//!
//! The pipeline consumes plain [`futures::Stream`]s, so anything that yields
//! [`RawFrame`](crate::measurement::RawFrame)s can drive it. This module ships the
//! two used by the binary: a seedable simulator and a replay of a recorded raw log.

pub mod replay;
pub mod simulated;

pub use replay::{load_frames, replay_frames};
pub use simulated::{SimulatedHeartRate, SimulatedRower};
