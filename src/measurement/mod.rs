//! Measurement types flowing through the pipeline.
//!
//! - [`RawFrame`]: one sample from the rowing monitor, counters cumulative since power-on.
//! - [`HeartRateSample`]: one reading from the heart-rate strap.
//! - [`DerivedSnapshot`]: the published, session-relative result of one input event.

pub mod frame;
pub mod heart_rate;
pub mod snapshot;

pub use frame::{AutoDragFactor, BleServiceFlag, LogLevel, RawFrame};
pub use heart_rate::HeartRateSample;
pub use snapshot::DerivedSnapshot;
