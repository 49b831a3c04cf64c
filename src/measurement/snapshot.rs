//! Per-event derived values published to subscribers.

use serde::{Deserialize, Serialize};

use super::frame::{AutoDragFactor, BleServiceFlag, LogLevel};
use super::heart_rate::HeartRateSample;

/// Fully derived performance values for one input event.
///
/// `distance` and `stroke_count` are relative to the last session reset; everything
/// else is either passed through from the raw frame or derived from the delta to the
/// previous frame. Rates may be non-finite when the device clock did not advance;
/// consumers decide how to display those.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSnapshot {
    /// Bluetooth profile in use.
    pub ble_service_flag: BleServiceFlag,
    /// Firmware log verbosity.
    pub log_level: LogLevel,
    /// Seconds.
    pub drive_duration: f64,
    /// Seconds.
    pub recovery_duration: f64,
    /// Watts.
    pub avg_stroke_power: f64,
    /// Centimetres since the last reset.
    pub distance: f64,
    /// Percent.
    pub battery_level: u8,
    /// Flywheel drag factor.
    pub drag_factor: f64,
    /// Flywheel moment of inertia, kg·m².
    pub flywheel_inertia: f64,
    /// Distance calibration constant.
    pub magic_number: f64,
    /// Whether the drag factor is recalculated automatically.
    pub auto_drag_factor: AutoDragFactor,
    /// Strokes since the last reset.
    pub stroke_count: i64,
    /// Kilocalories, as reported.
    pub total_calories: f64,
    /// Device session time, microseconds.
    pub elapsed_time: u64,
    /// Handle force curve of the last drive.
    pub handle_forces: Vec<f64>,
    /// Largest handle force of the last drive, `0.0` for an empty curve.
    pub peak_force: f64,
    /// Strokes per minute.
    pub stroke_rate: f64,
    /// Metres per second.
    pub speed: f64,
    /// Metres.
    pub dist_per_stroke: f64,
    /// Latest heart-rate reading at the time the frame arrived, contact or not.
    pub heart_rate: Option<HeartRateSample>,
}

impl DerivedSnapshot {
    /// True when all derived rates are finite numbers.
    pub fn has_finite_rates(&self) -> bool {
        self.stroke_rate.is_finite() && self.speed.is_finite() && self.dist_per_stroke.is_finite()
    }

    /// Average pace in seconds per 500 m, if the boat is moving.
    pub fn split_seconds(&self) -> Option<f64> {
        (self.speed.is_finite() && self.speed > 0.0).then(|| 500.0 / self.speed)
    }
}
