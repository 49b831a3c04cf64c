//! Baseline and "last observed" state owned by the pipeline task.
//!
//! [`PipelineState`] is a plain struct with no interior mutability; exclusive
//! access through `&mut self` is the single-writer discipline. The actor loop in
//! [`super::AggregationPipeline`] is the only owner.

use serde::{Deserialize, Serialize};

use super::derive;
use crate::measurement::{
    AutoDragFactor, BleServiceFlag, DerivedSnapshot, HeartRateSample, LogLevel, RawFrame,
};

/// Offsets captured at the most recent reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionBaseline {
    /// Raw distance counter (cm) at the last reset.
    pub start_distance: f64,
    /// Raw stroke counter at the last reset.
    pub start_stroke_count: u64,
}

/// Device configuration values last reported by the monitor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Flywheel drag factor.
    pub drag_factor: f64,
    /// Flywheel moment of inertia.
    pub flywheel_inertia: f64,
    /// Distance calibration constant.
    pub magic_number: f64,
    /// Whether the monitor adjusts the drag factor itself.
    pub auto_drag_factor: AutoDragFactor,
    /// Firmware log verbosity.
    pub log_level: LogLevel,
    /// Bluetooth profile in use.
    pub ble_service_flag: BleServiceFlag,
}

/// Raw values of the previous input event.
///
/// Needed for deltas, and to synthesize a reset frame when no real frame is at hand.
#[derive(Clone, Debug, Default, PartialEq)]
struct LastObserved {
    rev_time: u64,
    /// Rounded distance (cm) of the previous frame.
    rev_count: f64,
    stroke_time: u64,
    stroke_count: u64,
    distance: f64,
    elapsed_time: u64,
    total_calories: f64,
    battery_level: u8,
    device: DeviceSettings,
}

impl LastObserved {
    fn observe(&mut self, frame: &RawFrame, rev_count: f64) {
        self.rev_time = frame.rev_time;
        self.rev_count = rev_count;
        self.stroke_time = frame.stroke_time;
        self.stroke_count = frame.stroke_count;
        self.distance = frame.distance;
        self.elapsed_time = frame.elapsed_time;
        self.total_calories = frame.total_calories;
        self.battery_level = frame.battery_level;
        self.device = DeviceSettings {
            drag_factor: frame.drag_factor,
            flywheel_inertia: frame.flywheel_inertia,
            magic_number: frame.magic_number,
            auto_drag_factor: frame.auto_drag_factor,
            log_level: frame.log_level,
            ble_service_flag: frame.ble_service_flag,
        };
    }

    /// Frame that continues the device counters with no stroke activity.
    fn reset_frame(&self) -> RawFrame {
        RawFrame {
            distance: self.distance,
            stroke_count: self.stroke_count,
            rev_time: self.rev_time,
            stroke_time: self.stroke_time,
            drive_duration: 0,
            recovery_duration: 0,
            avg_stroke_power: 0.0,
            total_calories: self.total_calories,
            handle_forces: Vec::new(),
            battery_level: self.battery_level,
            drag_factor: self.device.drag_factor,
            flywheel_inertia: self.device.flywheel_inertia,
            magic_number: self.device.magic_number,
            auto_drag_factor: self.device.auto_drag_factor,
            ble_service_flag: self.device.ble_service_flag,
            log_level: self.device.log_level,
            elapsed_time: self.elapsed_time,
        }
    }
}

/// The pipeline's complete mutable state.
#[derive(Clone, Debug, Default)]
pub struct PipelineState {
    baseline: SessionBaseline,
    last: LastObserved,
}

impl PipelineState {
    /// Fresh state: zero baseline, zero last-observed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offsets of the current logical session.
    pub fn baseline(&self) -> SessionBaseline {
        self.baseline
    }

    /// Device settings of the previous event.
    pub fn device_settings(&self) -> DeviceSettings {
        self.last.device
    }

    /// Derive the snapshot for `frame`, then remember `frame` for the next delta.
    pub fn derive(
        &mut self,
        frame: &RawFrame,
        heart_rate: Option<HeartRateSample>,
    ) -> DerivedSnapshot {
        let rev_count = derive::rounded_distance(frame.distance);
        let distance_delta = rev_count - self.last.rev_count;
        let stroke_delta = frame.stroke_count as f64 - self.last.stroke_count as f64;
        let stroke_time_delta = frame.stroke_time as f64 - self.last.stroke_time as f64;
        let rev_time_delta = frame.rev_time as f64 - self.last.rev_time as f64;

        let snapshot = DerivedSnapshot {
            ble_service_flag: frame.ble_service_flag,
            log_level: frame.log_level,
            drive_duration: derive::micros_to_seconds(frame.drive_duration),
            recovery_duration: derive::micros_to_seconds(frame.recovery_duration),
            avg_stroke_power: frame.avg_stroke_power,
            distance: frame.distance - self.baseline.start_distance,
            battery_level: frame.battery_level,
            drag_factor: frame.drag_factor,
            flywheel_inertia: frame.flywheel_inertia,
            magic_number: frame.magic_number,
            auto_drag_factor: frame.auto_drag_factor,
            stroke_count: frame.stroke_count as i64 - self.baseline.start_stroke_count as i64,
            total_calories: frame.total_calories,
            elapsed_time: frame.elapsed_time,
            handle_forces: frame.handle_forces.clone(),
            peak_force: derive::peak_force(&frame.handle_forces),
            stroke_rate: derive::stroke_rate(stroke_delta, stroke_time_delta),
            speed: derive::speed(distance_delta, rev_time_delta),
            dist_per_stroke: derive::dist_per_stroke(distance_delta, stroke_delta),
            heart_rate,
        };

        self.last.observe(frame, rev_count);
        snapshot
    }

    /// Start a new logical session at the last observed counters.
    ///
    /// Returns the synthesized frame that must be fed through [`Self::derive`] so the
    /// published values read zero and the next real frame gets correct deltas.
    pub fn rebase(&mut self) -> RawFrame {
        self.baseline = SessionBaseline {
            start_distance: self.last.distance,
            start_stroke_count: self.last.stroke_count,
        };
        self.last.reset_frame()
    }
}
