//! Raw ergometer telemetry frames and their passthrough enums.

use serde::{Deserialize, Serialize};

/// BLE profile the monitor currently advertises.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BleServiceFlag {
    /// Cycling power service.
    CpsService,
    /// Cycling speed and cadence service.
    CscService,
    /// Fitness machine service.
    #[default]
    FtmsService,
}

impl TryFrom<u8> for BleServiceFlag {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BleServiceFlag::CpsService),
            1 => Ok(BleServiceFlag::CscService),
            2 => Ok(BleServiceFlag::FtmsService),
            other => Err(format!("unknown BLE service flag {other}")),
        }
    }
}

impl From<BleServiceFlag> for u8 {
    fn from(value: BleServiceFlag) -> Self {
        match value {
            BleServiceFlag::CpsService => 0,
            BleServiceFlag::CscService => 1,
            BleServiceFlag::FtmsService => 2,
        }
    }
}

/// Log verbosity configured on the monitor firmware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LogLevel {
    /// Everything, including per-impulse traces.
    #[default]
    Trace,
    /// Diagnostic output.
    Debug,
    /// Normal operation messages.
    Info,
    /// Recoverable problems.
    Warning,
    /// Failed operations.
    Error,
    /// Unrecoverable failures only.
    Fatal,
    /// No logging.
    Silent,
}

impl TryFrom<u8> for LogLevel {
    type Error = String;

    // `Self::Error` would name the `LogLevel::Error` variant here.
    fn try_from(value: u8) -> Result<Self, String> {
        let level = match value {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warning,
            4 => LogLevel::Error,
            5 => LogLevel::Fatal,
            6 => LogLevel::Silent,
            other => return Err(format!("unknown log level {other}")),
        };
        Ok(level)
    }
}

impl From<LogLevel> for u8 {
    fn from(value: LogLevel) -> Self {
        value as u8
    }
}

/// Whether the monitor recalculates the drag factor on its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AutoDragFactor {
    /// Drag factor stays at its configured value.
    #[default]
    Off,
    /// Drag factor is recalculated during the session.
    On,
}

impl TryFrom<u8> for AutoDragFactor {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AutoDragFactor::Off),
            1 => Ok(AutoDragFactor::On),
            other => Err(format!("unknown auto drag factor mode {other}")),
        }
    }
}

impl From<AutoDragFactor> for u8 {
    fn from(value: AutoDragFactor) -> Self {
        value as u8
    }
}

/// One telemetry sample as reported by the rowing monitor.
///
/// Counters (`distance`, `stroke_count`, `rev_time`, `stroke_time`,
/// `total_calories`) are cumulative since the device powered on. Times are in
/// microseconds of device clock, distance in centimetres.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFrame {
    /// Distance rowed, centimetres.
    pub distance: f64,
    /// Strokes counted by the monitor.
    pub stroke_count: u64,
    /// Device time of the last flywheel revolution, microseconds.
    pub rev_time: u64,
    /// Device time of the last completed stroke, microseconds.
    pub stroke_time: u64,
    /// Duration of the last drive phase, microseconds.
    pub drive_duration: u64,
    /// Duration of the last recovery phase, microseconds.
    pub recovery_duration: u64,
    /// Average power of the last stroke, watts.
    pub avg_stroke_power: f64,
    /// Energy expended, kilocalories.
    pub total_calories: f64,
    /// Instantaneous handle forces sampled during the last drive.
    pub handle_forces: Vec<f64>,
    /// Monitor battery, percent.
    pub battery_level: u8,
    /// Flywheel drag factor.
    pub drag_factor: f64,
    /// Flywheel moment of inertia, kg·m².
    pub flywheel_inertia: f64,
    /// Distance calibration constant.
    pub magic_number: f64,
    /// Whether the drag factor is recalculated automatically.
    pub auto_drag_factor: AutoDragFactor,
    /// Bluetooth profile in use.
    pub ble_service_flag: BleServiceFlag,
    /// Firmware log verbosity.
    pub log_level: LogLevel,
    /// Session time on the device clock, microseconds.
    pub elapsed_time: u64,
}
