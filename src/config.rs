//! Configuration System using Figment
//!
//! Strongly-typed settings for the telemetry service. Configuration is layered from:
//! 1. built-in defaults ([`Settings::default`]),
//! 2. a TOML file (`config/rowing_daq.toml` unless another path is given),
//! 3. environment variables prefixed with `ROWING_DAQ_`, using `__` between sections.
//!
//! # Example
//! ```no_run
//! use rowing_daq::config::Settings;
//!
//! let settings = Settings::load()?;
//! settings.validate()?;
//! println!("Application: {}", settings.application.name);
//! # Ok::<(), rowing_daq::error::RowerError>(())
//! ```
//!
//! `ROWING_DAQ_APPLICATION__LOG_LEVEL=debug` overrides `application.log_level`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, RowerError};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/rowing_daq.toml";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "ROWING_DAQ_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Session recorder settings
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// Simulated rower and heart-rate strap
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// Where recorded sessions go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderFormat {
    /// Keep segments in memory only.
    Memory,
    /// One CSV plus a raw JSON-lines log per segment.
    #[default]
    Csv,
}

/// Recorder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Whether sessions are recorded at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Recorder backend
    #[serde(default)]
    pub format: RecorderFormat,
    /// Output directory for recorded sessions
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            format: RecorderFormat::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Interval between simulated telemetry frames
    #[serde(default = "default_frame_interval", with = "humantime_serde")]
    pub frame_interval: Duration,
    /// Interval between simulated heart-rate readings
    #[serde(default = "default_heart_rate_interval", with = "humantime_serde")]
    pub heart_rate_interval: Duration,
    /// Whether a simulated heart-rate strap is attached
    #[serde(default = "default_enabled")]
    pub heart_rate: bool,
    /// RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frame_interval: default_frame_interval(),
            heart_rate_interval: default_heart_rate_interval(),
            heart_rate: default_enabled(),
            seed: None,
        }
    }
}

// Default value functions
fn default_name() -> String {
    "Rowing DAQ".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_frame_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_heart_rate_interval() -> Duration {
    Duration::from_secs(1)
}

impl Settings {
    /// Load configuration from the default file and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Ok(Self::figment(path.as_ref()).extract()?)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(RowerError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.simulation.frame_interval.is_zero() {
            return Err(RowerError::Configuration(
                "simulation.frame_interval must be greater than zero".into(),
            ));
        }

        if self.simulation.heart_rate && self.simulation.heart_rate_interval.is_zero() {
            return Err(RowerError::Configuration(
                "simulation.heart_rate_interval must be greater than zero".into(),
            ));
        }

        if self.recorder.enabled
            && self.recorder.format == RecorderFormat::Csv
            && self.recorder.output_dir.as_os_str().is_empty()
        {
            return Err(RowerError::Configuration(
                "recorder.output_dir must be set for the csv recorder".into(),
            ));
        }

        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self).map_err(|e| RowerError::Configuration(e.to_string()))
    }
}
