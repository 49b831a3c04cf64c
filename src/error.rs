//! Custom error types for the application.
//!
//! This module defines the primary error type, `RowerError`, for the whole crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the few things that can actually fail around the aggregation pipeline: loading
//! configuration, talking to the filesystem, and the external collaborators
//! (telemetry sources and recorders).
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment` when the TOML file or environment
//!   overrides cannot be extracted into [`Settings`](crate::config::Settings).
//! - **`Configuration`**: Semantic errors in values that parsed fine (unknown log level,
//!   zero simulation interval, ...).
//! - **`Io`**, **`Serialization`**, **`Csv`**: Wrapped I/O and encoding failures from
//!   recorders and replay sources.
//! - **`Recorder`** / **`Source`**: Failures reported by external collaborators.
//! - **`PipelineClosed`** / **`TaskFailed`**: The pipeline task has stopped or died.
//!
//! Numeric edge cases of the derivation (division by zero, empty force curves) are
//! *not* errors; they surface as non-finite or sentinel values on the snapshot.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, RowerError>;

/// Primary error type for the rowing telemetry application.
#[derive(Error, Debug)]
pub enum RowerError {
    /// Configuration file or environment could not be extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Standard I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writer failed.
    #[cfg(feature = "storage_csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A recorder rejected a write.
    #[error("Recorder error: {0}")]
    Recorder(String),

    /// A telemetry or heart-rate source failed.
    #[error("Source error: {0}")]
    Source(String),

    /// The pipeline task is no longer running.
    #[error("Aggregation pipeline is closed")]
    PipelineClosed,

    /// A background task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// Feature compiled out.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl From<figment::Error> for RowerError {
    fn from(value: figment::Error) -> Self {
        RowerError::Config(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err = RowerError::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(matches!(err, RowerError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn configuration_errors_describe_the_field() {
        let err = RowerError::Configuration("frame_interval must be non-zero".into());
        assert_eq!(
            err.to_string(),
            "Configuration validation error: frame_interval must be non-zero"
        );
    }

    #[test]
    fn closed_pipeline_message() {
        assert_eq!(
            RowerError::PipelineClosed.to_string(),
            "Aggregation pipeline is closed"
        );
    }
}
