//! Session control.
//!
//! A "session" is the logical rowing piece the user sees: distance and stroke count
//! start at zero when it begins. The rowing monitor itself keeps counting from power-on,
//! so starting a new session never touches the device; it only rebases the pipeline's
//! offsets and opens a new recorder segment.

use crate::pipeline::PipelineHandle;

/// The single entry point for starting a new session.
#[derive(Clone, Debug)]
pub struct SessionController {
    pipeline: PipelineHandle,
}

impl SessionController {
    /// Controller that resets the given pipeline.
    pub fn new(pipeline: PipelineHandle) -> Self {
        Self { pipeline }
    }

    /// Start a new session at the current device counters.
    ///
    /// Calling it repeatedly simply rebases again.
    pub fn reset(&self) {
        tracing::debug!("Session reset requested");
        self.pipeline.reset();
    }
}
