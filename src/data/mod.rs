//! Session recorders.
#[cfg(feature = "storage_csv")]
pub mod csv_recorder;
pub mod recorder;

#[cfg(feature = "storage_csv")]
pub use csv_recorder::CsvRecorder;
pub use recorder::{MemoryRecorder, NullRecorder, RecordedSample, RecordedSegment, SessionRecorder};
