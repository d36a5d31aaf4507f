//! Orchestration layer: merge logic and the artist ingestion pipeline.

pub mod merge;
pub mod pipeline;
pub mod progress;

pub use merge::merge;
pub use pipeline::{IngestReport, Ingestor};
pub use progress::{ProgressReporter, SilentProgress};
