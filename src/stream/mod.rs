//! Incremental drivers for the full pipeline.

pub mod processor;
pub mod staged;

pub use processor::{PipelineState, StreamProcessor, StretchOutcome};
pub use staged::{CancelToken, StagedPipeline};
