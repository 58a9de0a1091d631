//! Framing and spectral analysis of the input stream.

pub mod segmenter;
pub mod spectrum;

pub use segmenter::{frame_count, frames, FrameSegmenter, Frames};
pub use spectrum::SpectralAnalyzer;
