//! Error types for the quietstretch crate.

use thiserror::Error;

/// Errors that can occur while denoising and stretching a signal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StretchError {
    /// Rejected at construction time; never reaches the streaming phase.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Input stream shorter than one frame, or than the calibration requirement.
    #[error("input too short: {provided} samples provided, {minimum} required")]
    InsufficientSamples { provided: usize, minimum: usize },
    /// The noise estimator saw fewer frames than it needs to freeze a profile.
    #[error("insufficient calibration data: {frames_available} of {frames_needed} frames")]
    InsufficientData {
        frames_needed: usize,
        frames_available: usize,
    },
    /// Input contained NaN or infinite samples.
    #[error("input contains non-finite samples")]
    NonFiniteInput,
    /// Input data with the wrong shape for this pipeline.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The core processes exactly one channel.
    #[error("invalid channel count: {0}, expected a single channel")]
    InvalidChannels(u16),
    /// A stage received frames out of index order.
    #[error("frame out of order: expected index {expected}, got {got}")]
    OutOfOrderFrame { expected: usize, got: usize },
    /// Samples were pushed after the stream was finished.
    #[error("stream already finished")]
    StreamClosed,
    /// A pipeline worker stopped without reporting a result.
    #[error("pipeline stage failed: {0}")]
    StageFailed(String),
    /// I/O or serialization error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StretchError {
    fn from(err: std::io::Error) -> Self {
        StretchError::Io(err.to_string())
    }
}

impl From<hound::Error> for StretchError {
    fn from(err: hound::Error) -> Self {
        StretchError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StretchError {
    fn from(err: serde_json::Error) -> Self {
        StretchError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_counts() {
        let err = StretchError::InsufficientSamples {
            provided: 10,
            minimum: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("1024"));

        let err = StretchError::InsufficientData {
            frames_needed: 20,
            frames_available: 3,
        };
        assert!(err.to_string().contains("3 of 20"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.wav");
        let err: StretchError = io.into();
        assert!(matches!(err, StretchError::Io(ref m) if m.contains("missing.wav")));
    }
}
