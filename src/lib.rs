#![forbid(unsafe_code)]
//! Streaming phase-vocoder time stretching with static noise removal.
//!
//! `quietstretch` changes the duration of a mono signal without altering its
//! pitch. The leading part of the stream is treated as a noise-only
//! calibration region: its average magnitude spectrum becomes a frozen noise
//! profile that is subtracted from every later frame before the phase vocoder
//! stretches it. Output frames are overlap-added with window-energy
//! compensation and peak-normalized.
//!
//! # Quick Start
//!
//! ```
//! use quietstretch::{Calibration, VocoderConfig};
//!
//! // Half a second of low-level hiss, then a 440 Hz tone.
//! let input: Vec<f32> = (0..44100)
//!     .map(|i| {
//!         let hiss = 0.01 * ((i * 7919) % 113) as f32 / 113.0;
//!         let tone = if i >= 22050 {
//!             (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin()
//!         } else {
//!             0.0
//!         };
//!         hiss + tone
//!     })
//!     .collect();
//!
//! let config = VocoderConfig::new(1.5)
//!     .unwrap()
//!     .with_calibration(Calibration::Duration(0.5));
//! let output = quietstretch::process(&input, &config).unwrap();
//! assert!(output.iter().all(|s| s.abs() <= 1.0 + 1e-6));
//! ```
//!
//! # Streaming
//!
//! Feed chunks of any size through [`StreamProcessor`]; the result does not
//! depend on how the input was split. [`StagedPipeline`] runs the same stages
//! on worker threads joined by bounded queues.
//!
//! ```
//! use quietstretch::{Calibration, StreamProcessor, VocoderConfig};
//!
//! let config = VocoderConfig::new(2.0)
//!     .unwrap()
//!     .with_frame_size(512)
//!     .with_hop_size(128)
//!     .with_calibration(Calibration::Frames(0));
//! let mut processor = StreamProcessor::new(&config).unwrap();
//! for chunk in vec![0.25f32; 4096].chunks(300) {
//!     processor.push(chunk).unwrap();
//! }
//! let outcome = processor.finish().unwrap();
//! assert_eq!(outcome.output.len(), outcome.accumulator.len());
//! ```

pub mod analysis;
pub mod core;
pub mod denoise;
pub mod error;
pub mod io;
pub mod stream;
pub mod stretch;

pub use crate::core::config::{Calibration, Preset, VocoderConfig};
pub use crate::core::fft::{RustFftTransform, SpectralTransform};
pub use crate::core::types::{AudioBuffer, Frame, Sample, SpectralFrame};
pub use crate::core::window::{WindowTable, WindowType};
pub use denoise::{NoiseProfile, NoiseProfileEstimator, SpectralDenoiser};
pub use error::StretchError;
pub use stream::{CancelToken, PipelineState, StagedPipeline, StreamProcessor, StretchOutcome};
pub use stretch::{OutputAccumulator, PhaseLocking};

/// Denoises and stretches a complete mono signal.
///
/// The first `K` frames (see [`Calibration`]) calibrate the noise profile
/// and are not part of the output.
///
/// # Errors
///
/// Returns [`StretchError::InvalidConfiguration`] for an invalid config,
/// [`StretchError::NonFiniteInput`] if the input holds NaN or infinity, and
/// [`StretchError::InsufficientSamples`] if the input does not reach past
/// the calibration region.
pub fn process(input: &[f32], config: &VocoderConfig) -> Result<Vec<f32>, StretchError> {
    Ok(process_outcome(input, config)?.output)
}

/// Like [`process`], but returns the full [`StretchOutcome`], including the
/// pre-normalization accumulator and the noise profile.
///
/// # Errors
///
/// See [`process`].
pub fn process_outcome(
    input: &[f32],
    config: &VocoderConfig,
) -> Result<StretchOutcome, StretchError> {
    let mut processor = StreamProcessor::new(config)?;
    processor.push(input)?;
    processor.finish()
}

/// Processes a mono [`AudioBuffer`], using the buffer's sample rate in place
/// of the configured one.
///
/// # Errors
///
/// Returns [`StretchError::InvalidChannels`] for multichannel buffers, plus
/// everything [`process`] can return.
pub fn process_buffer(
    buffer: &AudioBuffer,
    config: &VocoderConfig,
) -> Result<AudioBuffer, StretchError> {
    if buffer.channels != 1 {
        return Err(StretchError::InvalidChannels(buffer.channels));
    }
    let mut effective = config.clone();
    effective.sample_rate = buffer.sample_rate;
    let output = process(&buffer.data, &effective)?;
    AudioBuffer::mono(output, buffer.sample_rate)
}
