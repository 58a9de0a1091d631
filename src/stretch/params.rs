use log::debug;

use crate::core::config::{Calibration, VocoderConfig};
use crate::core::window::WindowType;
use crate::error::StretchError;
use crate::stretch::phase_locking::PhaseLocking;

/// Internal algorithm parameters derived from a validated [`VocoderConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmParams {
    pub frame_size: usize,
    pub hop_size: usize,
    pub stretch_factor: f64,
    pub sample_rate: u32,
    /// Number of leading frames `K` consumed by noise calibration.
    pub calibration_frames: usize,
    pub normalization_target: f32,
    pub window: WindowType,
    pub phase_locking: PhaseLocking,
    pub queue_capacity: usize,
}

impl AlgorithmParams {
    /// # Errors
    /// Returns `StretchError::InvalidConfiguration` if the config is invalid.
    pub fn from_config(config: &VocoderConfig) -> Result<Self, StretchError> {
        config.validate()?;
        let frame_size = config.frame_size;
        let hop_size = config.effective_hop_size();
        let calibration_frames =
            calibration_frames(config.calibration, config.sample_rate, frame_size, hop_size);
        let params = Self {
            frame_size,
            hop_size,
            stretch_factor: config.stretch_factor,
            sample_rate: config.sample_rate,
            calibration_frames,
            normalization_target: config.normalization_target,
            window: config.window,
            phase_locking: config.phase_locking,
            queue_capacity: config.queue_capacity,
        };
        debug!("resolved algorithm parameters: {:?}", params);
        Ok(params)
    }

    /// Fewest input samples that yield one frame past calibration.
    #[inline]
    pub fn minimum_input_len(&self) -> usize {
        self.frame_size + self.calibration_frames * self.hop_size
    }
}

/// Resolves a calibration setting into a frame count `K`.
///
/// A duration becomes the smallest `K` whose frames cover
/// `secs * sample_rate` samples, i.e. `(K - 1) * hop + frame_size >= span`.
pub fn calibration_frames(
    calibration: Calibration,
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
) -> usize {
    match calibration {
        Calibration::Frames(k) => k,
        Calibration::Duration(secs) => {
            let span = (secs * sample_rate as f64).round() as usize;
            if span == 0 {
                0
            } else if span <= frame_size {
                1
            } else {
                (span - frame_size).div_ceil(hop_size) + 1
            }
        }
    }
}
