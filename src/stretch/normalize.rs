//! Peak normalization of the final output.

use log::debug;

use crate::error::StretchError;

/// Guards the gain computation against division by zero.
pub const NORMALIZE_EPSILON: f32 = 1e-9;

/// Below this peak the signal is treated as silence and passed through.
const SILENCE_THRESHOLD: f32 = 1e-9;

/// Scales a buffer so its peak absolute value equals a target level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    target: f32,
}

impl Normalizer {
    /// # Errors
    /// Returns `StretchError::InvalidConfiguration` unless `target` is finite
    /// and positive.
    pub fn new(target: f32) -> Result<Self, StretchError> {
        if !target.is_finite() || target <= 0.0 {
            return Err(StretchError::InvalidConfiguration(format!(
                "normalization target must be positive, got {}",
                target
            )));
        }
        Ok(Self { target })
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Largest absolute sample value, 0 for an empty buffer.
    pub fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |m, &x| m.max(x.abs()))
    }

    /// Returns a new buffer scaled by `target / (peak + epsilon)`.
    ///
    /// All-zero (or empty) input is returned unchanged.
    pub fn normalize(&self, samples: &[f32]) -> Vec<f32> {
        let peak = Self::peak(samples);
        if peak < SILENCE_THRESHOLD {
            debug!("normalization skipped for silent output");
            return samples.to_vec();
        }
        let gain = self.target / (peak + NORMALIZE_EPSILON);
        debug!("normalizing peak {:.6} to {:.3} (gain {:.4})", peak, self.target, gain);
        samples.iter().map(|&x| x * gain).collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { target: 1.0 }
    }
}
