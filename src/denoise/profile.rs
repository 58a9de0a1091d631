//! Static noise-spectrum estimation from the leading calibration frames.

use log::{debug, info};

use crate::core::types::SpectralFrame;
use crate::error::StretchError;

/// Per-bin mean noise magnitude, frozen once calibration completes.
///
/// There is no mutating API: a profile is built by the estimator (or as the
/// silent profile) and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseProfile {
    magnitude: Vec<f32>,
    frames_used: usize,
}

impl NoiseProfile {
    /// The all-zero profile; subtraction against it is the identity.
    pub fn silent(num_bins: usize) -> Self {
        Self {
            magnitude: vec![0.0; num_bins],
            frames_used: 0,
        }
    }

    #[inline]
    pub fn magnitude(&self) -> &[f32] {
        &self.magnitude
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.magnitude.len()
    }

    /// Number of calibration frames averaged into this profile.
    #[inline]
    pub fn frames_used(&self) -> usize {
        self.frames_used
    }

    /// Average noise magnitude across all bins.
    pub fn mean_level(&self) -> f32 {
        if self.magnitude.is_empty() {
            return 0.0;
        }
        self.magnitude.iter().sum::<f32>() / self.magnitude.len() as f32
    }

    pub fn is_silent(&self) -> bool {
        self.magnitude.iter().all(|&m| m == 0.0)
    }
}

/// Accumulates the magnitude spectra of the first `K` frames and freezes
/// their per-bin mean as a [`NoiseProfile`].
#[derive(Debug, Clone)]
pub struct NoiseProfileEstimator {
    frames_needed: usize,
    frames_seen: usize,
    // f64 keeps long calibrations from losing small bins to rounding.
    sums: Vec<f64>,
    frozen: Option<NoiseProfile>,
}

impl NoiseProfileEstimator {
    /// Creates an estimator for `frames_needed` frames of `num_bins` bins.
    ///
    /// With `frames_needed == 0` the estimator is frozen immediately with the
    /// silent profile.
    pub fn new(frames_needed: usize, num_bins: usize) -> Self {
        let frozen = (frames_needed == 0).then(|| NoiseProfile::silent(num_bins));
        Self {
            frames_needed,
            frames_seen: 0,
            sums: vec![0.0; num_bins],
            frozen,
        }
    }

    #[inline]
    pub fn frames_needed(&self) -> usize {
        self.frames_needed
    }

    #[inline]
    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// The frozen profile, once calibration is complete.
    pub fn profile(&self) -> Option<&NoiseProfile> {
        self.frozen.as_ref()
    }

    /// Adds one calibration frame.
    ///
    /// Returns the profile when this frame completes calibration. Once frozen,
    /// further frames are ignored and `Ok(None)` is returned.
    ///
    /// # Errors
    /// Returns `StretchError::InvalidInput` if the frame has the wrong number
    /// of bins.
    pub fn push(&mut self, frame: &SpectralFrame) -> Result<Option<NoiseProfile>, StretchError> {
        if self.frozen.is_some() {
            return Ok(None);
        }
        if frame.num_bins() != self.sums.len() {
            return Err(StretchError::InvalidInput(format!(
                "calibration frame has {} bins, expected {}",
                frame.num_bins(),
                self.sums.len()
            )));
        }

        for (sum, &m) in self.sums.iter_mut().zip(frame.magnitude().iter()) {
            *sum += m as f64;
        }
        self.frames_seen += 1;
        debug!(
            "calibration frame {}/{}",
            self.frames_seen, self.frames_needed
        );

        if self.frames_seen < self.frames_needed {
            return Ok(None);
        }

        let count = self.frames_seen as f64;
        let profile = NoiseProfile {
            magnitude: self.sums.iter().map(|&s| (s / count) as f32).collect(),
            frames_used: self.frames_seen,
        };
        info!(
            "noise profile frozen after {} frames (mean magnitude {:.6})",
            profile.frames_used,
            profile.mean_level()
        );
        self.frozen = Some(profile.clone());
        Ok(Some(profile))
    }

    /// Ends calibration, returning the frozen profile.
    ///
    /// # Errors
    /// Returns `StretchError::InsufficientData` if the stream ended before
    /// enough frames arrived.
    pub fn finish(&self) -> Result<NoiseProfile, StretchError> {
        self.frozen
            .clone()
            .ok_or(StretchError::InsufficientData {
                frames_needed: self.frames_needed,
                frames_available: self.frames_seen,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(index: usize, mags: &[f32]) -> SpectralFrame {
        SpectralFrame::from_polar(index, mags.to_vec(), vec![0.0; mags.len()]).unwrap()
    }

    #[test]
    fn test_mean_over_calibration_frames() {
        let mut est = NoiseProfileEstimator::new(2, 3);
        assert!(est.push(&spectrum(0, &[1.0, 2.0, 0.0])).unwrap().is_none());
        let profile = est
            .push(&spectrum(1, &[3.0, 2.0, 1.0]))
            .unwrap()
            .expect("second frame completes calibration");
        assert_eq!(profile.magnitude(), &[2.0, 2.0, 0.5]);
        assert_eq!(profile.frames_used(), 2);
        assert!(est.is_frozen());
    }

    #[test]
    fn test_frozen_profile_ignores_later_frames() {
        let mut est = NoiseProfileEstimator::new(1, 2);
        let profile = est.push(&spectrum(0, &[0.5, 0.5])).unwrap().unwrap();

        assert!(est.push(&spectrum(1, &[9.0, 9.0])).unwrap().is_none());
        assert_eq!(est.profile(), Some(&profile));
        assert_eq!(est.finish().unwrap(), profile);
        assert_eq!(est.frames_seen(), 1);
    }

    #[test]
    fn test_insufficient_data() {
        let mut est = NoiseProfileEstimator::new(3, 2);
        est.push(&spectrum(0, &[1.0, 1.0])).unwrap();
        assert_eq!(
            est.finish(),
            Err(StretchError::InsufficientData {
                frames_needed: 3,
                frames_available: 1
            })
        );
    }

    #[test]
    fn test_zero_frames_is_silent() {
        let est = NoiseProfileEstimator::new(0, 4);
        let profile = est.finish().unwrap();
        assert!(profile.is_silent());
        assert_eq!(profile.num_bins(), 4);
    }

    #[test]
    fn test_bin_count_mismatch() {
        let mut est = NoiseProfileEstimator::new(2, 4);
        assert!(est.push(&spectrum(0, &[1.0])).is_err());
    }
}
