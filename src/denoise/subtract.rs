use crate::core::types::SpectralFrame;
use crate::denoise::profile::NoiseProfile;
use crate::error::StretchError;

/// Magnitude spectral subtraction against a frozen noise profile.
///
/// `out[bin] = max(in[bin] - noise[bin], 0)`; phases pass through untouched.
#[derive(Debug, Clone)]
pub struct SpectralDenoiser {
    profile: NoiseProfile,
}

impl SpectralDenoiser {
    pub fn new(profile: NoiseProfile) -> Self {
        Self { profile }
    }

    #[inline]
    pub fn profile(&self) -> &NoiseProfile {
        &self.profile
    }

    /// # Errors
    /// Returns `StretchError::InvalidInput` if the frame and profile differ in
    /// bin count.
    pub fn denoise(&self, frame: &SpectralFrame) -> Result<SpectralFrame, StretchError> {
        if frame.num_bins() != self.profile.num_bins() {
            return Err(StretchError::InvalidInput(format!(
                "frame has {} bins but the noise profile has {}",
                frame.num_bins(),
                self.profile.num_bins()
            )));
        }
        let magnitude = frame
            .magnitude()
            .iter()
            .zip(self.profile.magnitude().iter())
            .map(|(&m, &n)| (m - n).max(0.0))
            .collect();
        Ok(SpectralFrame::from_parts(
            frame.index(),
            magnitude,
            frame.phase().to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denoise::profile::NoiseProfileEstimator;

    fn profile_of(mags: &[f32]) -> NoiseProfile {
        let mut est = NoiseProfileEstimator::new(1, mags.len());
        let frame =
            SpectralFrame::from_polar(0, mags.to_vec(), vec![0.0; mags.len()]).unwrap();
        est.push(&frame).unwrap().unwrap()
    }

    #[test]
    fn test_subtraction_floors_at_zero() {
        let denoiser = SpectralDenoiser::new(profile_of(&[1.0, 1.0, 0.25]));
        let frame =
            SpectralFrame::from_polar(3, vec![3.0, 0.5, 0.25], vec![0.1, -2.0, 3.0]).unwrap();
        let out = denoiser.denoise(&frame).unwrap();

        assert_eq!(out.index(), 3);
        assert_eq!(out.magnitude(), &[2.0, 0.0, 0.0]);
        assert_eq!(out.phase(), frame.phase());
    }

    #[test]
    fn test_silent_profile_is_identity() {
        let denoiser = SpectralDenoiser::new(NoiseProfile::silent(2));
        let frame = SpectralFrame::from_polar(0, vec![0.7, 0.0], vec![1.0, 0.5]).unwrap();
        assert_eq!(denoiser.denoise(&frame).unwrap(), frame);
    }

    #[test]
    fn test_output_never_negative() {
        let denoiser = SpectralDenoiser::new(profile_of(&[5.0; 8]));
        let frame = SpectralFrame::from_polar(
            0,
            (0..8).map(|i| i as f32).collect(),
            vec![0.0; 8],
        )
        .unwrap();
        let out = denoiser.denoise(&frame).unwrap();
        assert!(out.magnitude().iter().all(|&m| m >= 0.0));
        assert_eq!(out.magnitude()[7], 2.0);
    }

    #[test]
    fn test_bin_mismatch() {
        let denoiser = SpectralDenoiser::new(NoiseProfile::silent(4));
        assert!(denoiser.denoise(&SpectralFrame::silent(0, 3)).is_err());
    }
}
