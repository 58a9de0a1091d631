//! Noise calibration and spectral subtraction.

pub mod profile;
pub mod subtract;

pub use profile::{NoiseProfile, NoiseProfileEstimator};
pub use subtract::SpectralDenoiser;
