//! Time-scale modification: phase-vocoder interpolation, overlap-add
//! resynthesis, and output normalization.

pub mod interpolator;
pub mod normalize;
pub mod overlap_add;
pub mod params;
pub mod phase_locking;

pub use interpolator::{interpolate_all, output_frame_count, wrap_phase, PhaseVocoderInterpolator};
pub use normalize::Normalizer;
pub use overlap_add::{OutputAccumulator, OverlapAddSynthesizer};
pub use params::AlgorithmParams;
pub use phase_locking::PhaseLocking;
