//! The spectral transform capability and its `rustfft` implementation.

use rustfft::num_complex::{Complex, Complex32};
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Zero-valued complex number, used for FFT buffer initialization.
pub const COMPLEX_ZERO: Complex<f32> = Complex::new(0.0, 0.0);

/// Minimum window energy (as a fraction of the peak) used when compensating
/// overlap-add output, so poorly covered edges are attenuated, not amplified.
pub const WINDOW_SUM_FLOOR_RATIO: f32 = 0.1;

/// Absolute floor for window energy compensation to prevent division by zero.
pub const WINDOW_SUM_EPSILON: f32 = 1e-6;

/// Forward/inverse discrete transform of a fixed block size.
///
/// Implementations must be linear and satisfy `inverse(forward(x)) ≈ x`.
pub trait SpectralTransform: Send {
    /// Block size W this transform operates on.
    fn size(&self) -> usize;

    /// Transforms W real samples into W complex bins.
    fn forward(&mut self, frame: &[f32]) -> Vec<Complex32>;

    /// Transforms W complex bins back into W real samples.
    fn inverse(&mut self, spectrum: &[Complex32]) -> Vec<f32>;
}

/// FFT-backed transform with plans and scratch space created once.
#[derive(Clone)]
pub struct RustFftTransform {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl RustFftTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Self {
            size,
            forward,
            inverse,
            buffer: vec![COMPLEX_ZERO; size],
            scratch: vec![COMPLEX_ZERO; scratch_len],
        }
    }
}

impl std::fmt::Debug for RustFftTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustFftTransform")
            .field("size", &self.size)
            .finish()
    }
}

impl SpectralTransform for RustFftTransform {
    #[inline]
    fn size(&self) -> usize {
        self.size
    }

    fn forward(&mut self, frame: &[f32]) -> Vec<Complex32> {
        debug_assert_eq!(frame.len(), self.size);
        for (slot, &sample) in self.buffer.iter_mut().zip(frame.iter()) {
            *slot = Complex::new(sample, 0.0);
        }
        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        self.buffer.clone()
    }

    fn inverse(&mut self, spectrum: &[Complex32]) -> Vec<f32> {
        debug_assert_eq!(spectrum.len(), self.size);
        self.buffer.copy_from_slice(spectrum);
        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        let norm = 1.0 / self.size as f32;
        self.buffer.iter().map(|c| c.re * norm).collect()
    }
}
