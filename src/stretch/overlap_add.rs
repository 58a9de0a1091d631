//! Overlap-add resynthesis with window-energy tracking.

use log::trace;
use rustfft::num_complex::Complex32;

use crate::core::fft::{SpectralTransform, COMPLEX_ZERO, WINDOW_SUM_EPSILON, WINDOW_SUM_FLOOR_RATIO};
use crate::core::types::SpectralFrame;
use crate::core::window::WindowTable;
use crate::error::StretchError;

/// Sum of windowed synthesis frames placed at their hop offsets, with a
/// parallel buffer of summed squared window values.
///
/// Frames are added whole and in index order, so the accumulator is valid
/// after any number of additions. Its length is always
/// `(frames - 1) * hop + frame_size` (0 before the first frame).
#[derive(Debug, Clone, PartialEq)]
pub struct OutputAccumulator {
    frame_size: usize,
    hop_size: usize,
    samples: Vec<f32>,
    energy: Vec<f32>,
    frames: usize,
}

impl OutputAccumulator {
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        Self {
            frame_size,
            hop_size,
            samples: Vec::new(),
            energy: Vec::new(),
            frames: 0,
        }
    }

    /// Pre-allocates room for `num_frames` frames.
    pub fn with_capacity(frame_size: usize, hop_size: usize, num_frames: usize) -> Self {
        let mut acc = Self::new(frame_size, hop_size);
        let len = Self::len_for(frame_size, hop_size, num_frames);
        acc.samples.reserve(len);
        acc.energy.reserve(len);
        acc
    }

    /// Buffer length for `num_frames` frames.
    #[inline]
    pub fn len_for(frame_size: usize, hop_size: usize, num_frames: usize) -> usize {
        if num_frames == 0 {
            0
        } else {
            (num_frames - 1) * hop_size + frame_size
        }
    }

    /// Adds frame `index` (already windowed) at offset `index * hop`, and the
    /// squared `window` into the energy buffer.
    ///
    /// # Errors
    /// Returns `StretchError::OutOfOrderFrame` unless `index` is the next frame,
    /// and `StretchError::InvalidInput` if the block or window has the wrong
    /// length.
    pub fn add_frame(
        &mut self,
        index: usize,
        block: &[f32],
        window: &[f32],
    ) -> Result<(), StretchError> {
        if index != self.frames {
            return Err(StretchError::OutOfOrderFrame {
                expected: self.frames,
                got: index,
            });
        }
        if block.len() != self.frame_size || window.len() != self.frame_size {
            return Err(StretchError::InvalidInput(format!(
                "synthesis frame of {} samples (window {}), expected {}",
                block.len(),
                window.len(),
                self.frame_size
            )));
        }

        let offset = index * self.hop_size;
        let new_len = offset + self.frame_size;
        self.samples.resize(new_len, 0.0);
        self.energy.resize(new_len, 0.0);

        let out = &mut self.samples[offset..new_len];
        let energy = &mut self.energy[offset..new_len];
        for (((o, e), &x), &w) in out
            .iter_mut()
            .zip(energy.iter_mut())
            .zip(block.iter())
            .zip(window.iter())
        {
            *o += x;
            *e += w * w;
        }
        self.frames += 1;
        Ok(())
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    #[inline]
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Number of frames added so far.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The raw overlap-add sum.
    #[inline]
    pub fn raw(&self) -> &[f32] {
        &self.samples
    }

    /// Summed squared window values at each output sample.
    #[inline]
    pub fn window_energy(&self) -> &[f32] {
        &self.energy
    }

    /// The overlap-add sum divided by the window energy.
    ///
    /// Energy is clamped below at a fraction of its peak so that poorly
    /// covered edge samples stay attenuated instead of being amplified.
    pub fn compensated(&self) -> Vec<f32> {
        let max_energy = self.energy.iter().copied().fold(0.0f32, f32::max);
        let floor = (max_energy * WINDOW_SUM_FLOOR_RATIO).max(WINDOW_SUM_EPSILON);
        self.samples
            .iter()
            .zip(self.energy.iter())
            .map(|(&s, &e)| s / e.max(floor))
            .collect()
    }
}

/// Inverse-transforms output spectra, applies the synthesis window, and
/// accumulates them into an [`OutputAccumulator`].
#[derive(Debug, Clone)]
pub struct OverlapAddSynthesizer<T: SpectralTransform> {
    window: WindowTable,
    transform: T,
    accumulator: OutputAccumulator,
    bins: Vec<Complex32>,
}

impl<T: SpectralTransform> OverlapAddSynthesizer<T> {
    pub fn new(window: WindowTable, transform: T, hop_size: usize) -> Self {
        debug_assert_eq!(window.len(), transform.size());
        let frame_size = window.len();
        Self {
            accumulator: OutputAccumulator::new(frame_size, hop_size),
            bins: vec![COMPLEX_ZERO; frame_size],
            window,
            transform,
        }
    }

    #[inline]
    pub fn accumulator(&self) -> &OutputAccumulator {
        &self.accumulator
    }

    pub fn into_accumulator(self) -> OutputAccumulator {
        self.accumulator
    }

    /// Moves the accumulated output out, leaving an empty accumulator behind.
    pub fn take_accumulator(&mut self) -> OutputAccumulator {
        let empty = OutputAccumulator::new(
            self.accumulator.frame_size(),
            self.accumulator.hop_size(),
        );
        std::mem::replace(&mut self.accumulator, empty)
    }

    /// Resynthesizes one output spectrum and adds it at its hop offset.
    ///
    /// # Errors
    /// Returns `StretchError::OutOfOrderFrame` if frames skip or repeat, and
    /// `StretchError::InvalidInput` on a bin-count mismatch.
    pub fn add(&mut self, frame: &SpectralFrame) -> Result<(), StretchError> {
        if frame.num_bins() != self.bins.len() {
            return Err(StretchError::InvalidInput(format!(
                "spectrum has {} bins, expected {}",
                frame.num_bins(),
                self.bins.len()
            )));
        }
        self.rebuild_hermitian(frame);
        let mut block = self.transform.inverse(&self.bins);
        self.window.apply(&mut block);
        self.accumulator
            .add_frame(frame.index(), &block, self.window.coefficients())?;
        trace!("overlap-added frame {}", frame.index());
        Ok(())
    }

    /// Rebuilds rectangular bins from the non-redundant half of the spectrum
    /// and mirrors conjugates into the upper half so the inverse is real.
    fn rebuild_hermitian(&mut self, frame: &SpectralFrame) {
        let size = self.bins.len();
        let half = size / 2;
        let mag = frame.magnitude();
        let phase = frame.phase();
        for bin in 0..=half.min(size - 1) {
            self.bins[bin] = Complex32::from_polar(mag[bin], phase[bin]);
        }
        for bin in 1..size.div_ceil(2) {
            self.bins[size - bin] = self.bins[bin].conj();
        }
    }
}
