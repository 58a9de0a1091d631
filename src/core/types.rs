use rustfft::num_complex::Complex32;
use std::f32::consts::PI;

use crate::error::StretchError;

/// A single audio sample (32-bit float, native full scale -1.0 to 1.0).
pub type Sample = f32;

/// A fixed-length block of time-domain samples cut from the input stream.
///
/// Frame `index` starts at sample `index * hop` of the stream that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: usize,
    hop: usize,
    samples: Vec<Sample>,
}

impl Frame {
    /// Creates a frame from its samples, index, and producing hop size.
    pub fn new(index: usize, hop: usize, samples: Vec<Sample>) -> Self {
        Self {
            index,
            hop,
            samples,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Position of the first sample of this frame within the source stream.
    #[inline]
    pub fn start_sample(&self) -> usize {
        self.index * self.hop
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Maps an angle from `atan2` into `(-PI, PI]`.
#[inline]
fn principal_phase(phase: f32) -> f32 {
    if phase <= -PI {
        PI
    } else {
        phase
    }
}

/// A spectrum in polar form: one magnitude and one phase per bin.
///
/// Magnitudes are never negative. Spectra produced by analysis store
/// principal phases in `(-PI, PI]`; spectra produced by the interpolator carry
/// accumulated, unwrapped phase.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    index: usize,
    magnitude: Vec<f32>,
    phase: Vec<f32>,
}

impl SpectralFrame {
    /// Builds a spectral frame from complex transform bins.
    pub fn from_bins(index: usize, bins: &[Complex32]) -> Self {
        let magnitude = bins.iter().map(|c| c.norm()).collect();
        let phase = bins.iter().map(|c| principal_phase(c.arg())).collect();
        Self {
            index,
            magnitude,
            phase,
        }
    }

    /// Builds a spectral frame from magnitude and phase vectors.
    ///
    /// # Errors
    /// Returns `StretchError::InvalidInput` if the lengths differ or a
    /// magnitude is negative or NaN.
    pub fn from_polar(
        index: usize,
        magnitude: Vec<f32>,
        phase: Vec<f32>,
    ) -> Result<Self, StretchError> {
        if magnitude.len() != phase.len() {
            return Err(StretchError::InvalidInput(format!(
                "magnitude has {} bins but phase has {}",
                magnitude.len(),
                phase.len()
            )));
        }
        if magnitude.iter().any(|m| m.is_nan() || *m < 0.0) {
            return Err(StretchError::InvalidInput(
                "spectral magnitudes must be non-negative".to_string(),
            ));
        }
        Ok(Self {
            index,
            magnitude,
            phase,
        })
    }

    /// A spectrum with every bin at zero magnitude and zero phase.
    pub fn silent(index: usize, num_bins: usize) -> Self {
        Self {
            index,
            magnitude: vec![0.0; num_bins],
            phase: vec![0.0; num_bins],
        }
    }

    /// Crate-internal constructor for callers that already guarantee the
    /// magnitude invariant.
    pub(crate) fn from_parts(index: usize, magnitude: Vec<f32>, phase: Vec<f32>) -> Self {
        debug_assert_eq!(magnitude.len(), phase.len());
        debug_assert!(magnitude.iter().all(|m| *m >= 0.0));
        Self {
            index,
            magnitude,
            phase,
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn magnitude(&self) -> &[f32] {
        &self.magnitude
    }

    #[inline]
    pub fn phase(&self) -> &[f32] {
        &self.phase
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.magnitude.len()
    }

    /// Returns a copy of this spectrum relabelled with a new frame index.
    pub fn reindexed(&self, index: usize) -> Self {
        Self {
            index,
            magnitude: self.magnitude.clone(),
            phase: self.phase.clone(),
        }
    }

    /// Relabels this spectrum in place of copying it.
    #[inline]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Converts back to rectangular bins.
    pub fn to_bins(&self) -> Vec<Complex32> {
        self.magnitude
            .iter()
            .zip(self.phase.iter())
            .map(|(&m, &p)| Complex32::from_polar(m, p))
            .collect()
    }
}

/// Buffer holding audio samples in interleaved format.
///
/// The processing core accepts mono buffers only; multichannel buffers exist
/// so file readers can hand their data to a caller that picks a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Raw interleaved sample data.
    pub data: Vec<Sample>,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Creates a new audio buffer.
    ///
    /// # Errors
    /// Returns `StretchError::InvalidChannels` if channels is 0 and
    /// `StretchError::InvalidConfiguration` if the sample rate is 0.
    pub fn new(data: Vec<Sample>, channels: u16, sample_rate: u32) -> Result<Self, StretchError> {
        if channels == 0 {
            return Err(StretchError::InvalidChannels(channels));
        }
        if sample_rate == 0 {
            return Err(StretchError::InvalidConfiguration(
                "sample rate must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            data,
            channels,
            sample_rate,
        })
    }

    /// Creates a single-channel buffer.
    pub fn mono(data: Vec<Sample>, sample_rate: u32) -> Result<Self, StretchError> {
        Self::new(data, 1, sample_rate)
    }

    /// Number of sample frames (total samples / channels).
    pub fn num_frames(&self) -> usize {
        self.data.len() / self.channels.max(1) as usize
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Extracts one channel as a new vector; empty when out of range.
    pub fn channel_data(&self, channel: u16) -> Vec<Sample> {
        if channel >= self.channels {
            return Vec::new();
        }
        self.data
            .iter()
            .skip(channel as usize)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }
}
