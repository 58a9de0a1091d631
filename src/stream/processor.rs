use log::{debug, info, trace, warn};

use crate::analysis::segmenter::FrameSegmenter;
use crate::analysis::spectrum::SpectralAnalyzer;
use crate::core::config::VocoderConfig;
use crate::core::fft::{RustFftTransform, SpectralTransform};
use crate::core::types::{Frame, Sample};
use crate::core::window::WindowTable;
use crate::denoise::{NoiseProfile, NoiseProfileEstimator, SpectralDenoiser};
use crate::error::StretchError;
use crate::stretch::interpolator::PhaseVocoderInterpolator;
use crate::stretch::normalize::Normalizer;
use crate::stretch::overlap_add::{OutputAccumulator, OverlapAddSynthesizer};
use crate::stretch::params::AlgorithmParams;

/// Relative ripple of the overlapped window energy above which the window/hop
/// pair is reported as not constant overlap-add.
pub(crate) const COLA_TOLERANCE: f32 = 0.01;

/// Lifecycle of a [`StreamProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Leading frames feed the noise estimator and produce no output.
    Calibrating,
    /// Frames are denoised, interpolated and overlap-added as they arrive.
    Streaming,
    /// Input is closed and the interpolator tail is being drained.
    Flushing,
    /// The outcome has been taken; the processor accepts nothing further.
    Done,
}

/// Everything a finished (or aborted) stretch produces.
#[derive(Debug, Clone)]
pub struct StretchOutcome {
    /// The pre-normalization overlap-add state.
    pub accumulator: OutputAccumulator,
    /// Window-compensated, peak-normalized output samples.
    pub output: Vec<Sample>,
    /// The frozen noise profile, absent if calibration never completed.
    pub noise_profile: Option<NoiseProfile>,
    pub cancelled: bool,
}

/// Sequential calibrate → denoise → stretch → resynthesize pipeline.
///
/// Samples are pushed in chunks of any size; each chunk is framed, analyzed
/// and carried as far through the pipeline as it can go. The output only
/// depends on the concatenated input, not on how it was chunked.
pub struct StreamProcessor<T: SpectralTransform = RustFftTransform> {
    params: AlgorithmParams,
    segmenter: FrameSegmenter,
    analyzer: SpectralAnalyzer<T>,
    estimator: NoiseProfileEstimator,
    denoiser: Option<SpectralDenoiser>,
    interpolator: PhaseVocoderInterpolator,
    synthesizer: OverlapAddSynthesizer<T>,
    normalizer: Normalizer,
    state: PipelineState,
    /// Frames that have passed calibration, i.e. the interpolator's input count.
    streamed: usize,
}

impl StreamProcessor<RustFftTransform> {
    /// Creates a processor backed by `rustfft`.
    ///
    /// # Errors
    /// Returns `StretchError::InvalidConfiguration` if the config is invalid.
    pub fn new(config: &VocoderConfig) -> Result<Self, StretchError> {
        let transform = RustFftTransform::new(config.frame_size);
        Self::with_transform(config, transform)
    }
}

impl<T: SpectralTransform + Clone> StreamProcessor<T> {
    /// Creates a processor using a caller-supplied transform.
    ///
    /// # Errors
    /// Returns `StretchError::InvalidConfiguration` if the config is invalid or
    /// the transform size differs from the frame size.
    pub fn with_transform(config: &VocoderConfig, transform: T) -> Result<Self, StretchError> {
        let params = AlgorithmParams::from_config(config)?;
        if transform.size() != params.frame_size {
            return Err(StretchError::InvalidConfiguration(format!(
                "transform size {} does not match frame size {}",
                transform.size(),
                params.frame_size
            )));
        }

        let window = WindowTable::new(params.window, params.frame_size)?;
        warn_if_not_cola(&window, params.hop_size);

        let num_bins = params.frame_size;
        let estimator = NoiseProfileEstimator::new(params.calibration_frames, num_bins);
        let denoiser = estimator.profile().cloned().map(SpectralDenoiser::new);
        let state = if denoiser.is_some() {
            PipelineState::Streaming
        } else {
            PipelineState::Calibrating
        };
        debug!(
            "stream processor starting in {:?} (calibration frames {})",
            state, params.calibration_frames
        );

        Ok(Self {
            segmenter: FrameSegmenter::new(params.frame_size, params.hop_size)?,
            analyzer: SpectralAnalyzer::new(window.clone(), transform.clone()),
            interpolator: PhaseVocoderInterpolator::new(
                num_bins,
                params.stretch_factor,
                params.phase_locking,
            )?,
            synthesizer: OverlapAddSynthesizer::new(window, transform, params.hop_size),
            normalizer: Normalizer::new(params.normalization_target)?,
            estimator,
            denoiser,
            state,
            streamed: 0,
            params,
        })
    }
}

impl<T: SpectralTransform> StreamProcessor<T> {
    #[inline]
    pub fn params(&self) -> &AlgorithmParams {
        &self.params
    }

    #[inline]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The frozen noise profile once calibration is complete.
    pub fn noise_profile(&self) -> Option<&NoiseProfile> {
        self.denoiser.as_ref().map(SpectralDenoiser::profile)
    }

    /// Input samples accepted so far.
    #[inline]
    pub fn samples_seen(&self) -> usize {
        self.segmenter.samples_seen()
    }

    /// Output frames overlap-added so far.
    #[inline]
    pub fn output_frames(&self) -> usize {
        self.synthesizer.accumulator().num_frames()
    }

    /// The overlap-add state as it stands.
    #[inline]
    pub fn accumulator(&self) -> &OutputAccumulator {
        self.synthesizer.accumulator()
    }

    /// Fewest input samples that produce any output: `W + K * H`.
    #[inline]
    pub fn latency_samples(&self) -> usize {
        self.params.minimum_input_len()
    }

    pub fn latency_secs(&self) -> f64 {
        self.latency_samples() as f64 / self.params.sample_rate as f64
    }

    /// Feeds a chunk of mono samples.
    ///
    /// Returns the number of output frames synthesized by this chunk.
    ///
    /// # Errors
    /// Returns `StretchError::NonFiniteInput` if any sample is NaN or
    /// infinite (nothing from the chunk is consumed), and
    /// `StretchError::StreamClosed` once the processor has finished.
    pub fn push(&mut self, samples: &[Sample]) -> Result<usize, StretchError> {
        if matches!(self.state, PipelineState::Flushing | PipelineState::Done) {
            return Err(StretchError::StreamClosed);
        }
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(StretchError::NonFiniteInput);
        }
        let before = self.output_frames();
        for frame in self.segmenter.push(samples)? {
            self.process_frame(&frame)?;
        }
        Ok(self.output_frames() - before)
    }

    /// Closes the input, drains the interpolator and returns the normalized
    /// result.
    ///
    /// # Errors
    /// Returns `StretchError::InsufficientSamples` if fewer than `W` samples
    /// arrived or none survived calibration, and `StretchError::StreamClosed`
    /// if called twice.
    pub fn finish(&mut self) -> Result<StretchOutcome, StretchError> {
        if matches!(self.state, PipelineState::Flushing | PipelineState::Done) {
            return Err(StretchError::StreamClosed);
        }
        let input_frames = self.segmenter.finish()?;
        if self.denoiser.is_none() || self.streamed == 0 {
            self.state = PipelineState::Done;
            return Err(StretchError::InsufficientSamples {
                provided: self.segmenter.samples_seen(),
                minimum: self.params.minimum_input_len(),
            });
        }

        self.state = PipelineState::Flushing;
        debug!(
            "flushing after {} input frames ({} past calibration)",
            input_frames, self.streamed
        );
        for frame in self.interpolator.finish() {
            self.synthesizer.add(&frame)?;
        }

        let outcome = self.take_outcome(false);
        info!(
            "stretched {} samples into {} (factor {})",
            self.segmenter.samples_seen(),
            outcome.output.len(),
            self.params.stretch_factor
        );
        Ok(outcome)
    }

    /// Stops without draining the interpolator and returns whatever has been
    /// synthesized so far, normalized and marked as cancelled.
    ///
    /// # Errors
    /// Returns `StretchError::StreamClosed` once the processor has finished
    /// or been aborted.
    pub fn abort(&mut self) -> Result<StretchOutcome, StretchError> {
        if matches!(self.state, PipelineState::Flushing | PipelineState::Done) {
            return Err(StretchError::StreamClosed);
        }
        warn!(
            "stretch cancelled after {} output frames",
            self.output_frames()
        );
        Ok(self.take_outcome(true))
    }

    fn process_frame(&mut self, frame: &Frame) -> Result<(), StretchError> {
        let spectrum = self.analyzer.analyze(frame);
        if let Some(denoiser) = &self.denoiser {
            let clean = denoiser.denoise(&spectrum)?.with_index(self.streamed);
            self.streamed += 1;
            for out in self.interpolator.push(clean)? {
                self.synthesizer.add(&out)?;
            }
        } else if let Some(profile) = self.estimator.push(&spectrum)? {
            debug!("calibration complete at input frame {}", frame.index());
            self.denoiser = Some(SpectralDenoiser::new(profile));
            self.state = PipelineState::Streaming;
        } else {
            trace!("calibration frame {}", frame.index());
        }
        Ok(())
    }

    fn take_outcome(&mut self, cancelled: bool) -> StretchOutcome {
        self.state = PipelineState::Done;
        let accumulator = self.synthesizer.take_accumulator();
        let output = self.normalizer.normalize(&accumulator.compensated());
        StretchOutcome {
            accumulator,
            output,
            noise_profile: self.noise_profile().cloned(),
            cancelled,
        }
    }
}

impl<T: SpectralTransform> std::fmt::Debug for StreamProcessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamProcessor")
            .field("params", &self.params)
            .field("state", &self.state)
            .field("samples_seen", &self.samples_seen())
            .field("streamed", &self.streamed)
            .finish()
    }
}

/// Logs a warning when the window/hop pair does not overlap-add to a constant.
pub(crate) fn warn_if_not_cola(window: &WindowTable, hop_size: usize) {
    let energy = window.overlap_energy(hop_size);
    if energy.ripple() > COLA_TOLERANCE {
        warn!(
            "window of {} samples with hop {} is not constant overlap-add \
             (energy {:.4}..{:.4}); output relies on energy compensation",
            window.len(),
            hop_size,
            energy.min,
            energy.max
        );
    }
}
