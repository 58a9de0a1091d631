//! Threaded form of the pipeline: one worker per stage, joined by bounded
//! FIFO queues.
//!
//! ```text
//! samples ─▶ [segment + analyze] ─▶ [calibrate / denoise] ─▶ [interpolate] ─▶ [inverse + overlap-add]
//! ```
//!
//! Each queue holds at most `queue_capacity` frames, so a slow stage blocks
//! the stages feeding it. Frames travel in index order and each stage owns
//! its state exclusively: the noise profile lives in the denoise stage and
//! the phase accumulator in the interpolate stage.

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};

use crate::analysis::segmenter::FrameSegmenter;
use crate::analysis::spectrum::SpectralAnalyzer;
use crate::core::config::VocoderConfig;
use crate::core::fft::{RustFftTransform, SpectralTransform};
use crate::core::types::{Sample, SpectralFrame};
use crate::core::window::WindowTable;
use crate::denoise::{NoiseProfile, NoiseProfileEstimator, SpectralDenoiser};
use crate::error::StretchError;
use crate::stream::processor::{warn_if_not_cola, StretchOutcome};
use crate::stretch::interpolator::PhaseVocoderInterpolator;
use crate::stretch::normalize::Normalizer;
use crate::stretch::overlap_add::{OutputAccumulator, OverlapAddSynthesizer};
use crate::stretch::params::AlgorithmParams;

/// Shared flag that asks every stage of a running pipeline to stop.
///
/// Once set it stays set; a cancelled pipeline returns immediately from
/// later runs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Runs the calibrate → denoise → stretch → resynthesize chain with each
/// stage on its own thread.
///
/// For the same input and configuration the result is identical to
/// [`StreamProcessor`](crate::stream::StreamProcessor).
pub struct StagedPipeline<T: SpectralTransform = RustFftTransform> {
    params: AlgorithmParams,
    window: WindowTable,
    transform: T,
    cancel: CancelToken,
}

impl StagedPipeline<RustFftTransform> {
    /// # Errors
    /// Returns `StretchError::InvalidConfiguration` if the config is invalid.
    pub fn new(config: &VocoderConfig) -> Result<Self, StretchError> {
        let transform = RustFftTransform::new(config.frame_size);
        Self::with_transform(config, transform)
    }
}

impl<T: SpectralTransform + Clone> StagedPipeline<T> {
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
        Ok(Self {
            params,
            window,
            transform,
            cancel: CancelToken::new(),
        })
    }

    #[inline]
    pub fn params(&self) -> &AlgorithmParams {
        &self.params
    }

    /// A handle that cancels this pipeline from any thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Processes a complete input buffer.
    ///
    /// # Errors
    /// See [`run_chunks`](Self::run_chunks).
    pub fn run(&self, input: &[Sample]) -> Result<StretchOutcome, StretchError> {
        let chunk = self.params.hop_size.max(1) * self.params.queue_capacity.max(1);
        self.run_chunks(input.chunks(chunk))
    }

    /// Processes the concatenation of `chunks`, pulled lazily by the analysis
    /// stage.
    ///
    /// On cancellation the synthesis stage's partial accumulator is returned
    /// with `cancelled` set.
    ///
    /// # Errors
    /// The error of the earliest failing stage: `NonFiniteInput`,
    /// `InsufficientSamples`, or `StageFailed` if a worker panicked.
    pub fn run_chunks<'a, I>(&self, chunks: I) -> Result<StretchOutcome, StretchError>
    where
        I: IntoIterator<Item = &'a [Sample]>,
        I::IntoIter: Send,
    {
        let params = &self.params;
        let cancel = &self.cancel;
        let capacity = params.queue_capacity;

        let segmenter = FrameSegmenter::new(params.frame_size, params.hop_size)?;
        let analyzer = SpectralAnalyzer::new(self.window.clone(), self.transform.clone());
        let estimator = NoiseProfileEstimator::new(params.calibration_frames, params.frame_size);
        let interpolator = PhaseVocoderInterpolator::new(
            params.frame_size,
            params.stretch_factor,
            params.phase_locking,
        )?;
        let synthesizer =
            OverlapAddSynthesizer::new(self.window.clone(), self.transform.clone(), params.hop_size);
        let normalizer = Normalizer::new(params.normalization_target)?;

        let (spectra_tx, spectra_rx) = bounded::<SpectralFrame>(capacity);
        let (clean_tx, clean_rx) = bounded::<SpectralFrame>(capacity);
        let (output_tx, output_rx) = bounded::<SpectralFrame>(capacity);
        let chunks = chunks.into_iter();
        debug!("starting staged pipeline (queue capacity {})", capacity);

        let (analysis, calibration, interpolation, synthesis) = thread::scope(|scope| {
            let analysis = scope.spawn(move || {
                analysis_stage(chunks, segmenter, analyzer, spectra_tx, cancel)
            });
            let calibration =
                scope.spawn(move || denoise_stage(spectra_rx, clean_tx, estimator, cancel));
            let interpolation =
                scope.spawn(move || interpolate_stage(clean_rx, output_tx, interpolator, cancel));
            let synthesis = scope.spawn(move || synthesis_stage(output_rx, synthesizer, cancel));
            (
                join_stage(analysis, "analysis"),
                join_stage(calibration, "denoise"),
                join_stage(interpolation, "interpolation"),
                join_stage(synthesis, "synthesis"),
            )
        });

        let samples_seen = analysis?;
        let calibration = calibration?;
        interpolation?;
        let accumulator = synthesis?;

        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!(
                "staged pipeline cancelled after {} output frames",
                accumulator.num_frames()
            );
        } else if calibration.profile.is_none() || calibration.streamed == 0 {
            return Err(StretchError::InsufficientSamples {
                provided: samples_seen,
                minimum: params.minimum_input_len(),
            });
        }

        let output = normalizer.normalize(&accumulator.compensated());
        if !cancelled {
            info!(
                "stretched {} samples into {} (staged, factor {})",
                samples_seen,
                output.len(),
                params.stretch_factor
            );
        }
        Ok(StretchOutcome {
            accumulator,
            output,
            noise_profile: calibration.profile,
            cancelled,
        })
    }
}

impl<T: SpectralTransform> std::fmt::Debug for StagedPipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedPipeline")
            .field("params", &self.params)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

struct CalibrationReport {
    profile: Option<NoiseProfile>,
    streamed: usize,
}

/// Frames and analyzes the input. Returns the number of samples consumed.
fn analysis_stage<'a, T: SpectralTransform>(
    chunks: impl Iterator<Item = &'a [Sample]>,
    mut segmenter: FrameSegmenter,
    mut analyzer: SpectralAnalyzer<T>,
    tx: Sender<SpectralFrame>,
    cancel: &CancelToken,
) -> Result<usize, StretchError> {
    for chunk in chunks {
        if cancel.is_cancelled() {
            return Ok(segmenter.samples_seen());
        }
        if chunk.iter().any(|s| !s.is_finite()) {
            return Err(StretchError::NonFiniteInput);
        }
        for frame in segmenter.push(chunk)? {
            if tx.send(analyzer.analyze(&frame)).is_err() {
                // Downstream stopped; its result decides the outcome.
                return Ok(segmenter.samples_seen());
            }
        }
    }
    segmenter.finish()?;
    Ok(segmenter.samples_seen())
}

/// Feeds the first K spectra to the estimator, then denoises and re-indexes
/// the rest.
fn denoise_stage(
    rx: Receiver<SpectralFrame>,
    tx: Sender<SpectralFrame>,
    mut estimator: NoiseProfileEstimator,
    cancel: &CancelToken,
) -> Result<CalibrationReport, StretchError> {
    let mut denoiser = estimator.profile().cloned().map(SpectralDenoiser::new);
    let mut streamed = 0;
    for spectrum in rx.iter() {
        if cancel.is_cancelled() {
            break;
        }
        if let Some(active) = &denoiser {
            let clean = active.denoise(&spectrum)?.with_index(streamed);
            streamed += 1;
            if tx.send(clean).is_err() {
                break;
            }
        } else if let Some(profile) = estimator.push(&spectrum)? {
            denoiser = Some(SpectralDenoiser::new(profile));
        }
    }
    Ok(CalibrationReport {
        profile: denoiser.map(|d| d.profile().clone()),
        streamed,
    })
}

fn interpolate_stage(
    rx: Receiver<SpectralFrame>,
    tx: Sender<SpectralFrame>,
    mut interpolator: PhaseVocoderInterpolator,
    cancel: &CancelToken,
) -> Result<(), StretchError> {
    for frame in rx.iter() {
        if cancel.is_cancelled() {
            return Ok(());
        }
        for out in interpolator.push(frame)? {
            if tx.send(out).is_err() {
                return Ok(());
            }
        }
    }
    if cancel.is_cancelled() {
        return Ok(());
    }
    for out in interpolator.finish() {
        if tx.send(out).is_err() {
            break;
        }
    }
    Ok(())
}

fn synthesis_stage<T: SpectralTransform>(
    rx: Receiver<SpectralFrame>,
    mut synthesizer: OverlapAddSynthesizer<T>,
    cancel: &CancelToken,
) -> Result<OutputAccumulator, StretchError> {
    for frame in rx.iter() {
        if cancel.is_cancelled() {
            break;
        }
        synthesizer.add(&frame)?;
    }
    Ok(synthesizer.into_accumulator())
}

/// Waits for a stage, converting a panic into `StageFailed`.
fn join_stage<R>(
    handle: ScopedJoinHandle<'_, Result<R, StretchError>>,
    stage: &str,
) -> Result<R, StretchError> {
    match handle.join() {
        Ok(result) => result,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(StretchError::StageFailed(format!(
                "{} stage panicked: {}",
                stage, reason
            )))
        }
    }
}
