//! Phase vocoder time-stretch interpolation.
//!
//! Output frames are spaced at the same hop as input frames, so stretching by
//! `s` produces `round(n * s)` output frames for `n` input frames. Output frame
//! `i` reads the fractional input position `pos = i / s`:
//!
//! * magnitude is interpolated linearly between frames `floor(pos)` and
//!   `ceil(pos)`;
//! * every bin's phase accumulator advances by the wrapped phase difference
//!   between input frames `ceil(pos) - 1` and `ceil(pos)`, and the
//!   accumulated (never re-wrapped) value is emitted.
//!
//! For fractional positions the advance is the `floor -> ceil` difference.
//! At integer positions it is the advance *into* the landed-on frame, which
//! makes a stretch factor of 1 reproduce the analysis phases exactly and
//! keeps the rule continuous as `pos` approaches an integer from below.
//!
//! Output frames whose `ceil(pos)` lies past the last input frame are
//! zero-filled and leave the accumulator untouched.

use log::{debug, trace, warn};
use std::collections::VecDeque;
use std::f32::consts::PI;

use crate::core::types::SpectralFrame;
use crate::error::StretchError;
use crate::stretch::phase_locking::{identity_lock, PhaseLocking};

const TWO_PI: f32 = 2.0 * PI;

/// Wraps a phase difference into `(-PI, PI]`.
#[inline]
pub fn wrap_phase(phase: f32) -> f32 {
    let wrapped = (phase + PI).rem_euclid(TWO_PI) - PI;
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

/// Fractional source position of one output frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePosition {
    pub lo: usize,
    pub hi: usize,
    pub frac: f32,
}

/// Relative distance from an integer below which a position is snapped onto it.
const POSITION_SNAP_TOLERANCE: f64 = 1e-9;

/// Maps output frame `index` to its input position for stretch factor `s`.
///
/// Positions within rounding error of an integer land exactly on it, so
/// `lo == hi` and `frac == 0` there.
#[inline]
pub fn source_position(index: usize, stretch_factor: f64) -> SourcePosition {
    let raw = index as f64 / stretch_factor;
    let nearest = raw.round();
    let pos = if (raw - nearest).abs() <= POSITION_SNAP_TOLERANCE * raw.max(1.0) {
        nearest
    } else {
        raw
    };
    let lo = pos.floor();
    SourcePosition {
        lo: lo as usize,
        hi: pos.ceil() as usize,
        frac: (pos - lo) as f32,
    }
}

/// Output frame count for `num_input_frames` inputs: `round(n * s)`, at least
/// one whenever there is any input.
#[inline]
pub fn output_frame_count(num_input_frames: usize, stretch_factor: f64) -> usize {
    if num_input_frames == 0 {
        return 0;
    }
    ((num_input_frames as f64 * stretch_factor).round() as usize).max(1)
}

/// Streaming phase vocoder interpolator.
///
/// Owns the per-bin phase accumulator for the whole stretch operation. Input
/// frames must arrive with contiguous indices starting at 0; each push emits
/// every output frame that has become computable, and [`finish`](Self::finish)
/// emits the rest.
#[derive(Debug, Clone)]
pub struct PhaseVocoderInterpolator {
    stretch_factor: f64,
    num_bins: usize,
    locking: PhaseLocking,
    /// Input frames still reachable by future output frames.
    pending: VecDeque<SpectralFrame>,
    /// Input index of `pending[0]`.
    base: usize,
    received: usize,
    next_output: usize,
    phase_acc: Vec<f32>,
    peaks: Vec<usize>,
    zero_filled: usize,
    finished: bool,
}

impl PhaseVocoderInterpolator {
    /// # Errors
    /// Returns `StretchError::InvalidConfiguration` if the stretch factor is
    /// not positive and finite or `num_bins` is 0.
    pub fn new(
        num_bins: usize,
        stretch_factor: f64,
        locking: PhaseLocking,
    ) -> Result<Self, StretchError> {
        if !stretch_factor.is_finite() || stretch_factor <= 0.0 {
            return Err(StretchError::InvalidConfiguration(format!(
                "stretch factor {} must be positive and finite",
                stretch_factor
            )));
        }
        if num_bins == 0 {
            return Err(StretchError::InvalidConfiguration(
                "spectra must have at least one bin".to_string(),
            ));
        }
        Ok(Self {
            stretch_factor,
            num_bins,
            locking,
            pending: VecDeque::new(),
            base: 0,
            received: 0,
            next_output: 0,
            phase_acc: vec![0.0; num_bins],
            peaks: Vec::with_capacity(num_bins / 4),
            zero_filled: 0,
            finished: false,
        })
    }

    #[inline]
    pub fn stretch_factor(&self) -> f64 {
        self.stretch_factor
    }

    /// Input frames pushed so far.
    #[inline]
    pub fn received(&self) -> usize {
        self.received
    }

    /// Output frames emitted so far.
    #[inline]
    pub fn emitted(&self) -> usize {
        self.next_output
    }

    /// Output frames emitted as silence because their source lay past the input.
    #[inline]
    pub fn zero_filled(&self) -> usize {
        self.zero_filled
    }

    /// Current per-bin accumulated phase.
    #[inline]
    pub fn phase_accumulator(&self) -> &[f32] {
        &self.phase_acc
    }

    /// Adds the next input frame and returns the output frames it unlocks.
    ///
    /// # Errors
    /// Returns `StretchError::OutOfOrderFrame` if the frame index is not the
    /// next in sequence, `StretchError::InvalidInput` on a bin-count
    /// mismatch, and `StretchError::StreamClosed` after `finish`.
    pub fn push(&mut self, frame: SpectralFrame) -> Result<Vec<SpectralFrame>, StretchError> {
        if self.finished {
            return Err(StretchError::StreamClosed);
        }
        if frame.index() != self.received {
            return Err(StretchError::OutOfOrderFrame {
                expected: self.received,
                got: frame.index(),
            });
        }
        if frame.num_bins() != self.num_bins {
            return Err(StretchError::InvalidInput(format!(
                "frame has {} bins, expected {}",
                frame.num_bins(),
                self.num_bins
            )));
        }
        self.pending.push_back(frame);
        self.received += 1;

        // Never run ahead of round(received * s): the final count is only
        // known at the end, and it can only grow from here.
        let safe_count = output_frame_count(self.received, self.stretch_factor);
        let mut out = Vec::new();
        while self.next_output < safe_count {
            let position = source_position(self.next_output, self.stretch_factor);
            if position.hi >= self.received {
                break;
            }
            out.push(self.emit(position));
        }
        self.prune();
        Ok(out)
    }

    /// Emits the remaining output frames, zero-filling those whose source
    /// position lies past the last input frame.
    pub fn finish(&mut self) -> Vec<SpectralFrame> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let total = output_frame_count(self.received, self.stretch_factor);
        let mut out = Vec::with_capacity(total.saturating_sub(self.next_output));
        while self.next_output < total {
            let position = source_position(self.next_output, self.stretch_factor);
            out.push(self.emit(position));
        }
        self.pending.clear();
        if self.zero_filled > 0 {
            warn!(
                "{} tail frame(s) beyond the last input frame were zero-filled",
                self.zero_filled
            );
        }
        debug!(
            "interpolated {} input frames into {} output frames",
            self.received, self.next_output
        );
        out
    }

    fn frame_at(&self, input_index: usize) -> &SpectralFrame {
        &self.pending[input_index - self.base]
    }

    fn emit(&mut self, position: SourcePosition) -> SpectralFrame {
        let index = self.next_output;
        self.next_output += 1;

        if index == 0 {
            let seed = self.frame_at(0).reindexed(0);
            self.phase_acc.copy_from_slice(seed.phase());
            trace!("output frame 0 seeded from input frame 0");
            return seed;
        }

        if position.hi >= self.received {
            self.zero_filled += 1;
            trace!("output frame {} zero-filled", index);
            return SpectralFrame::silent(index, self.num_bins);
        }

        let frac = position.frac;
        let base = self.base;
        let lo = &self.pending[position.lo - base];
        let hi = &self.pending[position.hi - base];
        let prev = &self.pending[position.hi - 1 - base];

        let magnitude: Vec<f32> = lo
            .magnitude()
            .iter()
            .zip(hi.magnitude().iter())
            .map(|(&a, &b)| ((1.0 - frac) * a + frac * b).max(0.0))
            .collect();

        for ((acc, &to), &from) in self
            .phase_acc
            .iter_mut()
            .zip(hi.phase().iter())
            .zip(prev.phase().iter())
        {
            *acc += wrap_phase(to - from);
        }

        let mut phase = self.phase_acc.clone();
        if self.locking == PhaseLocking::Identity {
            let nearer = if frac < 0.5 { lo } else { hi };
            let half = (self.num_bins / 2 + 1).min(self.num_bins);
            identity_lock(&magnitude, nearer.phase(), &mut phase, half, &mut self.peaks);
        }

        trace!(
            "output frame {} from input {}..={} (frac {:.3})",
            index,
            position.lo,
            position.hi,
            frac
        );
        SpectralFrame::from_parts(index, magnitude, phase)
    }

    /// Drops input frames that no future output frame can reach.
    fn prune(&mut self) {
        let keep_from = if self.next_output == 0 {
            0
        } else {
            source_position(self.next_output, self.stretch_factor)
                .hi
                .saturating_sub(1)
        };
        while self.base < keep_from && !self.pending.is_empty() {
            self.pending.pop_front();
            self.base += 1;
        }
    }
}

/// Interpolates a complete, in-order sequence of spectra.
///
/// # Errors
/// Propagates the interpolator's construction and ordering errors.
pub fn interpolate_all(
    frames: &[SpectralFrame],
    stretch_factor: f64,
    locking: PhaseLocking,
) -> Result<Vec<SpectralFrame>, StretchError> {
    let Some(first) = frames.first() else {
        return Ok(Vec::new());
    };
    let mut interpolator =
        PhaseVocoderInterpolator::new(first.num_bins(), stretch_factor, locking)?;
    let mut out = Vec::new();
    for (i, frame) in frames.iter().enumerate() {
        out.extend(interpolator.push(frame.reindexed(i))?);
    }
    out.extend(interpolator.finish());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize, mags: &[f32], phases: &[f32]) -> SpectralFrame {
        SpectralFrame::from_polar(index, mags.to_vec(), phases.to_vec()).unwrap()
    }

    /// A single-bin tone advancing by `step` radians per frame.
    fn tone(n: usize, step: f32) -> Vec<SpectralFrame> {
        (0..n)
            .map(|i| frame(i, &[1.0 + i as f32], &[wrap_phase(step * i as f32)]))
            .collect()
    }

    #[test]
    fn test_wrap_phase() {
        assert!((wrap_phase(0.0) - 0.0).abs() < 1e-6);
        assert!((wrap_phase(PI + 0.1) - (-PI + 0.1)).abs() < 1e-5);
        assert!((wrap_phase(-PI - 0.1) - (PI - 0.1)).abs() < 1e-5);
        assert_eq!(wrap_phase(PI), PI);
        assert_eq!(wrap_phase(-PI), PI);
        assert!((wrap_phase(10.0 * PI + 0.5) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_wrap_phase_bound() {
        for k in -2000..=2000 {
            let d = k as f32 * 0.01 * PI;
            let w = wrap_phase(d);
            assert!(w > -PI && w <= PI, "wrap({}) = {}", d, w);
            let cycles = (d - w) / TWO_PI;
            assert!((cycles - cycles.round()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_source_position() {
        assert_eq!(
            source_position(3, 2.0),
            SourcePosition {
                lo: 1,
                hi: 2,
                frac: 0.5
            }
        );
        let p = source_position(4, 1.0);
        assert_eq!((p.lo, p.hi), (4, 4));
        assert_eq!(p.frac, 0.0);
    }

    #[test]
    fn test_source_position_snaps_to_integers() {
        // 21 / 0.7 evaluates to 30.000000000000004.
        let p = source_position(21, 0.7);
        assert_eq!((p.lo, p.hi), (30, 30));
        assert_eq!(p.frac, 0.0);
        for s in [0.3, 0.7, 1.1, 1.3, 2.9] {
            for k in 1..200usize {
                let index = (k as f64 * s).round() as usize;
                let p = source_position(index, s);
                if (index as f64 - k as f64 * s).abs() < 1e-12 {
                    assert_eq!((p.lo, p.hi), (k, k), "index {} at s = {}", index, s);
                }
                assert!(p.hi - p.lo <= 1);
            }
        }
    }

    #[test]
    fn test_compression_zero_fills_only_past_last_frame() {
        // s = p / q, so the exact source position of output i is i * q / p.
        for (p, q) in [(7usize, 10usize), (3, 10), (1, 2), (1, 3), (11, 20), (9, 10), (999, 1000)] {
            let s = p as f64 / q as f64;
            for n in 1..64 {
                let mut interp = PhaseVocoderInterpolator::new(1, s, PhaseLocking::Off).unwrap();
                let mut out = Vec::new();
                for f in tone(n, 0.4) {
                    out.extend(interp.push(f).unwrap());
                }
                out.extend(interp.finish());
                let count = output_frame_count(n, s);
                assert_eq!(out.len(), count);

                let past_end = (1..count).filter(|&i| (i * q).div_ceil(p) >= n).count();
                assert_eq!(interp.zero_filled(), past_end, "n = {}, s = {}", n, s);
                if p * 2 <= q {
                    assert_eq!(interp.zero_filled(), 0, "n = {}, s = {}", n, s);
                }
            }
        }

        // Output 21 sits exactly on the last of 31 inputs.
        let out = interpolate_all(&tone(31, 0.4), 0.7, PhaseLocking::Off).unwrap();
        assert_eq!(out.len(), 22);
        assert!(out.iter().all(|f| f.magnitude()[0] > 0.0));
    }

    #[test]
    fn test_integer_position_advances_into_landed_frame() {
        // Uneven per-frame phase steps, so each advance is distinguishable.
        let phase = |i: usize| wrap_phase(0.1 * (i * i) as f32);
        let input: Vec<SpectralFrame> = (0..40)
            .map(|i| frame(i, &[1.0 + i as f32], &[phase(i)]))
            .collect();
        let out = interpolate_all(&input, 0.7, PhaseLocking::Off).unwrap();
        // Output 21 lands on input 30; the advance is 29 -> 30, not 30 -> 31.
        assert_eq!(out[21].magnitude(), input[30].magnitude());
        let advance = out[21].phase()[0] - out[20].phase()[0];
        let expected = wrap_phase(phase(30) - phase(29));
        assert!(
            (advance - expected).abs() < 1e-3,
            "advance {} expected {}",
            advance,
            expected
        );
    }

    #[test]
    fn test_output_frame_count() {
        assert_eq!(output_frame_count(10, 1.0), 10);
        assert_eq!(output_frame_count(10, 1.5), 15);
        assert_eq!(output_frame_count(3, 0.5), 2);
        assert_eq!(output_frame_count(1, 0.1), 1);
        assert_eq!(output_frame_count(0, 2.0), 0);
    }

    #[test]
    fn test_identity_reproduces_input() {
        let input = tone(6, 2.5);
        let out = interpolate_all(&input, 1.0, PhaseLocking::Off).unwrap();
        assert_eq!(out.len(), 6);
        for (o, i) in out.iter().zip(input.iter()) {
            assert_eq!(o.index(), i.index());
            assert_eq!(o.magnitude(), i.magnitude());
            assert!((wrap_phase(o.phase()[0] - i.phase()[0])).abs() < 1e-4);
        }
    }

    #[test]
    fn test_phase_accumulates_unwrapped() {
        let step = 2.5;
        let out = interpolate_all(&tone(5, step), 1.0, PhaseLocking::Off).unwrap();
        // Never re-wrapped: frame 4 sits at 4 * 2.5 = 10 rad.
        assert!((out[4].phase()[0] - 4.0 * step).abs() < 1e-4);
    }

    #[test]
    fn test_double_stretch_interpolates_magnitude() {
        let input = tone(4, 1.0);
        let out = interpolate_all(&input, 2.0, PhaseLocking::Off).unwrap();
        assert_eq!(out.len(), 8);
        // Output 1 sits halfway between inputs 0 and 1.
        assert!((out[1].magnitude()[0] - 1.5).abs() < 1e-6);
        assert!((out[2].magnitude()[0] - 2.0).abs() < 1e-6);
        // One input hop of phase advance per output frame.
        for i in 1..7 {
            let d = out[i].phase()[0] - out[i - 1].phase()[0];
            assert!((d - 1.0).abs() < 1e-5, "frame {} advance {}", i, d);
        }
        // pos = 3.5 lies past the last input frame.
        assert!(out[7].magnitude().iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_zero_fill_holds_accumulator() {
        let mut interp = PhaseVocoderInterpolator::new(1, 2.0, PhaseLocking::Off).unwrap();
        for f in tone(2, 0.75) {
            interp.push(f).unwrap();
        }
        let before = interp.phase_accumulator().to_vec();
        let tail = interp.finish();
        assert_eq!(interp.emitted(), 4);
        assert_eq!(interp.zero_filled(), 1);
        assert_eq!(tail.last().unwrap().magnitude(), &[0.0]);
        assert_eq!(interp.phase_accumulator(), before.as_slice());
        // Outputs 1 (pos 0.5) and 2 (pos 1.0) each advanced by one input hop.
        assert!((before[0] - 0.75 * 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_compression_skips_frames() {
        let input = tone(8, 0.5);
        let out = interpolate_all(&input, 0.5, PhaseLocking::Off).unwrap();
        assert_eq!(out.len(), 4);
        for (i, o) in out.iter().enumerate() {
            assert!((o.magnitude()[0] - (1.0 + 2.0 * i as f32)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_streaming_never_overshoots_final_count() {
        // n = 11, s = 0.2 -> round(2.2) = 2 frames, though pos 2.0 < 11.
        let mut interp = PhaseVocoderInterpolator::new(1, 0.2, PhaseLocking::Off).unwrap();
        let mut total = 0;
        for f in tone(11, 0.1) {
            total += interp.push(f).unwrap().len();
        }
        total += interp.finish().len();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_streaming_matches_batch() {
        let input = tone(20, 1.3);
        let batch = interpolate_all(&input, 1.37, PhaseLocking::Off).unwrap();

        let mut interp = PhaseVocoderInterpolator::new(1, 1.37, PhaseLocking::Off).unwrap();
        let mut streamed = Vec::new();
        for f in input {
            streamed.extend(interp.push(f).unwrap());
        }
        streamed.extend(interp.finish());
        assert_eq!(streamed, batch);
        for (i, f) in streamed.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn test_rejects_out_of_order() {
        let mut interp = PhaseVocoderInterpolator::new(1, 1.0, PhaseLocking::Off).unwrap();
        interp.push(frame(0, &[1.0], &[0.0])).unwrap();
        assert_eq!(
            interp.push(frame(2, &[1.0], &[0.0])),
            Err(StretchError::OutOfOrderFrame {
                expected: 1,
                got: 2
            })
        );
        assert!(interp.push(frame(1, &[1.0, 2.0], &[0.0, 0.0])).is_err());
    }

    #[test]
    fn test_invalid_factor() {
        assert!(PhaseVocoderInterpolator::new(4, 0.0, PhaseLocking::Off).is_err());
        assert!(PhaseVocoderInterpolator::new(4, -1.0, PhaseLocking::Off).is_err());
        assert!(PhaseVocoderInterpolator::new(0, 1.0, PhaseLocking::Off).is_err());
    }

    #[test]
    fn test_identity_locking_keeps_identity_stretch() {
        let input: Vec<SpectralFrame> = (0..5)
            .map(|i| {
                let t = i as f32;
                frame(
                    i,
                    &[0.1, 1.0, 0.2, 0.6, 0.1, 0.0, 0.0, 0.0],
                    &[
                        wrap_phase(0.3 * t),
                        wrap_phase(1.1 * t),
                        wrap_phase(1.2 * t + 0.4),
                        wrap_phase(2.0 * t),
                        wrap_phase(2.2 * t - 1.0),
                        0.0,
                        0.0,
                        0.0,
                    ],
                )
            })
            .collect();
        let out = interpolate_all(&input, 1.0, PhaseLocking::Identity).unwrap();
        for (o, i) in out.iter().zip(input.iter()) {
            for bin in 0..5 {
                let d = wrap_phase(o.phase()[bin] - i.phase()[bin]);
                assert!(d.abs() < 1e-4, "bin {} drifted by {}", bin, d);
            }
        }
    }
}
