#![allow(dead_code)]

use std::f32::consts::PI;

use quietstretch::{Calibration, VocoderConfig};

pub fn gen_sine<F>(freq_hz: f32, sr: u32, n: usize, amp_fn: F) -> Vec<f32>
where
    F: Fn(usize) -> f32,
{
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * freq_hz * i as f32 / sr as f32;
            amp_fn(i) * phase.sin()
        })
        .collect()
}

/// Deterministic uniform noise in `[-amp, amp)`.
pub fn gen_noise(seed: u32, n: usize, amp: f32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let unit = (state >> 8) as f32 / (1u32 << 24) as f32;
            amp * (2.0 * unit - 1.0)
        })
        .collect()
}

pub fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b.iter()).map(|(x, y)| x + y).collect()
}

pub fn rms(signal: &[f32]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = signal.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / signal.len() as f64).sqrt()
}

pub fn peak(signal: &[f32]) -> f32 {
    signal.iter().fold(0.0f32, |m, &x| m.max(x.abs()))
}

pub fn count_positive_zero_crossings(signal: &[f32], start: usize, end: usize) -> usize {
    if signal.len() < 2 {
        return 0;
    }
    let start = start.min(signal.len() - 1);
    let end = end.min(signal.len());
    (start + 1..end)
        .filter(|&i| signal[i - 1] <= 0.0 && signal[i] > 0.0)
        .count()
}

/// Frequency estimate from positive zero crossings in `[start, end)`.
pub fn zero_crossing_freq(signal: &[f32], sr: u32, start: usize, end: usize) -> f32 {
    let end = end.min(signal.len());
    if end <= start + 1 {
        return 0.0;
    }
    let crossings = count_positive_zero_crossings(signal, start, end);
    crossings as f32 * sr as f32 / (end - start) as f32
}

/// A small, fast configuration for tests.
pub fn small_config(stretch: f64, calibration_frames: usize) -> VocoderConfig {
    VocoderConfig::new(stretch)
        .unwrap()
        .with_frame_size(512)
        .with_hop_size(128)
        .with_calibration(Calibration::Frames(calibration_frames))
}

/// `(numOutputFrames - 1) * hop + frame` for `streamed` post-calibration frames.
pub fn expected_len(streamed: usize, stretch: f64, frame: usize, hop: usize) -> usize {
    let out_frames = ((streamed as f64 * stretch).round() as usize).max(1);
    (out_frames - 1) * hop + frame
}
