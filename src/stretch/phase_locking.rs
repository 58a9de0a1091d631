//! Optional identity phase locking (Laroche & Dolson 1999).

use serde::{Deserialize, Serialize};

/// Phase handling applied on top of per-bin phase accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseLocking {
    /// Every bin uses its own accumulated phase.
    #[default]
    Off,
    /// Non-peak bins keep their analysis phase offset from the nearest
    /// spectral peak, which is the only bin driven by the accumulator.
    Identity,
}

/// Collects local magnitude maxima in `1..num_bins - 1` into `peaks`.
fn find_peaks(magnitudes: &[f32], num_bins: usize, peaks: &mut Vec<usize>) {
    peaks.clear();
    for bin in 1..num_bins.saturating_sub(1) {
        if magnitudes[bin] > magnitudes[bin - 1] && magnitudes[bin] > magnitudes[bin + 1] {
            peaks.push(bin);
        }
    }
}

/// Locks the synthesis phase of every non-peak bin in `0..num_bins` to its
/// nearest peak: `synth[bin] = synth[peak] + (analysis[bin] - analysis[peak])`.
///
/// Leaves the phases untouched when fewer than three bins are given or no
/// peak exists.
pub fn identity_lock(
    magnitudes: &[f32],
    analysis_phases: &[f32],
    synthesis_phases: &mut [f32],
    num_bins: usize,
    peaks: &mut Vec<usize>,
) {
    if num_bins < 3 {
        return;
    }
    find_peaks(magnitudes, num_bins, peaks);
    if peaks.is_empty() {
        return;
    }

    let mut nearest = 0;
    for bin in 0..num_bins {
        while nearest + 1 < peaks.len() && peaks[nearest + 1].abs_diff(bin) < peaks[nearest].abs_diff(bin)
        {
            nearest += 1;
        }
        let peak = peaks[nearest];
        if bin != peak {
            synthesis_phases[bin] =
                synthesis_phases[peak] + (analysis_phases[bin] - analysis_phases[peak]);
        }
    }
}
