//! Window tables for analysis and synthesis.
//!
//! A [`WindowTable`] is built once per pipeline and shared read-only between
//! the analysis and synthesis stages.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;

use crate::error::StretchError;

/// Blackman-Harris window coefficients (4-term).
const BH_A0: f64 = 0.35875;
const BH_A1: f64 = 0.48829;
const BH_A2: f64 = 0.14128;
const BH_A3: f64 = 0.01168;

/// Window function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowType {
    #[default]
    Hann,
    BlackmanHarris,
}

/// Generates window coefficients of the given type and size.
pub fn generate_window(window_type: WindowType, size: usize) -> Vec<f32> {
    match size {
        0 => return vec![],
        1 => return vec![1.0],
        _ => {}
    }
    let denom = (size - 1) as f64;
    (0..size)
        .map(|i| {
            let x = i as f64 / denom;
            let w = match window_type {
                WindowType::Hann => 0.5 * (1.0 - (2.0 * PI * x).cos()),
                WindowType::BlackmanHarris => {
                    BH_A0 - BH_A1 * (2.0 * PI * x).cos() + BH_A2 * (4.0 * PI * x).cos()
                        - BH_A3 * (6.0 * PI * x).cos()
                }
            };
            // Rounding can leave the endpoints a hair below zero.
            w.max(0.0) as f32
        })
        .collect()
}

/// Min/max of the summed, hop-shifted squared window over one hop period.
///
/// Equal values mean the window/hop pair satisfies constant overlap-add.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapEnergy {
    pub min: f32,
    pub max: f32,
}

impl OverlapEnergy {
    /// Relative ripple `(max - min) / max`; zero for a perfect COLA pair.
    pub fn ripple(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.max - self.min) / self.max
    }
}

/// Immutable, precomputed window coefficients of length W.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTable {
    coefficients: Arc<[f32]>,
}

impl WindowTable {
    /// Builds a table for one of the standard window shapes.
    ///
    /// # Errors
    /// Returns `StretchError::InvalidConfiguration` if `size` is 0.
    pub fn new(window_type: WindowType, size: usize) -> Result<Self, StretchError> {
        if size == 0 {
            return Err(StretchError::InvalidConfiguration(
                "window size must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            coefficients: generate_window(window_type, size).into(),
        })
    }

    /// Builds a table from caller-supplied coefficients.
    ///
    /// # Errors
    /// Returns `StretchError::InvalidConfiguration` if the table is empty or
    /// any coefficient is negative or non-finite.
    pub fn from_coefficients(coefficients: Vec<f32>) -> Result<Self, StretchError> {
        if coefficients.is_empty() {
            return Err(StretchError::InvalidConfiguration(
                "window table is empty".to_string(),
            ));
        }
        if let Some(bad) = coefficients.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(StretchError::InvalidConfiguration(format!(
                "window coefficient {} is not a finite non-negative value",
                bad
            )));
        }
        Ok(Self {
            coefficients: coefficients.into(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    #[inline]
    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// Multiplies `data` by the window in place.
    #[inline]
    pub fn apply(&self, data: &mut [f32]) {
        for (sample, &w) in data.iter_mut().zip(self.coefficients.iter()) {
            *sample *= w;
        }
    }

    /// Returns a windowed copy of `data`.
    #[inline]
    pub fn apply_copy(&self, data: &[f32]) -> Vec<f32> {
        data.iter()
            .zip(self.coefficients.iter())
            .map(|(&d, &w)| d * w)
            .collect()
    }

    /// Sums the squared window shifted by multiples of `hop` and reports the
    /// extremes over one hop period of the steady-state region.
    pub fn overlap_energy(&self, hop: usize) -> OverlapEnergy {
        let size = self.len();
        if hop == 0 || size == 0 {
            return OverlapEnergy { min: 0.0, max: 0.0 };
        }
        let mut min = f32::MAX;
        let mut max = 0.0f32;
        for phase in 0..hop.min(size) {
            let sum: f32 = (phase..size)
                .step_by(hop)
                .map(|i| self.coefficients[i] * self.coefficients[i])
                .sum();
            min = min.min(sum);
            max = max.max(sum);
        }
        OverlapEnergy { min, max }
    }
}
