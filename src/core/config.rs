//! User-facing configuration.

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::window::WindowType;
use crate::error::StretchError;
use crate::stretch::phase_locking::PhaseLocking;

/// How much of the stream start is used to learn the noise spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Calibration {
    /// Enough frames to cover this many seconds of input.
    Duration(f64),
    /// An explicit frame count `K`; 0 disables noise subtraction.
    Frames(usize),
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration::Duration(DEFAULT_CALIBRATION_SECS)
    }
}

/// Default calibration span in seconds.
pub const DEFAULT_CALIBRATION_SECS: f64 = 0.5;

/// Tuned frame/hop/calibration combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// 1024-sample frames, quarter hop; good time resolution for voice.
    Speech,
    /// 4096-sample frames, quarter hop; fine frequency resolution for tonal material.
    Music,
    /// 512-sample frames and a short calibration span.
    LowLatency,
}

/// Parameters controlling denoising and stretching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocoderConfig {
    /// Output duration / input duration: >1.0 slows down, <1.0 speeds up.
    pub stretch_factor: f64,
    /// Sample rate in Hz (default: 44100).
    pub sample_rate: u32,
    /// Transform block size W (default: 2048).
    pub frame_size: usize,
    /// Hop size H (default: frame_size / 4).
    pub hop_size: Option<usize>,
    /// Noise calibration span (default: 0.5 s).
    pub calibration: Calibration,
    /// Peak ceiling for the normalized output (default: 1.0).
    pub normalization_target: f32,
    /// Analysis/synthesis window shape (default: Hann).
    pub window: WindowType,
    /// Optional phase locking on top of per-bin accumulation.
    pub phase_locking: PhaseLocking,
    /// Bounded queue depth between pipeline stages (default: 8).
    pub queue_capacity: usize,
    /// Preset last applied by [`with_preset`](Self::with_preset). When loading
    /// JSON its sizes are applied before the document's explicit fields.
    pub preset: Option<Preset>,
}

impl Default for VocoderConfig {
    fn default() -> Self {
        Self {
            stretch_factor: 1.0,
            sample_rate: 44100,
            frame_size: 2048,
            hop_size: None,
            calibration: Calibration::default(),
            normalization_target: 1.0,
            window: WindowType::Hann,
            phase_locking: PhaseLocking::Off,
            queue_capacity: 8,
            preset: None,
        }
    }
}

impl VocoderConfig {
    /// Creates a configuration with the given stretch factor.
    ///
    /// # Errors
    /// Returns `StretchError::InvalidConfiguration` if the factor is not
    /// positive and finite.
    pub fn new(stretch_factor: f64) -> Result<Self, StretchError> {
        check_stretch_factor(stretch_factor)?;
        Ok(Self {
            stretch_factor,
            ..Self::default()
        })
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = Some(preset);
        match preset {
            Preset::Speech => {
                self.frame_size = 1024;
                self.hop_size = Some(256);
            }
            Preset::Music => {
                self.frame_size = 4096;
                self.hop_size = Some(1024);
            }
            Preset::LowLatency => {
                self.frame_size = 512;
                self.hop_size = Some(128);
                self.calibration = Calibration::Duration(0.25);
            }
        }
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_hop_size(mut self, hop_size: usize) -> Self {
        self.hop_size = Some(hop_size);
        self
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn with_normalization_target(mut self, target: f32) -> Self {
        self.normalization_target = target;
        self
    }

    pub fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }

    pub fn with_phase_locking(mut self, phase_locking: PhaseLocking) -> Self {
        self.phase_locking = phase_locking;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Get the effective hop size.
    pub fn effective_hop_size(&self) -> usize {
        self.hop_size.unwrap_or(self.frame_size / 4)
    }

    /// Validate all parameters.
    pub fn validate(&self) -> Result<(), StretchError> {
        check_stretch_factor(self.stretch_factor)?;
        if self.frame_size == 0 {
            return Err(invalid("frame size must be greater than 0".to_string()));
        }
        let hop = self.effective_hop_size();
        if hop == 0 || hop > self.frame_size {
            return Err(invalid(format!(
                "hop size {} must be in 1..={}",
                hop, self.frame_size
            )));
        }
        if self.sample_rate == 0 {
            return Err(invalid("sample rate must be greater than 0".to_string()));
        }
        if !self.normalization_target.is_finite() || self.normalization_target <= 0.0 {
            return Err(invalid(format!(
                "normalization target {} must be positive and finite",
                self.normalization_target
            )));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue capacity must be at least 1".to_string()));
        }
        if let Calibration::Duration(secs) = self.calibration {
            if !secs.is_finite() || secs < 0.0 {
                return Err(invalid(format!(
                    "calibration duration {} must be a non-negative number of seconds",
                    secs
                )));
            }
        }
        Ok(())
    }

    /// Parses a JSON configuration.
    ///
    /// A `preset` entry is applied first; every other field present in the
    /// document overrides it, and missing fields take the preset's or the
    /// default values.
    pub fn from_json_str(json: &str) -> Result<Self, StretchError> {
        let document: serde_json::Value = serde_json::from_str(json)?;
        let Some(fields) = document.as_object() else {
            return Err(StretchError::Io(
                "configuration must be a JSON object".to_string(),
            ));
        };

        let base = match fields.get("preset") {
            Some(preset) => match serde_json::from_value::<Option<Preset>>(preset.clone())? {
                Some(preset) => Self::default().with_preset(preset),
                None => Self::default(),
            },
            None => Self::default(),
        };
        let mut merged = serde_json::to_value(base)?;
        if let Some(target) = merged.as_object_mut() {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }

        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration from a JSON file. See [`from_json_str`](Self::from_json_str).
    pub fn from_json_file(path: &Path) -> Result<Self, StretchError> {
        let data = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&data).map_err(|e| match e {
            StretchError::Io(msg) => StretchError::Io(format!(
                "failed to parse configuration from {}: {}",
                path.display(),
                msg
            )),
            other => other,
        })?;
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn write_json_file(&self, path: &Path) -> Result<(), StretchError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[inline]
fn invalid(msg: String) -> StretchError {
    StretchError::InvalidConfiguration(msg)
}

fn check_stretch_factor(stretch_factor: f64) -> Result<(), StretchError> {
    if !stretch_factor.is_finite() || stretch_factor <= 0.0 {
        return Err(invalid(format!(
            "stretch factor {} must be positive and finite",
            stretch_factor
        )));
    }
    Ok(())
}
