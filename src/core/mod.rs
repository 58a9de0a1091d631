//! Core types, configuration, window tables, and the spectral transform.

pub mod config;
pub mod fft;
pub mod ring_buffer;
pub mod types;
pub mod window;

pub use config::{Calibration, Preset, VocoderConfig};
pub use fft::{RustFftTransform, SpectralTransform};
pub use types::*;
pub use window::{generate_window, WindowTable, WindowType};
