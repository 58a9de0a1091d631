use crate::core::fft::SpectralTransform;
use crate::core::types::{Frame, SpectralFrame};
use crate::core::window::WindowTable;

/// Windows time-domain frames and transforms them into polar spectra.
#[derive(Debug, Clone)]
pub struct SpectralAnalyzer<T: SpectralTransform> {
    window: WindowTable,
    transform: T,
    windowed: Vec<f32>,
}

impl<T: SpectralTransform> SpectralAnalyzer<T> {
    /// The window and transform must both have the pipeline's frame size.
    pub fn new(window: WindowTable, transform: T) -> Self {
        debug_assert_eq!(window.len(), transform.size());
        let windowed = vec![0.0; window.len()];
        Self {
            window,
            transform,
            windowed,
        }
    }

    pub fn analyze(&mut self, frame: &Frame) -> SpectralFrame {
        self.windowed.copy_from_slice(frame.samples());
        self.window.apply(&mut self.windowed);
        let bins = self.transform.forward(&self.windowed);
        SpectralFrame::from_bins(frame.index(), &bins)
    }
}
