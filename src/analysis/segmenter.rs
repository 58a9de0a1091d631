//! Slicing a continuous sample stream into overlapping fixed-length frames.

use log::trace;

use crate::core::ring_buffer::SampleRing;
use crate::core::types::{Frame, Sample};
use crate::error::StretchError;

fn check_sizes(frame_size: usize, hop_size: usize) -> Result<(), StretchError> {
    if frame_size == 0 {
        return Err(StretchError::InvalidConfiguration(
            "frame size must be greater than 0".to_string(),
        ));
    }
    if hop_size == 0 || hop_size > frame_size {
        return Err(StretchError::InvalidConfiguration(format!(
            "hop size {} must be in 1..={}",
            hop_size, frame_size
        )));
    }
    Ok(())
}

/// Push-based segmenter: frame `i` starts at sample `i * hop` and spans
/// `frame_size` samples. Partial frames are never emitted.
///
/// A segmenter covers exactly one stream; once finished it rejects input.
#[derive(Debug, Clone)]
pub struct FrameSegmenter {
    frame_size: usize,
    hop_size: usize,
    ring: SampleRing,
    next_index: usize,
    samples_seen: usize,
    finished: bool,
}

impl FrameSegmenter {
    /// # Errors
    /// Returns `StretchError::InvalidConfiguration` unless
    /// `0 < hop_size <= frame_size`.
    pub fn new(frame_size: usize, hop_size: usize) -> Result<Self, StretchError> {
        check_sizes(frame_size, hop_size)?;
        Ok(Self {
            frame_size,
            hop_size,
            ring: SampleRing::with_capacity(frame_size),
            next_index: 0,
            samples_seen: 0,
            finished: false,
        })
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    #[inline]
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Total samples supplied so far.
    #[inline]
    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    /// Frames emitted so far.
    #[inline]
    pub fn frames_emitted(&self) -> usize {
        self.next_index
    }

    /// Feeds a chunk and returns every frame it completes, in index order.
    ///
    /// # Errors
    /// Returns `StretchError::StreamClosed` after [`finish`](Self::finish).
    pub fn push(&mut self, samples: &[Sample]) -> Result<Vec<Frame>, StretchError> {
        if self.finished {
            return Err(StretchError::StreamClosed);
        }
        self.samples_seen += samples.len();

        let mut frames = Vec::new();
        let mut remaining = samples;
        loop {
            let taken = self.ring.extend_from(remaining);
            remaining = &remaining[taken..];
            if !self.ring.is_full() {
                break;
            }
            let mut block = vec![0.0; self.frame_size];
            self.ring.copy_front(&mut block);
            self.ring.advance(self.hop_size);
            trace!("segmented frame {}", self.next_index);
            frames.push(Frame::new(self.next_index, self.hop_size, block));
            self.next_index += 1;
        }
        Ok(frames)
    }

    /// Closes the stream and returns the number of frames produced.
    ///
    /// Samples left over after the last whole frame are discarded; callers
    /// that need them must zero-pad before segmenting.
    ///
    /// # Errors
    /// Returns `StretchError::InsufficientSamples` if fewer than one frame's
    /// worth of samples was ever supplied.
    pub fn finish(&mut self) -> Result<usize, StretchError> {
        self.finished = true;
        self.ring.clear();
        if self.samples_seen < self.frame_size {
            return Err(StretchError::InsufficientSamples {
                provided: self.samples_seen,
                minimum: self.frame_size,
            });
        }
        Ok(self.next_index)
    }
}

/// Number of whole frames a stream of `len` samples yields.
#[inline]
pub fn frame_count(len: usize, frame_size: usize, hop_size: usize) -> usize {
    if len < frame_size || hop_size == 0 {
        return 0;
    }
    (len - frame_size) / hop_size + 1
}

/// Lazy frame iterator over a bounded slice.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    samples: &'a [Sample],
    frame_size: usize,
    hop_size: usize,
    next_index: usize,
    total: usize,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.next_index >= self.total {
            return None;
        }
        let start = self.next_index * self.hop_size;
        let block = self.samples[start..start + self.frame_size].to_vec();
        let frame = Frame::new(self.next_index, self.hop_size, block);
        self.next_index += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total - self.next_index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Frames<'_> {}

/// Segments a bounded slice lazily.
///
/// # Errors
/// Returns `StretchError::InvalidConfiguration` for bad sizes and
/// `StretchError::InsufficientSamples` if `samples` is shorter than one frame.
pub fn frames(
    samples: &[Sample],
    frame_size: usize,
    hop_size: usize,
) -> Result<Frames<'_>, StretchError> {
    check_sizes(frame_size, hop_size)?;
    if samples.len() < frame_size {
        return Err(StretchError::InsufficientSamples {
            provided: samples.len(),
            minimum: frame_size,
        });
    }
    Ok(Frames {
        samples,
        frame_size,
        hop_size,
        next_index: 0,
        total: frame_count(samples.len(), frame_size, hop_size),
    })
}
