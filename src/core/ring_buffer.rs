//! Fixed-capacity sample ring used to hold the sliding analysis window.

/// Fixed-capacity ring of samples.
///
/// Never allocates after construction and never shifts memory; reads and
/// writes wrap around the end of the backing storage.
#[derive(Debug, Clone)]
pub struct SampleRing {
    data: Vec<f32>,
    head: usize,
    len: usize,
}

impl SampleRing {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: vec![0.0; cap],
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Appends as many samples from `input` as fit; returns how many were taken.
    pub fn extend_from(&mut self, input: &[f32]) -> usize {
        let cap = self.capacity();
        let take = input.len().min(cap - self.len);
        if take == 0 {
            return 0;
        }
        let tail = (self.head + self.len) % cap;
        let first = take.min(cap - tail);
        self.data[tail..tail + first].copy_from_slice(&input[..first]);
        self.data[..take - first].copy_from_slice(&input[first..take]);
        self.len += take;
        take
    }

    /// Copies the oldest `out.len()` samples into `out` without consuming them.
    ///
    /// Returns the number of samples copied.
    pub fn copy_front(&self, out: &mut [f32]) -> usize {
        let cap = self.capacity();
        let n = out.len().min(self.len);
        if n == 0 {
            return 0;
        }
        let first = n.min(cap - self.head);
        out[..first].copy_from_slice(&self.data[self.head..self.head + first]);
        out[first..n].copy_from_slice(&self.data[..n - first]);
        n
    }

    /// Drops up to `n` of the oldest samples; returns how many were dropped.
    pub fn advance(&mut self, n: usize) -> usize {
        let n = n.min(self.len);
        if n == 0 {
            return 0;
        }
        self.head = (self.head + n) % self.capacity();
        self.len -= n;
        if self.len == 0 {
            self.head = 0;
        }
        n
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::SampleRing;

    #[test]
    fn wraps_across_the_end() {
        let mut ring = SampleRing::with_capacity(4);
        assert_eq!(ring.extend_from(&[1.0, 2.0, 3.0]), 3);
        assert_eq!(ring.advance(2), 2);
        assert_eq!(ring.extend_from(&[4.0, 5.0, 6.0, 7.0]), 3);
        assert!(ring.is_full());

        let mut out = [0.0; 4];
        assert_eq!(ring.copy_front(&mut out), 4);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn copy_front_does_not_consume() {
        let mut ring = SampleRing::with_capacity(3);
        ring.extend_from(&[1.0, 2.0]);
        let mut out = [0.0; 2];
        ring.copy_front(&mut out);
        ring.copy_front(&mut out);
        assert_eq!(ring.len(), 2);
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn advance_past_len_empties() {
        let mut ring = SampleRing::with_capacity(2);
        ring.extend_from(&[1.0]);
        assert_eq!(ring.advance(5), 1);
        assert!(ring.is_empty());
        ring.clear();
        assert_eq!(ring.extend_from(&[9.0, 8.0, 7.0]), 2);
    }
}
