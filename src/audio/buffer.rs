//! Fixed-capacity circular (ring) buffer used as the playback FIFO.
//!
//! Decoded model audio is pushed at the back and the output device callback
//! pops from the front.  When the buffer is full, new samples **overwrite**
//! the oldest data so memory stays bounded even if the model streams faster
//! than the speaker drains.
//!
//! # Example
//!
//! ```rust
//! use live_translate::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(4);
//! buf.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]); // 5 items → capacity 4 → oldest dropped
//!
//! let mut out = [0.0_f32; 3];
//! assert_eq!(buf.pop_into(&mut out), 3);
//! assert_eq!(out, [2.0, 3.0, 4.0]);
//! assert_eq!(buf.drain(), vec![5.0]);
//! ```

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity circular buffer.
///
/// Generic over `T: Copy + Default`; playback uses `RingBuffer<f32>`.
///
/// ## Overflow behaviour
///
/// When [`push_slice`](Self::push_slice) would exceed `capacity`, the oldest
/// samples are silently overwritten.  The buffer never allocates beyond its
/// initial capacity.
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the *next* write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid samples currently stored (≤ `capacity`).
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer with the given `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append `data` to the buffer.
    ///
    /// Returns the number of old samples that were overwritten.
    pub fn push_slice(&mut self, data: &[T]) -> usize {
        let mut overwritten = 0;
        for &item in data {
            self.buf[self.write_pos] = item;
            self.write_pos = (self.write_pos + 1) % self.capacity;
            if self.len < self.capacity {
                self.len += 1;
            } else {
                overwritten += 1;
            }
        }
        overwritten
    }

    /// Index of the oldest stored sample.
    fn read_pos(&self) -> usize {
        (self.write_pos + self.capacity - self.len) % self.capacity
    }

    /// Move up to `out.len()` of the oldest samples into `out`.
    ///
    /// Returns how many were written; the rest of `out` is left untouched.
    pub fn pop_into(&mut self, out: &mut [T]) -> usize {
        let n = out.len().min(self.len);
        let read_pos = self.read_pos();
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            *slot = self.buf[(read_pos + i) % self.capacity];
        }
        self.len -= n;
        n
    }

    /// Drain all stored samples in chronological order and reset the buffer.
    ///
    /// After this call `len() == 0`.
    pub fn drain(&mut self) -> Vec<T> {
        if self.len == 0 {
            return Vec::new();
        }

        let read_pos = self.read_pos();
        let mut result = Vec::with_capacity(self.len);
        for i in 0..self.len {
            result.push(self.buf[(read_pos + i) % self.capacity]);
        }

        self.clear();
        result
    }

    /// Discard all samples and reset the write position.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Number of valid samples currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of samples the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` when the next push would overwrite data.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Seconds of audio buffered, assuming `sample_rate` Hz mono.
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.len as f32 / sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Basic push / drain ------------------------------------------------

    #[test]
    fn push_and_drain_within_capacity() {
        let mut buf = RingBuffer::new(8);
        assert_eq!(buf.push_slice(&[1.0_f32, 2.0, 3.0]), 0);
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_full());

        let data = buf.drain();
        assert_eq!(data, vec![1.0, 2.0, 3.0]);
        assert!(buf.is_empty());
    }

    // ---- Overflow (oldest sample discarded) --------------------------------

    #[test]
    fn overflow_by_one_drops_oldest() {
        let mut buf = RingBuffer::new(4);
        assert_eq!(buf.push_slice(&[1.0_f32, 2.0, 3.0, 4.0, 5.0]), 1);

        assert_eq!(buf.len(), 4);
        assert_eq!(buf.drain(), vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn multiple_overflows_in_separate_calls() {
        let mut buf = RingBuffer::new(3);
        buf.push_slice(&[1.0_f32, 2.0, 3.0]);
        buf.push_slice(&[4.0, 5.0]);

        assert_eq!(buf.drain(), vec![3.0, 4.0, 5.0]);
    }

    // ---- FIFO reads --------------------------------------------------------

    #[test]
    fn pop_into_reads_oldest_first() {
        let mut buf = RingBuffer::new(8);
        buf.push_slice(&[1.0_f32, 2.0, 3.0, 4.0]);

        let mut out = [0.0_f32; 2];
        assert_eq!(buf.pop_into(&mut out), 2);
        assert_eq!(out, [1.0, 2.0]);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn pop_into_short_buffer_leaves_tail_untouched() {
        let mut buf = RingBuffer::new(8);
        buf.push_slice(&[1.0_f32]);

        let mut out = [9.0_f32; 3];
        assert_eq!(buf.pop_into(&mut out), 1);
        assert_eq!(out, [1.0, 9.0, 9.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn interleaved_push_and_pop_wraps_around() {
        let mut buf = RingBuffer::new(4);
        let mut out = [0.0_f32; 3];

        buf.push_slice(&[1.0_f32, 2.0, 3.0]);
        buf.pop_into(&mut out);
        buf.push_slice(&[4.0, 5.0, 6.0]); // wraps past the end of storage

        assert_eq!(buf.drain(), vec![4.0, 5.0, 6.0]);
    }

    // ---- Drain / clear semantics -------------------------------------------

    #[test]
    fn drain_empty_returns_empty_vec() {
        let mut buf: RingBuffer<f32> = RingBuffer::new(4);
        assert_eq!(buf.drain(), Vec::<f32>::new());
    }

    #[test]
    fn clear_resets_state() {
        let mut buf = RingBuffer::new(4);
        buf.push_slice(&[1.0_f32, 2.0, 3.0, 4.0, 5.0]);
        buf.clear();

        assert!(buf.is_empty());
        buf.push_slice(&[9.0_f32]);
        assert_eq!(buf.drain(), vec![9.0]);
    }

    // ---- Capacity / duration helpers ---------------------------------------

    #[test]
    fn duration_secs_calculation() {
        let mut buf = RingBuffer::new(48_000);
        buf.push_slice(&vec![0.0_f32; 12_000]);
        assert!((buf.duration_secs(24_000) - 0.5).abs() < 1e-6);
        assert_eq!(buf.capacity(), 48_000);
    }

    #[test]
    #[should_panic(expected = "RingBuffer capacity must be > 0")]
    fn zero_capacity_panics() {
        let _buf: RingBuffer<f32> = RingBuffer::new(0);
    }
}
