//! Sample-rate conversion and channel mixing utilities.
//!
//! The streaming session expects **16 kHz mono** input, and the model answers
//! at 24 kHz.  This module provides the conversion steps used on both sides:
//!
//! 1. [`stereo_to_mono`] — downmix any number of interleaved channels to mono.
//! 2. [`resample`] — convert between two sample rates.
//! 3. [`StreamResampler`] — the same conversion over a stream of short
//!    device buffers, without per-buffer rounding.
//!
//! ## Length rule
//!
//! For an input of `L` samples the output always holds
//! `round(L / (input_rate / output_rate))` samples, in both directions.

// ---------------------------------------------------------------------------
// stereo_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`.
///
/// * If `channels == 1` the input slice is returned as an owned `Vec` with no
///   averaging.
/// * If `channels == 0` an empty vector is returned.
///
/// # Example
///
/// ```rust
/// use live_translate::audio::stereo_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = stereo_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Duplicate a mono signal across `channels` interleaved channels.
///
/// Used by playback when the output device refuses a mono stream.
pub fn mono_to_interleaved(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => samples
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(n as usize))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Number of output samples produced when converting `input_len` samples
/// from `input_rate` to `output_rate`.
pub fn output_len(input_len: usize, input_rate: u32, output_rate: u32) -> usize {
    if input_rate == 0 || output_rate == 0 {
        return 0;
    }
    let ratio = input_rate as f64 / output_rate as f64;
    (input_len as f64 / ratio).round() as usize
}

/// Convert `samples` from `input_rate` Hz to `output_rate` Hz.
///
/// * Equal rates copy the input unchanged.
/// * Downsampling averages each block of input samples that maps onto one
///   output sample ([`downsample_block_average`]).
/// * Upsampling interpolates linearly between neighbouring input samples.
///
/// Empty input (or a zero rate) returns an empty vector.
///
/// # Example
///
/// ```rust
/// use live_translate::audio::resample;
///
/// // 10 ms @ 48 kHz → 10 ms @ 16 kHz
/// let hi = vec![0.5_f32; 480];
/// let lo = resample(&hi, 48_000, 16_000);
/// assert_eq!(lo.len(), 160);
/// ```
pub fn resample(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    if samples.is_empty() || input_rate == 0 || output_rate == 0 {
        return Vec::new();
    }

    if input_rate == output_rate {
        return samples.to_vec();
    }

    if input_rate > output_rate {
        downsample_block_average(samples, input_rate, output_rate)
    } else {
        upsample_linear(samples, input_rate, output_rate)
    }
}

/// Block-averaging downsampler.
///
/// Output sample `i` is the mean of the input block
/// `[round(i * ratio), round((i + 1) * ratio))` where
/// `ratio = input_rate / output_rate`.  A block that falls outside the input
/// yields `0.0`.
pub fn downsample_block_average(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    let ratio = input_rate as f64 / output_rate as f64;
    let len = output_len(samples.len(), input_rate, output_rate);
    let mut output = Vec::with_capacity(len);

    let mut block_start = 0usize;
    for i in 0..len {
        let block_end = (((i + 1) as f64) * ratio).round() as usize;
        let end = block_end.min(samples.len());

        let sample = if block_start < end {
            let block = &samples[block_start..end];
            block.iter().sum::<f32>() / block.len() as f32
        } else {
            0.0
        };

        output.push(sample);
        block_start = block_end;
    }

    output
}

fn upsample_linear(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    let ratio = output_rate as f64 / input_rate as f64;
    let len = output_len(samples.len(), input_rate, output_rate);
    let mut output = Vec::with_capacity(len);

    for i in 0..len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac as f32) + samples[idx + 1] * frac as f32
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// StreamResampler
// ---------------------------------------------------------------------------

/// Incremental rate converter for a continuous mono stream.
///
/// Block boundaries are computed on the absolute sample position since the
/// last [`reset`](Self::reset), so feeding a stream in many small buffers
/// produces the same samples as one [`resample`] call over the whole stream.
/// An output sample is only emitted once all of its input has arrived.
#[derive(Debug, Clone)]
pub struct StreamResampler {
    input_rate: u32,
    output_rate: u32,
    /// Input samples not yet fully consumed.
    pending: Vec<f32>,
    /// Absolute index of `pending[0]`.
    base: u64,
    /// Output samples emitted so far.
    produced: u64,
}

impl StreamResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        Self {
            input_rate,
            output_rate,
            pending: Vec::new(),
            base: 0,
            produced: 0,
        }
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Append `samples` and return every output sample that is now complete.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        if self.input_rate == 0 || self.output_rate == 0 {
            return Vec::new();
        }
        if self.input_rate == self.output_rate {
            return samples.to_vec();
        }

        self.pending.extend_from_slice(samples);
        let out = if self.input_rate > self.output_rate {
            self.drain_block_average()
        } else {
            self.drain_linear()
        };
        self.discard_consumed();
        out
    }

    /// Forget all buffered input and restart the position count.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.base = 0;
        self.produced = 0;
    }

    /// Input samples held back for the next call.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn ratio(&self) -> f64 {
        self.input_rate as f64 / self.output_rate as f64
    }

    fn available_end(&self) -> u64 {
        self.base + self.pending.len() as u64
    }

    fn drain_block_average(&mut self) -> Vec<f32> {
        let ratio = self.ratio();
        let mut out = Vec::new();
        loop {
            let start = (self.produced as f64 * ratio).round() as u64;
            let end = ((self.produced + 1) as f64 * ratio).round() as u64;
            if end > self.available_end() {
                break;
            }
            let block = &self.pending[(start - self.base) as usize..(end - self.base) as usize];
            out.push(if block.is_empty() {
                0.0
            } else {
                block.iter().sum::<f32>() / block.len() as f32
            });
            self.produced += 1;
        }
        out
    }

    fn drain_linear(&mut self) -> Vec<f32> {
        let ratio = self.ratio();
        let mut out = Vec::new();
        loop {
            let pos = self.produced as f64 * ratio;
            let idx = pos as u64;
            if idx + 1 >= self.available_end() {
                break;
            }
            let frac = (pos - idx as f64) as f32;
            let i = (idx - self.base) as usize;
            out.push(self.pending[i] * (1.0 - frac) + self.pending[i + 1] * frac);
            self.produced += 1;
        }
        out
    }

    /// Drop input that no future output sample will read.
    fn discard_consumed(&mut self) {
        let next = self.produced as f64 * self.ratio();
        let keep_from = if self.input_rate > self.output_rate {
            next.round() as u64
        } else {
            next as u64
        };
        let drop = (keep_from.saturating_sub(self.base) as usize).min(self.pending.len());
        self.pending.drain(..drop);
        self.base += drop as u64;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
