//! Energy-based Voice Activity Detection (VAD).
//!
//! [`VoiceDetector`] gives every captured chunk a coarse integer "volume"
//! score and classifies it as voice or silence against a fixed threshold.
//! The turn controller consumes only the boolean classification.
//!
//! ## Algorithm
//!
//! Only every `stride`-th sample is inspected.  The mean absolute amplitude
//! of the inspected samples is multiplied by `scale` (100) and truncated:
//!
//! ```text
//! volume = floor(scale * Σ|x[k·stride]| / count)
//! voice  = volume > threshold        (threshold = 5)
//! ```
//!
//! This is a heuristic: steady background noise above roughly 5 % of full
//! scale reads as voice.

/// Default score above which a chunk counts as voice.
pub const DEFAULT_VOICE_THRESHOLD: u32 = 5;
/// Default sampling stride.
pub const DEFAULT_STRIDE: usize = 4;
/// Default multiplier applied to the mean absolute amplitude.
pub const DEFAULT_SCALE: f32 = 100.0;

// ---------------------------------------------------------------------------
// VoiceDetector
// ---------------------------------------------------------------------------

/// Per-chunk voice/silence classifier.
///
/// # Example
///
/// ```rust
/// use live_translate::audio::VoiceDetector;
///
/// let vad = VoiceDetector::default();
/// assert!(!vad.is_voice(&vec![0.01_f32; 4096])); // volume 1
/// assert!(vad.is_voice(&vec![0.2_f32; 4096]));   // volume 20
/// ```
#[derive(Debug, Clone)]
pub struct VoiceDetector {
    threshold: u32,
    stride: usize,
    scale: f32,
}

impl Default for VoiceDetector {
    fn default() -> Self {
        Self::new(DEFAULT_VOICE_THRESHOLD)
    }
}

impl VoiceDetector {
    /// Create a detector with the given threshold and the default stride and
    /// scale.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            stride: DEFAULT_STRIDE,
            scale: DEFAULT_SCALE,
        }
    }

    /// Create a detector with a custom sampling stride.
    pub fn with_stride(threshold: u32, stride: usize) -> Self {
        assert!(stride > 0, "stride must be > 0");
        Self {
            threshold,
            stride,
            scale: DEFAULT_SCALE,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Volume score of one chunk.  Empty chunks score `0`.
    pub fn volume(&self, chunk: &[f32]) -> u32 {
        let (sum, count) = chunk
            .iter()
            .step_by(self.stride)
            .fold((0.0_f32, 0usize), |(sum, n), s| (sum + s.abs(), n + 1));

        if count == 0 {
            return 0;
        }
        (sum / count as f32 * self.scale) as u32
    }

    /// Returns `true` when the chunk's volume exceeds the threshold.
    pub fn is_voice(&self, chunk: &[f32]) -> bool {
        self.volume(chunk) > self.threshold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
