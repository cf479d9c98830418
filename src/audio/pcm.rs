//! PCM16 encoding and decoding.
//!
//! Outbound microphone audio is converted from `f32` in `[-1.0, 1.0]` to
//! signed 16-bit little-endian PCM and shipped as base64 text.  Inbound model
//! audio takes the reverse path and comes out as a [`PlayableBuffer`].
//!
//! ```text
//! f32 ──clamp──▶ i16 (×32767 / ×32768) ──LE bytes──▶ base64
//! base64 ──▶ LE bytes ──▶ i16 ──÷32768──▶ f32
//! ```

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

/// Sample rate of the audio the model sends back.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;
/// Channel count of the audio the model sends back.
pub const PLAYBACK_CHANNELS: u16 = 1;

// ---------------------------------------------------------------------------
// CodecError
// ---------------------------------------------------------------------------

/// Reasons an inbound audio payload could not be decoded.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("invalid base64 audio payload: {0}")]
    Base64(String),

    #[error("PCM16 payload has an odd byte count ({0})")]
    OddByteLength(usize),
}

impl From<base64::DecodeError> for CodecError {
    fn from(e: base64::DecodeError) -> Self {
        CodecError::Base64(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// One fixed-size block of outbound PCM16 audio.
///
/// Immutable once produced; the pipeline stage that processes it owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    samples: Vec<i16>,
    mime_type: String,
    sample_rate: u32,
}

impl AudioChunk {
    /// Encode `samples` (mono `f32` at `sample_rate`) into a chunk.
    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Self {
        Self {
            samples: encode_pcm16(samples),
            mime_type: pcm_mime_type(sample_rate),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Encoding label sent alongside the payload, e.g. `audio/pcm;rate=16000`.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Little-endian bytes, for transports that accept binary frames.
    pub fn to_bytes(&self) -> Vec<u8> {
        pcm16_to_bytes(&self.samples)
    }

    /// Base64 text of the little-endian bytes.
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.to_bytes())
    }
}

/// Mime label for raw PCM16 at `sample_rate`.
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={sample_rate}")
}

// ---------------------------------------------------------------------------
// PlayableBuffer
// ---------------------------------------------------------------------------

/// Decoded model audio ready to be queued on the output device.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayableBuffer {
    /// Normalised samples in `[-1.0, 1.0)`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PlayableBuffer {
    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Convert `f32` samples to signed 16-bit PCM.
///
/// Each sample is clamped to `[-1.0, 1.0]`; positive values scale by 32767
/// and negative values by 32768 so both ends of the `i16` range are used.
/// Scaled values are rounded to the nearest integer.
///
/// ```rust
/// use live_translate::audio::encode_pcm16;
///
/// assert_eq!(encode_pcm16(&[1.0, -1.0, 0.0, 2.0, -3.0]), vec![32767, -32768, 0, 32767, -32768]);
/// ```
pub fn encode_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = s.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 32768.0).round() as i16
            } else {
                (s * 32767.0).round() as i16
            }
        })
        .collect()
}

/// Serialise PCM16 samples as little-endian bytes.
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Encode `f32` samples straight to base64 PCM16 text.
///
/// Empty input yields an empty string.
pub fn encode_base64(samples: &[f32]) -> String {
    general_purpose::STANDARD.encode(pcm16_to_bytes(&encode_pcm16(samples)))
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parse little-endian PCM16 bytes into normalised `f32` samples
/// (`int16 / 32768.0`).
pub fn decode_pcm16_bytes(bytes: &[u8]) -> Result<Vec<f32>, CodecError> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::OddByteLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

/// Decode base64 PCM16 model audio into a [`PlayableBuffer`] at
/// [`PLAYBACK_SAMPLE_RATE`] mono.
///
/// An empty payload decodes to a single silent sample so playback always has
/// something to schedule.
///
/// # Errors
///
/// [`CodecError::Base64`] for malformed text, [`CodecError::OddByteLength`]
/// when the decoded bytes cannot be split into 16-bit samples.
pub fn decode_base64_pcm16(data: &str) -> Result<PlayableBuffer, CodecError> {
    let bytes = general_purpose::STANDARD.decode(data.trim())?;
    let mut samples = decode_pcm16_bytes(&bytes)?;
    if samples.is_empty() {
        samples.push(0.0);
    }
    Ok(PlayableBuffer {
        samples,
        sample_rate: PLAYBACK_SAMPLE_RATE,
        channels: PLAYBACK_CHANNELS,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_samples() {
        assert_eq!(encode_pcm16(&[1.5, -1.5]), vec![32767, -32768]);
    }

    #[test]
    fn asymmetric_scaling() {
        assert_eq!(encode_pcm16(&[0.5]), vec![16384]);
        assert_eq!(encode_pcm16(&[-0.5]), vec![-16384]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(encode_pcm16(&[]).is_empty());
        assert_eq!(encode_base64(&[]), "");
        assert!(AudioChunk::from_f32(&[], 16_000).is_empty());
    }

    #[test]
    fn bytes_are_little_endian() {
        assert_eq!(pcm16_to_bytes(&[0x0102, -2]), vec![0x02, 0x01, 0xFE, 0xFF]);
    }

    /// Negative samples come back within half a step; positive samples can
    /// drift one extra step near full scale because they are scaled by 32767
    /// on the way out and divided by 32768 on the way back.
    #[test]
    fn round_trip_within_one_quantization_step() {
        let input: Vec<f32> = (0..2_000)
            .map(|i| ((i as f32) * 0.013).sin() * 0.9)
            .chain([1.0, -1.0, 0.0, 0.999_99, -0.999_99])
            .collect();

        let decoded = decode_base64_pcm16(&encode_base64(&input)).unwrap();
        assert_eq!(decoded.samples.len(), input.len());

        let step = 1.0 / 32768.0;
        for (a, b) in input.iter().zip(decoded.samples.iter()) {
            let bound = if *a < 0.0 { step } else { 1.5 * step };
            assert!((a - b).abs() <= bound + 1e-7, "{a} vs {b}");
        }
    }

    #[test]
    fn decoded_buffer_is_24k_mono() {
        let buf = decode_base64_pcm16(&encode_base64(&[0.1; 48])).unwrap();
        assert_eq!(buf.sample_rate, 24_000);
        assert_eq!(buf.channels, 1);
        assert!((buf.duration_secs() - 0.002).abs() < 1e-6);
    }

    #[test]
    fn empty_payload_decodes_to_single_silent_sample() {
        let buf = decode_base64_pcm16("").unwrap();
        assert_eq!(buf.samples, vec![0.0]);
    }

    #[test]
    fn malformed_base64_is_an_error() {
        let err = decode_base64_pcm16("not base64!!").unwrap_err();
        assert!(matches!(err, CodecError::Base64(_)), "{err}");
    }

    #[test]
    fn odd_byte_count_is_an_error() {
        let odd = general_purpose::STANDARD.encode([1u8, 2, 3]);
        assert_eq!(
            decode_base64_pcm16(&odd).unwrap_err(),
            CodecError::OddByteLength(3)
        );
    }

    #[test]
    fn chunk_carries_mime_label_and_rate() {
        let chunk = AudioChunk::from_f32(&[0.0; 4096], 16_000);
        assert_eq!(chunk.mime_type(), "audio/pcm;rate=16000");
        assert_eq!(chunk.sample_rate(), 16_000);
        assert_eq!(chunk.len(), 4096);
        assert_eq!(chunk.to_bytes().len(), 8192);
    }
}
