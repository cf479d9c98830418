//! Audio pipeline — capture, framing, VAD, PCM16 codec and playback.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → CaptureFrame → ChunkFramer (mono, 16 kHz, 4096)
//!           → VoiceDetector → AudioChunk (PCM16) → session
//!
//! session → base64 PCM16 → decode_base64_pcm16 → PlayableBuffer
//!         → AudioPlayer (PlaybackQueue) → speaker
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use live_translate::audio::{AudioCapture, AudioChunk, ChunkFramer, VoiceDetector};
//!
//! let capture = AudioCapture::new(None, 16_000).unwrap();
//! let vad = VoiceDetector::default();
//! let mut framer = ChunkFramer::new(16_000, 4096);
//!
//! let _handle = capture.start(
//!     move |frame| {
//!         for block in framer.push(&frame) {
//!             let chunk = AudioChunk::from_f32(&block, 16_000);
//!             println!("voice={} ({} samples)", vad.is_voice(&block), chunk.len());
//!         }
//!     },
//!     |reason| eprintln!("microphone lost: {reason}"),
//! );
//! ```

pub mod buffer;
pub mod capture;
pub mod pcm;
pub mod playback;
pub mod resample;
pub mod vad;

pub use buffer::RingBuffer;
pub use capture::{AudioCapture, CaptureError, CaptureFrame, ChunkFramer, StreamHandle};
pub use pcm::{
    decode_base64_pcm16, decode_pcm16_bytes, encode_base64, encode_pcm16, pcm16_to_bytes,
    AudioChunk, CodecError, PlayableBuffer, PLAYBACK_CHANNELS, PLAYBACK_SAMPLE_RATE,
};
pub use playback::{AudioPlayer, PlaybackError, PlaybackEvent, PlaybackQueue};
pub use resample::{mono_to_interleaved, resample, stereo_to_mono, StreamResampler};
pub use vad::VoiceDetector;

// ---------------------------------------------------------------------------
// Device seams
// ---------------------------------------------------------------------------

/// A live audio device the session must release on teardown.
///
/// `shutdown` must be idempotent: the session may call it more than once.
pub trait AudioHandle {
    fn shutdown(&mut self);
}

/// Output side of the pipeline: schedules decoded model audio immediately.
pub trait AudioOutput: AudioHandle {
    fn play(&mut self, buffer: PlayableBuffer);
}

/// Whether a runtime stream error means the device is gone for good.
///
/// Backend-specific errors are often transient (xruns) and are only logged.
pub fn is_device_lost(err: &cpal::StreamError) -> bool {
    matches!(err, cpal::StreamError::DeviceNotAvailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_device_is_terminal() {
        assert!(is_device_lost(&cpal::StreamError::DeviceNotAvailable));
        let xrun = cpal::StreamError::BackendSpecific {
            err: cpal::BackendSpecificError {
                description: "buffer underrun".into(),
            },
        };
        assert!(!is_device_lost(&xrun));
    }
}
