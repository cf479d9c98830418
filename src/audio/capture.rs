//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] with a callback that receives every raw
//! [`CaptureFrame`].  The returned [`StreamHandle`] is a RAII guard: dropping
//! it (or calling [`AudioHandle::shutdown`]) stops the underlying stream.
//!
//! [`ChunkFramer`] turns the variable-size device buffers into the fixed-size
//! 16 kHz mono frames the rest of the pipeline works on.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::resample::{stereo_to_mono, StreamResampler};
use super::{is_device_lost, AudioHandle};

// ---------------------------------------------------------------------------
// CaptureFrame
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this buffer in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal input stream alive.
pub struct StreamHandle {
    stream: Option<cpal::Stream>,
}

impl AudioHandle for StreamHandle {
    fn shutdown(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("capture: pause on shutdown failed: {e}");
            }
            log::info!("capture: microphone stream stopped");
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while acquiring or starting the microphone.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device '{0}' not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone wrapper built on top of `cpal`.
///
/// The device is asked for mono `f32` at the preferred rate (16 kHz); when it
/// cannot deliver that, its default configuration is used and
/// [`ChunkFramer`] converts afterwards.
///
/// # Example
///
/// ```rust,no_run
/// use live_translate::audio::{AudioCapture, ChunkFramer};
///
/// let capture = AudioCapture::new(None, 16_000).unwrap();
/// let mut framer = ChunkFramer::new(16_000, 4096);
/// let _handle = capture
///     .start(
///         move |frame| {
///             for block in framer.push(&frame) {
///                 println!("{} samples", block.len());
///             }
///         },
///         |reason| eprintln!("microphone lost: {reason}"),
///     )
///     .unwrap();
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Open `device_name` (or the system default input when `None`).
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoDevice`] / [`CaptureError::DeviceNotFound`] when no
    /// matching microphone exists, [`CaptureError::DefaultConfig`] when the
    /// device cannot report a configuration.
    pub fn new(device_name: Option<&str>, preferred_rate: u32) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?,
            None => host.default_input_device().ok_or(CaptureError::NoDevice)?,
        };

        let config = match preferred_mono_config(&device, preferred_rate) {
            Some(config) => config,
            None => device.default_input_config()?.into(),
        };

        let sample_rate = config.sample_rate.0;
        let channels = config.channels;

        log::info!(
            "capture: using '{}' at {} Hz, {} ch",
            device.name().unwrap_or_else(|_| "<unknown>".into()),
            sample_rate,
            channels
        );

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start recording; `on_frame` runs on the cpal audio thread for every
    /// hardware buffer.  `on_lost` runs once if the device disappears while
    /// the stream is live.
    ///
    /// # Errors
    ///
    /// [`CaptureError::BuildStream`] or [`CaptureError::PlayStream`] if the
    /// platform rejects the stream configuration.
    pub fn start<F, L>(&self, mut on_frame: F, on_lost: L) -> Result<StreamHandle, CaptureError>
    where
        F: FnMut(CaptureFrame) + Send + 'static,
        L: Fn(String) + Send + 'static,
    {
        let mut lost = false;
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                on_frame(CaptureFrame {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                });
            },
            move |err: cpal::StreamError| {
                log::error!("capture: cpal stream error: {err}");
                if is_device_lost(&err) && !std::mem::replace(&mut lost, true) {
                    on_lost(format!("microphone: {err}"));
                }
            },
            None,
        )?;

        stream.play()?;
        Ok(StreamHandle {
            stream: Some(stream),
        })
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels in each [`CaptureFrame`].
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Look for an `f32` mono range that covers `rate`.
fn preferred_mono_config(device: &cpal::Device, rate: u32) -> Option<cpal::StreamConfig> {
    let ranges = device.supported_input_configs().ok()?;
    ranges
        .filter(|r| r.channels() == 1 && r.sample_format() == cpal::SampleFormat::F32)
        .find(|r| r.min_sample_rate().0 <= rate && rate <= r.max_sample_rate().0)
        .map(|r| r.with_sample_rate(cpal::SampleRate(rate)).into())
}

// ---------------------------------------------------------------------------
// ChunkFramer
// ---------------------------------------------------------------------------

/// Converts raw [`CaptureFrame`]s into fixed-size mono frames at the target
/// rate, preserving capture order.
///
/// Leftover samples are carried over to the next call, so the output never
/// contains a short frame.  Resampling is continuous across calls: short
/// device buffers do not each round their own length.
#[derive(Debug)]
pub struct ChunkFramer {
    target_rate: u32,
    frame_size: usize,
    resampler: Option<StreamResampler>,
    pending: Vec<f32>,
}

impl ChunkFramer {
    /// # Panics
    ///
    /// Panics if `frame_size == 0`.
    pub fn new(target_rate: u32, frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame_size must be > 0");
        Self {
            target_rate,
            frame_size,
            resampler: None,
            pending: Vec::with_capacity(frame_size * 2),
        }
    }

    /// Downmix, resample and append `frame`; return every complete frame.
    pub fn push(&mut self, frame: &CaptureFrame) -> Vec<Vec<f32>> {
        let mono = stereo_to_mono(&frame.samples, frame.channels);
        if self.resampler.as_ref().map(StreamResampler::input_rate) != Some(frame.sample_rate) {
            self.resampler = Some(StreamResampler::new(frame.sample_rate, self.target_rate));
        }
        let converted = self
            .resampler
            .as_mut()
            .map(|r| r.process(&mono))
            .unwrap_or_default();
        self.pending.extend_from_slice(&converted);

        let mut out = Vec::new();
        while self.pending.len() >= self.frame_size {
            let rest = self.pending.split_off(self.frame_size);
            out.push(std::mem::replace(&mut self.pending, rest));
        }
        out
    }

    /// Samples waiting for the next complete frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop any partial frame and restart resampling from a clean position.
    pub fn reset(&mut self) {
        self.pending.clear();
        if let Some(r) = self.resampler.as_mut() {
            r.reset();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
