//! Speaker output via `cpal`.
//!
//! [`AudioPlayer`] owns an output stream whose callback pulls samples from a
//! shared [`PlaybackQueue`].  Queued audio starts playing on the next device
//! callback, and the queue reports [`PlaybackEvent::Started`] /
//! [`PlaybackEvent::Ended`] around every burst of sound so the session can
//! show "speaking" state.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::buffer::RingBuffer;
use super::pcm::{PlayableBuffer, PLAYBACK_SAMPLE_RATE};
use super::resample::{mono_to_interleaved, resample};
use super::{is_device_lost, AudioHandle, AudioOutput};

/// Two minutes of 24 kHz mono audio.
const DEFAULT_QUEUE_CAPACITY: usize = PLAYBACK_SAMPLE_RATE as usize * 120;

// ---------------------------------------------------------------------------
// PlaybackEvent
// ---------------------------------------------------------------------------

/// Speaking-state transitions reported by the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Queued audio began reaching the speaker.
    Started,
    /// The queue ran dry; the speaker is silent again.
    Ended,
}

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no output device found on the default audio host")]
    NoDevice,

    #[error("failed to query default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// PlaybackQueue
// ---------------------------------------------------------------------------

/// FIFO of samples waiting for the speaker, plus the speaking flag.
///
/// `Started` is reported by the first [`fill`](Self::fill) that outputs any
/// queued sample; `Ended` by the first `fill` after that which finds the
/// queue empty.
pub struct PlaybackQueue {
    buffer: RingBuffer<f32>,
    speaking: bool,
}

impl PlaybackQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RingBuffer::new(capacity),
            speaking: false,
        }
    }

    /// Append samples for playback.  Returns how many old samples were
    /// dropped because the queue was full.
    pub fn enqueue(&mut self, samples: &[f32]) -> usize {
        self.buffer.push_slice(samples)
    }

    /// Write the next `out.len()` samples, padding with silence.
    pub fn fill(&mut self, out: &mut [f32]) -> Option<PlaybackEvent> {
        let written = self.buffer.pop_into(out);
        out[written..].iter_mut().for_each(|s| *s = 0.0);

        match (written > 0, self.speaking) {
            (true, false) => {
                self.speaking = true;
                Some(PlaybackEvent::Started)
            }
            (false, true) => {
                self.speaking = false;
                Some(PlaybackEvent::Ended)
            }
            _ => None,
        }
    }

    /// Discard pending audio.  The next `fill` reports `Ended` if sound was
    /// playing.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Samples still waiting to be played.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// AudioPlayer
// ---------------------------------------------------------------------------

/// Output device wrapper.
///
/// Requests 24 kHz mono; if the device refuses, its default configuration is
/// used and queued buffers are resampled and duplicated across channels.
pub struct AudioPlayer {
    queue: Arc<Mutex<PlaybackQueue>>,
    stream: Option<cpal::Stream>,
    sample_rate: u32,
    channels: u16,
}

impl AudioPlayer {
    /// Open the default output device and start its stream.
    ///
    /// `on_event` runs on the audio thread whenever speaking starts or ends.
    /// `on_lost` runs once if the device disappears while the stream is live.
    pub fn start<F, L>(on_event: F, on_lost: L) -> Result<Self, PlaybackError>
    where
        F: Fn(PlaybackEvent) + Send + 'static,
        L: Fn(String) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoDevice)?;

        let config: cpal::StreamConfig = match preferred_output_config(&device) {
            Some(config) => config,
            None => device.default_output_config()?.into(),
        };
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;

        let queue = Arc::new(Mutex::new(PlaybackQueue::new(
            DEFAULT_QUEUE_CAPACITY * channels as usize,
        )));
        let queue_cb = Arc::clone(&queue);

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Never block the audio thread; output silence if the queue
                // is busy.
                let event = match queue_cb.try_lock() {
                    Ok(mut q) => q.fill(data),
                    Err(_) => {
                        data.iter_mut().for_each(|s| *s = 0.0);
                        None
                    }
                };
                if let Some(event) = event {
                    on_event(event);
                }
            },
            {
                let mut lost = false;
                move |err: cpal::StreamError| {
                    log::error!("playback: cpal stream error: {err}");
                    if is_device_lost(&err) && !std::mem::replace(&mut lost, true) {
                        on_lost(format!("speaker: {err}"));
                    }
                }
            },
            None,
        )?;
        stream.play()?;

        log::info!("playback: output stream at {sample_rate} Hz, {channels} ch");

        Ok(Self {
            queue,
            stream: Some(stream),
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl AudioHandle for AudioPlayer {
    fn shutdown(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Ok(mut q) = self.queue.lock() {
                q.clear();
            }
            if let Err(e) = stream.pause() {
                log::debug!("playback: pause on shutdown failed: {e}");
            }
            log::info!("playback: output stream closed");
        }
    }
}

impl AudioOutput for AudioPlayer {
    fn play(&mut self, buffer: PlayableBuffer) {
        if self.stream.is_none() {
            return;
        }
        let resampled = resample(&buffer.samples, buffer.sample_rate, self.sample_rate);
        let samples = mono_to_interleaved(&resampled, self.channels);

        match self.queue.lock() {
            Ok(mut q) => {
                let dropped = q.enqueue(&samples);
                if dropped > 0 {
                    log::warn!("playback: queue full, dropped {dropped} samples");
                }
            }
            Err(e) => log::error!("playback: queue lock poisoned: {e}"),
        }
    }
}

fn preferred_output_config(device: &cpal::Device) -> Option<cpal::StreamConfig> {
    let ranges = device.supported_output_configs().ok()?;
    ranges
        .filter(|r| r.channels() == 1 && r.sample_format() == cpal::SampleFormat::F32)
        .find(|r| {
            r.min_sample_rate().0 <= PLAYBACK_SAMPLE_RATE
                && PLAYBACK_SAMPLE_RATE <= r.max_sample_rate().0
        })
        .map(|r| r.with_sample_rate(cpal::SampleRate(PLAYBACK_SAMPLE_RATE)).into())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
