//! Source-side gate for microphone audio.
//!
//! [`CaptureGate`] runs inside the cpal input callback.  While the shared
//! status says audio is not accepted (awaiting the model, or closed) every
//! frame is dropped and the partial chunk is discarded, so nothing captured
//! during the model's turn leaks into the next user turn.

use std::time::Instant;

use crate::audio::{AudioChunk, CaptureFrame, ChunkFramer, VoiceDetector};

use super::event::{EventSender, SessionEvent};
use super::state::SharedState;

pub struct CaptureGate {
    framer: ChunkFramer,
    vad: VoiceDetector,
    state: SharedState,
    tx: EventSender,
    rate: u32,
}

impl CaptureGate {
    /// `rate` is the outbound sample rate; `framer` must produce chunks at
    /// that rate.
    pub fn new(
        framer: ChunkFramer,
        vad: VoiceDetector,
        state: SharedState,
        tx: EventSender,
        rate: u32,
    ) -> Self {
        Self {
            framer,
            vad,
            state,
            tx,
            rate,
        }
    }

    /// Frame, classify and enqueue `frame`, or drop it when the gate is shut.
    ///
    /// Returns the number of chunks enqueued.
    pub fn on_frame(&mut self, frame: &CaptureFrame, now: Instant) -> usize {
        let open = self
            .state
            .lock()
            .map(|st| st.accepts_audio())
            .unwrap_or(false);
        if !open {
            self.framer.reset();
            return 0;
        }

        let mut sent = 0;
        for block in self.framer.push(frame) {
            let voiced = self.vad.is_voice(&block);
            let event = SessionEvent::ChunkCaptured {
                chunk: AudioChunk::from_f32(&block, self.rate),
                voiced,
                captured_at: now,
            };
            if self.tx.send(event).is_ok() {
                sent += 1;
            }
        }
        sent
    }

    /// Samples waiting for the next complete chunk.
    pub fn pending(&self) -> usize {
        self.framer.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::event::{event_channel, EventReceiver};
    use crate::pipeline::state::new_shared_state;
    use crate::pipeline::turn::TurnState;

    const RATE: u32 = 16_000;
    const CHUNK: usize = 8;

    fn frame(amplitude: f32, len: usize) -> CaptureFrame {
        CaptureFrame {
            samples: vec![amplitude; len],
            sample_rate: RATE,
            channels: 1,
        }
    }

    fn gate() -> (CaptureGate, SharedState, EventReceiver) {
        let state = new_shared_state();
        let (tx, rx) = event_channel();
        let gate = CaptureGate::new(
            ChunkFramer::new(RATE, CHUNK),
            VoiceDetector::with_stride(5, 1),
            state.clone(),
            tx,
            RATE,
        );
        (gate, state, rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<bool> {
        let mut voiced = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                SessionEvent::ChunkCaptured { chunk, voiced: v, .. } => {
                    assert_eq!(chunk.len(), CHUNK);
                    voiced.push(v);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        voiced
    }

    #[test]
    fn open_gate_enqueues_classified_chunks() {
        let (mut gate, _state, mut rx) = gate();

        assert_eq!(gate.on_frame(&frame(0.3, CHUNK), Instant::now()), 1);
        assert_eq!(gate.on_frame(&frame(0.0, CHUNK + 3), Instant::now()), 1);

        assert_eq!(drain(&mut rx), vec![true, false]);
        assert_eq!(gate.pending(), 3);
    }

    #[test]
    fn awaiting_response_drops_frames_and_partial_chunk() {
        let (mut gate, state, mut rx) = gate();
        gate.on_frame(&frame(0.3, CHUNK - 2), Instant::now());
        assert_eq!(gate.pending(), CHUNK - 2);

        state.lock().unwrap().turn = TurnState::AwaitingResponse;
        assert_eq!(gate.on_frame(&frame(0.3, CHUNK * 2), Instant::now()), 0);

        assert!(drain(&mut rx).is_empty());
        assert_eq!(gate.pending(), 0);

        // Reopened: the old partial chunk does not resurface.
        state.lock().unwrap().turn = TurnState::Idle;
        assert_eq!(gate.on_frame(&frame(0.0, CHUNK), Instant::now()), 1);
        assert_eq!(drain(&mut rx), vec![false]);
    }

    #[test]
    fn closed_session_drops_frames() {
        let (mut gate, state, mut rx) = gate();
        gate.on_frame(&frame(0.3, 3), Instant::now());

        state.lock().unwrap().closed = true;
        assert_eq!(gate.on_frame(&frame(0.3, CHUNK), Instant::now()), 0);

        assert!(drain(&mut rx).is_empty());
        assert_eq!(gate.pending(), 0);
    }
}
