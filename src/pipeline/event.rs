//! Events consumed by the session orchestrator.
//!
//! Every producer (cpal capture thread, output callback, hotkey thread,
//! WebSocket reader task, translation tasks) only sends; the orchestrator is
//! the single consumer and handles events strictly in arrival order.

use std::time::Instant;

use tokio::sync::mpsc;

use crate::audio::{AudioChunk, PlaybackEvent};
use crate::session::ServerMessage;

#[derive(Debug)]
pub enum SessionEvent {
    /// One framed, encoded microphone chunk and its VAD verdict.
    ChunkCaptured {
        chunk: AudioChunk,
        voiced: bool,
        captured_at: Instant,
    },
    /// A parsed inbound frame.
    MessageReceived(ServerMessage),
    /// The remote side closed the connection or it failed.
    ChannelClosed { reason: Option<String> },
    /// The microphone or speaker disappeared mid-session.
    DeviceLost(String),
    /// The user asked to end their turn now.
    ForceEndTurn,
    /// Model audio started or stopped reaching the speaker.
    Playback(PlaybackEvent),
    /// A model text part came back translated.
    TranslationReady { source: String, translation: String },
    /// Tear the session down and stop.
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
