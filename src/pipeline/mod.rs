//! Session pipeline for the live translator.
//!
//! This module wires capture, turn-taking, the remote session and playback
//! together, and exposes the shared status the capture callback and `main`
//! read.
//!
//! # Architecture
//!
//! ```text
//! cpal input thread ──CaptureGate──┐ ChunkCaptured
//! cpal output thread ──Playback─────┤ DeviceLost
//! hotkey thread ──ForceEndTurn──────┤  (unbounded mpsc)
//! WebSocket reader ──MessageReceived┤
//!                  └─ChannelClosed──┤
//! ctrl-c ──Shutdown─────────────────┘
//!                                   ▼
//!                    SessionOrchestrator::run()
//!                         │
//!                         ├─ TurnController   (Idle / UserTalking / AwaitingResponse)
//!                         ├─ SessionChannel   (send_audio / send_turn_complete / close)
//!                         └─ AudioOutput      (play decoded model audio)
//!
//! SharedState (Arc<Mutex<SessionStatus>>) ←── read by CaptureGate
//! ```

pub mod event;
pub mod gate;
pub mod runner;
pub mod state;
pub mod turn;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use event::{event_channel, EventReceiver, EventSender, SessionEvent};
pub use gate::CaptureGate;
pub use runner::{PipelineError, SessionOrchestrator, STALLED_STATUS};
pub use state::{new_shared_state, SessionStatus, SharedState};
pub use turn::{TurnAction, TurnController, TurnState, DEFAULT_SILENCE_TIMEOUT};
