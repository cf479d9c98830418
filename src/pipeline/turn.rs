//! Turn-taking state machine.
//!
//! ```text
//! Idle ──voice──▶ UserTalking ──silence for > timeout──▶ AwaitingResponse
//!  ▲                  │  ▲                                    │
//!  │                  └──┘ voice / short silence              │
//!  └──────────────────── inbound model response ──────────────┘
//!
//! Idle | UserTalking ──force end of turn──▶ AwaitingResponse
//! ```
//!
//! Timestamps are passed in by the caller, so the controller is a plain
//! value type with no clock of its own.

use std::time::{Duration, Instant};

/// Default silence after the last voiced chunk that ends the user's turn.
pub const DEFAULT_SILENCE_TIMEOUT: Duration = Duration::from_millis(1200);

// ---------------------------------------------------------------------------
// TurnState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Nobody is talking; chunks stream through.
    #[default]
    Idle,
    /// The user has spoken and the silence timer is running.
    UserTalking,
    /// The turn was handed to the model; capture is gated.
    AwaitingResponse,
}

impl TurnState {
    /// `false` while outbound audio is suspended.
    pub fn accepts_audio(&self) -> bool {
        !matches!(self, TurnState::AwaitingResponse)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TurnState::Idle => "Listening",
            TurnState::UserTalking => "User talking",
            TurnState::AwaitingResponse => "Waiting for response",
        }
    }
}

// ---------------------------------------------------------------------------
// TurnAction
// ---------------------------------------------------------------------------

/// What the caller must do with the chunk it just reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnAction {
    /// Stream the chunk to the session.
    Transmit,
    /// Do not stream the chunk; send the turn-completion signal instead.
    EndTurn,
    /// Drop the chunk.
    Discard,
}

// ---------------------------------------------------------------------------
// TurnController
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TurnController {
    state: TurnState,
    silence_timeout: Duration,
    first_voice_at: Option<Instant>,
    last_voice_at: Option<Instant>,
}

impl TurnController {
    pub fn new(silence_timeout: Duration) -> Self {
        Self {
            state: TurnState::Idle,
            silence_timeout,
            first_voice_at: None,
            last_voice_at: None,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn silence_timeout(&self) -> Duration {
        self.silence_timeout
    }

    /// Start of the current utterance, while the user is talking.
    pub fn first_voice_at(&self) -> Option<Instant> {
        self.first_voice_at
    }

    pub fn last_voice_at(&self) -> Option<Instant> {
        self.last_voice_at
    }

    /// Feed one classified chunk captured at `now`.
    pub fn on_chunk(&mut self, voiced: bool, now: Instant) -> TurnAction {
        match self.state {
            TurnState::AwaitingResponse => TurnAction::Discard,
            TurnState::Idle => {
                if voiced {
                    self.state = TurnState::UserTalking;
                    self.first_voice_at = Some(now);
                    self.last_voice_at = Some(now);
                }
                TurnAction::Transmit
            }
            TurnState::UserTalking => {
                if voiced {
                    self.last_voice_at = Some(now);
                    return TurnAction::Transmit;
                }
                let silent_for = self
                    .last_voice_at
                    .map(|t| now.saturating_duration_since(t))
                    .unwrap_or_default();
                if silent_for > self.silence_timeout {
                    self.enter_awaiting();
                    TurnAction::EndTurn
                } else {
                    TurnAction::Transmit
                }
            }
        }
    }

    /// Manual end of turn.  Returns `true` when the caller must send the
    /// turn-completion signal.
    pub fn force_end_turn(&mut self) -> bool {
        if self.state == TurnState::AwaitingResponse {
            return false;
        }
        self.enter_awaiting();
        true
    }

    /// An inbound model response arrived.  Returns `true` if this reopened
    /// the outbound gate.
    pub fn on_response(&mut self) -> bool {
        if self.state == TurnState::AwaitingResponse {
            self.state = TurnState::Idle;
            true
        } else {
            false
        }
    }

    /// Back to `Idle` with no timestamps.
    pub fn reset(&mut self) {
        self.state = TurnState::Idle;
        self.first_voice_at = None;
        self.last_voice_at = None;
    }

    fn enter_awaiting(&mut self) {
        self.state = TurnState::AwaitingResponse;
        self.first_voice_at = None;
        self.last_voice_at = None;
    }
}

impl Default for TurnController {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_TIMEOUT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
