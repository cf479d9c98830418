//! Shared session status.
//!
//! [`SessionStatus`] is the single source of truth for everything outside the
//! orchestrator needs to know: the current turn state (read by the capture
//! callback to gate chunks at the source), whether model audio is playing,
//! and the user-visible status line.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<SessionStatus>>`, cheap
//! to clone and safe to share across threads.

use std::sync::{Arc, Mutex};

use super::turn::TurnState;

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Snapshot of a live session.
///
/// Only the orchestrator writes it.  The cpal capture callback reads
/// [`turn`](Self::turn) on every frame, so keep critical sections short.
#[derive(Debug, Clone, Default)]
pub struct SessionStatus {
    /// Mirror of the turn controller's state.
    pub turn: TurnState,

    /// `true` while model audio is reaching the speaker.
    pub speaking: bool,

    /// Human-readable status line ("Listening", "Connection closed", ...).
    pub status_message: String,

    /// Most recent model text part.
    pub last_text: Option<String>,

    /// Translation of `last_text`, when translation is enabled.
    pub last_translation: Option<String>,

    /// Set once the session has been torn down.
    pub closed: bool,
}

impl SessionStatus {
    pub fn new() -> Self {
        Self {
            status_message: TurnState::Idle.label().to_string(),
            ..Self::default()
        }
    }

    /// Whether a freshly captured chunk may be enqueued.
    pub fn accepts_audio(&self) -> bool {
        !self.closed && self.turn.accepts_audio()
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`SessionStatus`].
///
/// Lock for a short critical section; do **not** hold the lock across
/// `.await` points.
pub type SharedState = Arc<Mutex<SessionStatus>>;

pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(SessionStatus::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_status_is_idle_and_open() {
        let st = SessionStatus::new();
        assert_eq!(st.turn, TurnState::Idle);
        assert_eq!(st.status_message, "Listening");
        assert!(!st.speaking);
        assert!(!st.closed);
        assert!(st.last_text.is_none());
        assert!(st.accepts_audio());
    }

    #[test]
    fn gate_closes_while_awaiting_or_closed() {
        let mut st = SessionStatus::new();
        st.turn = TurnState::AwaitingResponse;
        assert!(!st.accepts_audio());

        st.turn = TurnState::UserTalking;
        assert!(st.accepts_audio());

        st.closed = true;
        assert!(!st.accepts_audio());
    }

    #[test]
    fn shared_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedState>();
    }

    #[test]
    fn shared_state_can_be_cloned_and_mutated() {
        let state = new_shared_state();
        let state2 = Arc::clone(&state);

        state.lock().unwrap().turn = TurnState::UserTalking;
        assert_eq!(state2.lock().unwrap().turn, TurnState::UserTalking);
    }
}
