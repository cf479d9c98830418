//! Remote session — the duplex streaming connection to the AI model.
//!
//! [`protocol`] holds the JSON wire shapes; [`channel`] owns the WebSocket
//! and exposes the non-blocking [`SessionChannel`] seam the orchestrator
//! drives.

pub mod channel;
pub mod protocol;

pub use channel::{GeminiLiveChannel, SessionChannel, SessionError};
pub use protocol::{ClientMessage, InlineData, ServerMessage};
