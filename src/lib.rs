//! Live translation voice client.
//!
//! Streams microphone audio to a bidirectional AI session, ends the user's
//! turn after a stretch of silence, and plays back the synthesised reply.
//!
//! * [`audio`] — capture, resampling, PCM16 codec, VAD and playback.
//! * [`config`] — `settings.toml` persistence.
//! * [`hotkey`] — global force-end-of-turn key.
//! * [`pipeline`] — turn controller, shared status and the session
//!   orchestrator.
//! * [`session`] — WebSocket channel and wire protocol.
//! * [`translate`] — text translation client.

pub mod audio;
pub mod config;
pub mod hotkey;
pub mod pipeline;
pub mod session;
pub mod translate;
