//! Duplex WebSocket channel to the streaming AI endpoint.
//!
//! [`GeminiLiveChannel::connect`] opens the socket, splits it and spawns two
//! tasks:
//!
//! ```text
//! send_audio / send_turn_complete / close
//!        │  (unbounded mpsc of Message)
//!        ▼
//!   writer task ──▶ WebSocket sink
//!
//!   WebSocket stream ──▶ reader task ──▶ SessionEvent::MessageReceived
//!                                    └─▶ SessionEvent::ChannelClosed
//! ```
//!
//! Every outbound call only queues a frame, so it never blocks the caller.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::audio::AudioChunk;
use crate::config::SessionConfig;
use crate::pipeline::SessionEvent;

use super::protocol::{ClientMessage, ServerMessage};

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no API key configured (set session.api_key or GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("connection timed out after {0}s")]
    Timeout(u64),

    #[error("failed to connect: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("session is closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// SessionChannel
// ---------------------------------------------------------------------------

/// Outbound side of a live session, as seen by the orchestrator.
///
/// Implementations must not block: frames are queued and written elsewhere.
pub trait SessionChannel: Send {
    /// Stream one captured chunk.
    fn send_audio(&mut self, chunk: &AudioChunk) -> Result<(), SessionError>;

    /// Tell the model the user's turn is over.
    fn send_turn_complete(&mut self) -> Result<(), SessionError>;

    /// Close the connection.  Calling it again is a no-op.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

// ---------------------------------------------------------------------------
// GeminiLiveChannel
// ---------------------------------------------------------------------------

pub struct GeminiLiveChannel {
    outbound: Option<mpsc::UnboundedSender<Message>>,
    configured: bool,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl GeminiLiveChannel {
    /// Connect, send the setup message and (if configured) the warm-up turn.
    ///
    /// Inbound messages and the eventual close are delivered on `events`.
    pub async fn connect(
        config: &SessionConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self, SessionError> {
        let url = endpoint_url(config)?;
        let timeout = config.connect_timeout_secs;

        log::info!("session: connecting to {}", config.endpoint);
        let (ws, _) = tokio::time::timeout(Duration::from_secs(timeout), connect_async(url.as_str()))
            .await
            .map_err(|_| SessionError::Timeout(timeout))??;
        log::info!("session: connected");

        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = sink.send(msg).await {
                    log::warn!("session: write failed: {e}");
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = sink.close().await;
            log::debug!("session: writer finished");
        });

        let reader = tokio::spawn(async move {
            let reason = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => forward_frame(&text, &events),
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => forward_frame(text, &events),
                        Err(e) => log::warn!("session: dropping non-UTF-8 binary frame: {e}"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Some(e.to_string()),
                    None => break None,
                }
            };
            log::info!(
                "session: connection closed ({})",
                reason.as_deref().unwrap_or("no reason")
            );
            let _ = events.send(SessionEvent::ChannelClosed { reason });
        });

        let mut channel = Self {
            outbound: Some(out_tx),
            configured: false,
            writer,
            reader,
        };

        channel.send(&ClientMessage::setup(config))?;
        channel.configured = true;
        log::debug!("session: setup sent for {}", config.model);

        if let Some(text) = config.warmup_text.as_deref().filter(|t| !t.trim().is_empty()) {
            channel.send(&ClientMessage::text_turn(text))?;
            log::debug!("session: warm-up turn sent");
        }

        Ok(channel)
    }

    /// `true` once the setup message has been queued.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    fn send(&mut self, msg: &ClientMessage) -> Result<(), SessionError> {
        let json = msg.to_json()?;
        let tx = self.outbound.as_ref().ok_or(SessionError::Closed)?;
        tx.send(Message::Text(json)).map_err(|_| SessionError::Closed)
    }
}

impl SessionChannel for GeminiLiveChannel {
    fn send_audio(&mut self, chunk: &AudioChunk) -> Result<(), SessionError> {
        self.send(&ClientMessage::audio(chunk))
    }

    fn send_turn_complete(&mut self) -> Result<(), SessionError> {
        self.send(&ClientMessage::turn_complete())
    }

    fn close(&mut self) {
        if let Some(tx) = self.outbound.take() {
            let _ = tx.send(Message::Close(None));
            log::info!("session: closing");
        }
    }

    fn is_open(&self) -> bool {
        self.outbound.is_some() && !self.writer.is_finished() && !self.reader.is_finished()
    }
}

impl Drop for GeminiLiveChannel {
    fn drop(&mut self) {
        self.close();
        self.reader.abort();
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `endpoint` with the API key appended as the `key` query parameter.
fn endpoint_url(config: &SessionConfig) -> Result<String, SessionError> {
    let key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or(SessionError::MissingApiKey)?;
    let sep = if config.endpoint.contains('?') { '&' } else { '?' };
    Ok(format!("{}{sep}key={}", config.endpoint, key.trim()))
}

fn forward_frame(text: &str, events: &mpsc::UnboundedSender<SessionEvent>) {
    match ServerMessage::parse(text) {
        Ok(msg) => {
            let _ = events.send(SessionEvent::MessageReceived(msg));
        }
        Err(e) => log::warn!("session: dropping unparseable frame: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
