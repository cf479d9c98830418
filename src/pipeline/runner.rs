//! Session orchestrator — drives one live translation session.
//!
//! [`SessionOrchestrator`] owns the [`TurnController`], the session channel
//! and the audio device handles, and responds to [`SessionEvent`]s received
//! over a `tokio::sync::mpsc` channel.
//!
//! # Event flow
//!
//! ```text
//! ChunkCaptured
//!   └─▶ gate closed?  → drop
//!   └─▶ TurnController::on_chunk
//!         ├─ Transmit → channel.send_audio
//!         └─ EndTurn  → channel.send_turn_complete   [AwaitingResponse]
//!
//! MessageReceived
//!   ├─ audio parts → decode_base64_pcm16 → output.play
//!   ├─ text parts  → status, optional translation task
//!   └─ response    → TurnController::on_response     [Idle]
//!
//! ForceEndTurn    → TurnController::force_end_turn → channel.send_turn_complete
//! Playback(..)    → speaking flag
//! ChannelClosed / DeviceLost / Shutdown → teardown (idempotent), loop ends
//! ```

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::audio::{decode_base64_pcm16, AudioChunk, AudioHandle, AudioOutput, PlaybackEvent};
use crate::config::ResponseModality;
use crate::session::{ServerMessage, SessionChannel, SessionError};
use crate::translate::Translator;

use super::event::{EventReceiver, EventSender, SessionEvent};
use super::state::SharedState;
use super::turn::{TurnAction, TurnController, TurnState};

/// Status line while the model has ended a turn without answering.
pub const STALLED_STATUS: &str = "Waiting for response (model turn ended without one)";

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Terminal session failures.
///
/// The `Display` text is what ends up in the user-visible status line.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Connection closed: {0}")]
    ChannelClosed(String),

    #[error("Connection lost: {0}")]
    Send(#[from] SessionError),

    #[error("Audio device error: {0}")]
    Device(String),
}

// ---------------------------------------------------------------------------
// SessionOrchestrator
// ---------------------------------------------------------------------------

/// Drives a live session until the channel closes or `Shutdown` arrives.
///
/// ```rust,no_run
/// use live_translate::audio::AudioPlayer;
/// use live_translate::config::AppConfig;
/// use live_translate::pipeline::{event_channel, new_shared_state, SessionEvent, SessionOrchestrator};
/// use live_translate::session::GeminiLiveChannel;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = AppConfig::default();
/// let state = new_shared_state();
/// let (tx, rx) = event_channel();
///
/// let channel = GeminiLiveChannel::connect(&config.session, tx.clone()).await?;
/// let tx_play = tx.clone();
/// let tx_lost = tx.clone();
/// let player = AudioPlayer::start(
///     move |e| {
///         let _ = tx_play.send(SessionEvent::Playback(e));
///     },
///     move |reason| {
///         let _ = tx_lost.send(SessionEvent::DeviceLost(reason));
///     },
/// )?;
///
/// let orchestrator = SessionOrchestrator::new(
///     state,
///     &config,
///     Box::new(channel),
///     Box::new(player),
///     tx,
/// );
/// orchestrator.run(rx).await;
/// # Ok(())
/// # }
/// ```
pub struct SessionOrchestrator {
    state: SharedState,
    turn: TurnController,
    modality: ResponseModality,
    channel: Box<dyn SessionChannel>,
    capture: Option<Box<dyn AudioHandle>>,
    output: Box<dyn AudioOutput>,
    translator: Option<Arc<dyn Translator>>,
    events: EventSender,
    torn_down: bool,
}

impl SessionOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `state`   — shared status, also read by the capture callback.
    /// * `config`  — silence timeout and response modality are taken from it.
    /// * `channel` — connected session channel.
    /// * `output`  — playback device.
    /// * `events`  — sender side of the queue `run` consumes; translation
    ///   tasks report back on it.
    pub fn new(
        state: SharedState,
        config: &crate::config::AppConfig,
        channel: Box<dyn SessionChannel>,
        output: Box<dyn AudioOutput>,
        events: EventSender,
    ) -> Self {
        let timeout = std::time::Duration::from_millis(config.turn.silence_timeout_ms);
        Self {
            state,
            turn: TurnController::new(timeout),
            modality: config.session.response_modality,
            channel,
            capture: None,
            output,
            translator: None,
            events,
            torn_down: false,
        }
    }

    /// Attach the running capture stream so teardown can stop it.
    pub fn with_capture(mut self, capture: Box<dyn AudioHandle>) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Translate model text parts with `translator`.
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn.state()
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Process events until the session ends.  Teardown always runs before
    /// this returns.
    pub async fn run(mut self, mut rx: EventReceiver) {
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.handle(event) {
                self.fail(e);
            }
            if self.torn_down {
                break;
            }
        }

        self.teardown();
        log::info!("pipeline: session orchestrator stopped");
    }

    /// Handle one event.  An `Err` is terminal.
    pub fn handle(&mut self, event: SessionEvent) -> Result<(), PipelineError> {
        if self.torn_down {
            log::debug!("pipeline: ignoring event after teardown");
            return Ok(());
        }

        match event {
            SessionEvent::ChunkCaptured {
                chunk,
                voiced,
                captured_at,
            } => self.handle_chunk(chunk, voiced, captured_at)?,
            SessionEvent::MessageReceived(msg) => self.handle_message(msg),
            SessionEvent::ForceEndTurn => self.handle_force_end_turn()?,
            SessionEvent::Playback(event) => {
                let speaking = event == PlaybackEvent::Started;
                log::debug!("pipeline: speaking = {speaking}");
                self.with_state(|st| st.speaking = speaking);
            }
            SessionEvent::TranslationReady {
                source,
                translation,
            } => {
                log::info!("pipeline: translation {source:?} → {translation:?}");
                self.with_state(|st| st.last_translation = Some(translation));
            }
            SessionEvent::ChannelClosed { reason } => {
                let reason = reason.unwrap_or_else(|| "remote side hung up".into());
                return Err(PipelineError::ChannelClosed(reason));
            }
            SessionEvent::DeviceLost(reason) => return Err(PipelineError::Device(reason)),
            SessionEvent::Shutdown => {
                log::info!("pipeline: shutdown requested");
                self.set_status("Session ended".into());
                self.teardown();
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    fn handle_chunk(
        &mut self,
        chunk: AudioChunk,
        voiced: bool,
        captured_at: Instant,
    ) -> Result<(), PipelineError> {
        // The capture callback gates too, but a chunk may have been queued
        // just before the turn ended.
        if !self.turn.state().accepts_audio() {
            log::trace!("pipeline: dropping chunk while awaiting response");
            return Ok(());
        }

        let before = self.turn.state();
        match self.turn.on_chunk(voiced, captured_at) {
            TurnAction::Transmit => self.channel.send_audio(&chunk)?,
            TurnAction::EndTurn => {
                log::info!("pipeline: silence timeout, ending user turn");
                self.channel.send_turn_complete()?;
            }
            TurnAction::Discard => {}
        }

        if self.turn.state() != before {
            self.sync_turn();
        }
        Ok(())
    }

    fn handle_message(&mut self, msg: ServerMessage) {
        if msg.is_setup_complete() {
            log::info!("pipeline: session setup complete");
        }
        if msg.is_interrupted() {
            log::debug!("pipeline: model turn interrupted");
        }

        for part in msg.audio_parts() {
            match decode_base64_pcm16(&part.data) {
                Ok(buffer) => self.output.play(buffer),
                Err(e) => log::warn!("pipeline: dropping undecodable audio part: {e}"),
            }
        }

        for text in msg.text_parts() {
            log::info!("pipeline: model text {text:?}");
            self.with_state(|st| st.last_text = Some(text.to_string()));
            self.spawn_translation(text.to_string());
        }

        let is_response = match self.modality {
            ResponseModality::Audio => msg.has_audio(),
            ResponseModality::Text => msg.has_text(),
        };
        if is_response && self.turn.on_response() {
            log::info!("pipeline: response arrived, listening again");
            self.sync_turn();
        }

        if msg.is_turn_complete() {
            if self.turn.state() == TurnState::AwaitingResponse {
                log::warn!(
                    "pipeline: model finished its turn without a {} response; \
                     still waiting",
                    self.modality.as_wire().to_lowercase()
                );
                self.set_status(STALLED_STATUS.into());
            } else {
                log::debug!("pipeline: model turn complete");
            }
        }
    }

    fn handle_force_end_turn(&mut self) -> Result<(), PipelineError> {
        if self.turn.force_end_turn() {
            log::info!("pipeline: user forced end of turn");
            self.channel.send_turn_complete()?;
            self.sync_turn();
        } else {
            log::debug!("pipeline: force end of turn ignored, already awaiting response");
        }
        Ok(())
    }

    fn spawn_translation(&self, text: String) {
        let Some(translator) = self.translator.as_ref().map(Arc::clone) else {
            return;
        };
        let events = self.events.clone();
        tokio::spawn(async move {
            match translator.translate(&text).await {
                Ok(translation) => {
                    let _ = events.send(SessionEvent::TranslationReady {
                        source: text,
                        translation,
                    });
                }
                Err(e) => log::warn!("pipeline: translation failed: {e}"),
            }
        });
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Close the channel, release both audio devices and reset the turn
    /// controller.  Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.channel.close();
        if let Some(mut capture) = self.capture.take() {
            capture.shutdown();
        }
        self.output.shutdown();
        self.turn.reset();

        self.with_state(|st| {
            st.turn = TurnState::Idle;
            st.speaking = false;
            st.closed = true;
        });
        log::info!("pipeline: session torn down");
    }

    /// Report a terminal error in the status line and tear down.
    pub fn fail(&mut self, error: PipelineError) {
        log::error!("pipeline error: {error}");
        self.set_status(error.to_string());
        self.teardown();
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn sync_turn(&self) {
        let turn = self.turn.state();
        self.with_state(|st| {
            st.turn = turn;
            st.status_message = turn.label().to_string();
        });
    }

    fn set_status(&self, message: String) {
        self.with_state(|st| st.status_message = message);
    }

    fn with_state(&self, f: impl FnOnce(&mut super::state::SessionStatus)) {
        match self.state.lock() {
            Ok(mut st) => f(&mut *st),
            Err(e) => log::error!("pipeline: state lock poisoned: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{encode_base64, PlayableBuffer};
    use crate::config::AppConfig;
    use crate::pipeline::event::event_channel;
    use crate::pipeline::state::new_shared_state;
    use crate::translate::TranslateError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Audio(usize),
        TurnComplete,
    }

    #[derive(Default)]
    struct ChannelLog {
        sent: Vec<Sent>,
        closes: usize,
    }

    /// Session channel that records every call.
    struct RecordingChannel {
        log: Arc<Mutex<ChannelLog>>,
        fail_sends: bool,
    }

    impl SessionChannel for RecordingChannel {
        fn send_audio(&mut self, chunk: &AudioChunk) -> Result<(), SessionError> {
            if self.fail_sends {
                return Err(SessionError::Closed);
            }
            self.log.lock().unwrap().sent.push(Sent::Audio(chunk.len()));
            Ok(())
        }

        fn send_turn_complete(&mut self) -> Result<(), SessionError> {
            if self.fail_sends {
                return Err(SessionError::Closed);
            }
            self.log.lock().unwrap().sent.push(Sent::TurnComplete);
            Ok(())
        }

        fn close(&mut self) {
            self.log.lock().unwrap().closes += 1;
        }

        fn is_open(&self) -> bool {
            self.log.lock().unwrap().closes == 0
        }
    }

    #[derive(Default)]
    struct DeviceLog {
        played: Vec<PlayableBuffer>,
        output_shutdowns: usize,
        capture_shutdowns: usize,
    }

    struct MockOutput(Arc<Mutex<DeviceLog>>);

    impl AudioHandle for MockOutput {
        fn shutdown(&mut self) {
            self.0.lock().unwrap().output_shutdowns += 1;
        }
    }

    impl AudioOutput for MockOutput {
        fn play(&mut self, buffer: PlayableBuffer) {
            self.0.lock().unwrap().played.push(buffer);
        }
    }

    struct MockCapture(Arc<Mutex<DeviceLog>>);

    impl AudioHandle for MockCapture {
        fn shutdown(&mut self) {
            self.0.lock().unwrap().capture_shutdowns += 1;
        }
    }

    struct OkTranslator(&'static str);

    #[async_trait]
    impl Translator for OkTranslator {
        async fn translate(&self, _text: &str) -> Result<String, TranslateError> {
            Ok(self.0.to_string())
        }
    }

    struct FailTranslator;

    #[async_trait]
    impl Translator for FailTranslator {
        async fn translate(&self, _text: &str) -> Result<String, TranslateError> {
            Err(TranslateError::Timeout)
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    struct Harness {
        orc: SessionOrchestrator,
        state: SharedState,
        channel: Arc<Mutex<ChannelLog>>,
        devices: Arc<Mutex<DeviceLog>>,
        tx: EventSender,
        rx: EventReceiver,
    }

    fn harness_with(config: AppConfig, fail_sends: bool) -> Harness {
        let state = new_shared_state();
        let channel = Arc::new(Mutex::new(ChannelLog::default()));
        let devices = Arc::new(Mutex::new(DeviceLog::default()));
        let (tx, rx) = event_channel();

        let orc = SessionOrchestrator::new(
            Arc::clone(&state),
            &config,
            Box::new(RecordingChannel {
                log: Arc::clone(&channel),
                fail_sends,
            }),
            Box::new(MockOutput(Arc::clone(&devices))),
            tx.clone(),
        )
        .with_capture(Box::new(MockCapture(Arc::clone(&devices))));

        Harness {
            orc,
            state,
            channel,
            devices,
            tx,
            rx,
        }
    }

    fn harness() -> Harness {
        harness_with(AppConfig::default(), false)
    }

    /// 4096 samples at 16 kHz is 256 ms.
    const CHUNK: usize = 4096;
    const CHUNK_MS: u64 = 256;

    fn chunk_event(voiced: bool, at: Instant) -> SessionEvent {
        let amplitude = if voiced { 0.3 } else { 0.0 };
        SessionEvent::ChunkCaptured {
            chunk: AudioChunk::from_f32(&vec![amplitude; CHUNK], 16_000),
            voiced,
            captured_at: at,
        }
    }

    fn audio_message() -> SessionEvent {
        let data = encode_base64(&[0.25; 240]);
        let frame = format!(
            r#"{{"serverContent":{{"modelTurn":{{"parts":[{{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{data}"}}}}]}}}}}}"#
        );
        SessionEvent::MessageReceived(ServerMessage::parse(&frame).unwrap())
    }

    fn text_message(text: &str) -> SessionEvent {
        let frame = format!(
            r#"{{"serverContent":{{"modelTurn":{{"parts":[{{"text":"{text}"}}]}}}}}}"#
        );
        SessionEvent::MessageReceived(ServerMessage::parse(&frame).unwrap())
    }

    fn turn_completes(log: &Arc<Mutex<ChannelLog>>) -> usize {
        log.lock()
            .unwrap()
            .sent
            .iter()
            .filter(|s| **s == Sent::TurnComplete)
            .count()
    }

    fn audio_sent(log: &Arc<Mutex<ChannelLog>>) -> usize {
        log.lock()
            .unwrap()
            .sent
            .iter()
            .filter(|s| matches!(s, Sent::Audio(_)))
            .count()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// 2 s of voice then 1.5 s of silence: exactly one turn-complete, and
    /// nothing goes out after it until the model answers.
    #[tokio::test]
    async fn voice_then_silence_ends_turn_exactly_once() {
        let mut h = harness();
        let t0 = Instant::now();
        let mut at = t0;

        // 8 voiced chunks ≈ 2 s.
        for _ in 0..8 {
            h.orc.handle(chunk_event(true, at)).unwrap();
            at += Duration::from_millis(CHUNK_MS);
        }
        assert_eq!(h.orc.turn_state(), TurnState::UserTalking);

        // 6 silent chunks ≈ 1.5 s.
        for _ in 0..6 {
            h.orc.handle(chunk_event(false, at)).unwrap();
            at += Duration::from_millis(CHUNK_MS);
        }

        assert_eq!(turn_completes(&h.channel), 1);
        assert_eq!(h.orc.turn_state(), TurnState::AwaitingResponse);
        assert_eq!(
            h.state.lock().unwrap().turn,
            TurnState::AwaitingResponse
        );

        // Last voice at 1792 ms; silence chunks at 2048, 2304, 2560, 2816
        // are sent and the one at 3072 (> 1200 ms later) ends the turn.
        assert_eq!(audio_sent(&h.channel), 8 + 4);
        let sent = h.channel.lock().unwrap().sent.clone();
        assert_eq!(sent.last(), Some(&Sent::TurnComplete));

        // More voice while awaiting: nothing transmitted.
        for _ in 0..4 {
            h.orc.handle(chunk_event(true, at)).unwrap();
            at += Duration::from_millis(CHUNK_MS);
        }
        assert_eq!(audio_sent(&h.channel), 12);
        assert_eq!(turn_completes(&h.channel), 1);

        // The model answers: outbound resumes.
        h.orc.handle(audio_message()).unwrap();
        assert_eq!(h.orc.turn_state(), TurnState::Idle);
        h.orc.handle(chunk_event(false, at)).unwrap();
        assert_eq!(audio_sent(&h.channel), 13);
    }

    #[tokio::test]
    async fn short_pauses_do_not_end_turn() {
        let mut h = harness();
        let t0 = Instant::now();
        for i in 0..40u64 {
            let voiced = i % 3 == 0;
            h.orc
                .handle(chunk_event(voiced, t0 + Duration::from_millis(i * CHUNK_MS)))
                .unwrap();
        }
        assert_eq!(turn_completes(&h.channel), 0);
        assert_eq!(audio_sent(&h.channel), 40);
    }

    #[tokio::test]
    async fn inbound_audio_is_decoded_and_played() {
        let mut h = harness();
        h.orc.handle(audio_message()).unwrap();

        let devices = h.devices.lock().unwrap();
        assert_eq!(devices.played.len(), 1);
        let buffer = &devices.played[0];
        assert_eq!(buffer.sample_rate, 24_000);
        assert_eq!(buffer.channels, 1);
        assert_eq!(buffer.samples.len(), 240);
    }

    #[tokio::test]
    async fn undecodable_audio_does_not_end_session() {
        let mut h = harness();
        h.orc.handle(SessionEvent::ForceEndTurn).unwrap();

        let frame = r#"{"serverContent":{"modelTurn":{"parts":[{"inlineData":{"mimeType":"audio/pcm","data":"AAA"}}]}}}"#;
        let msg = ServerMessage::parse(frame).unwrap();
        h.orc.handle(SessionEvent::MessageReceived(msg)).unwrap();

        assert!(!h.orc.is_torn_down());
        assert!(h.devices.lock().unwrap().played.is_empty());
        // The response still counts: the gate reopens.
        assert_eq!(h.orc.turn_state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn force_end_turn_signals_once() {
        let mut h = harness();
        h.orc.handle(chunk_event(true, Instant::now())).unwrap();

        h.orc.handle(SessionEvent::ForceEndTurn).unwrap();
        h.orc.handle(SessionEvent::ForceEndTurn).unwrap();

        assert_eq!(turn_completes(&h.channel), 1);
        assert_eq!(h.orc.turn_state(), TurnState::AwaitingResponse);
        assert_eq!(
            h.state.lock().unwrap().status_message,
            "Waiting for response"
        );
    }

    #[tokio::test]
    async fn text_only_message_does_not_reopen_audio_session() {
        let mut h = harness();
        h.orc.handle(SessionEvent::ForceEndTurn).unwrap();
        h.orc.handle(text_message("hola")).unwrap();

        assert_eq!(h.orc.turn_state(), TurnState::AwaitingResponse);
        assert_eq!(h.state.lock().unwrap().last_text.as_deref(), Some("hola"));
    }

    #[tokio::test]
    async fn text_modality_reopens_on_text() {
        let mut config = AppConfig::default();
        config.session.response_modality = ResponseModality::Text;
        let mut h = harness_with(config, false);

        h.orc.handle(SessionEvent::ForceEndTurn).unwrap();
        h.orc.handle(text_message("hola")).unwrap();
        assert_eq!(h.orc.turn_state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn playback_events_track_speaking() {
        let mut h = harness();
        h.orc
            .handle(SessionEvent::Playback(PlaybackEvent::Started))
            .unwrap();
        assert!(h.state.lock().unwrap().speaking);
        h.orc
            .handle(SessionEvent::Playback(PlaybackEvent::Ended))
            .unwrap();
        assert!(!h.state.lock().unwrap().speaking);
    }

    #[tokio::test]
    async fn translation_result_reaches_state() {
        let h = harness();
        let Harness {
            orc, state, tx, rx, ..
        } = h;
        let orc = orc.with_translator(Arc::new(OkTranslator("hello")));

        tx.send(text_message("hola")).unwrap();

        // Wait for the translation task to report back, then stop.
        let stopper = async {
            for _ in 0..100 {
                if state.lock().unwrap().last_translation.is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            tx.send(SessionEvent::Shutdown).unwrap();
        };
        tokio::join!(orc.run(rx), stopper);

        let st = state.lock().unwrap();
        assert_eq!(st.last_text.as_deref(), Some("hola"));
        assert_eq!(st.last_translation.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn translation_failure_is_ignored() {
        let Harness {
            orc, state, tx, rx, ..
        } = harness();
        let orc = orc.with_translator(Arc::new(FailTranslator));

        tx.send(text_message("hola")).unwrap();
        tx.send(SessionEvent::Shutdown).unwrap();
        orc.run(rx).await;

        let st = state.lock().unwrap();
        assert_eq!(st.last_text.as_deref(), Some("hola"));
        assert!(st.last_translation.is_none());
        assert_eq!(st.status_message, "Session ended");
    }

    #[tokio::test]
    async fn channel_close_tears_down_with_status() {
        let Harness {
            orc,
            state,
            channel,
            devices,
            tx,
            rx,
        } = harness();

        tx.send(SessionEvent::ChannelClosed {
            reason: Some("quota exceeded".into()),
        })
        .unwrap();
        // Queued after the close: must be ignored.
        tx.send(chunk_event(true, Instant::now())).unwrap();
        orc.run(rx).await;

        let st = state.lock().unwrap();
        assert!(st.closed);
        assert_eq!(st.status_message, "Connection closed: quota exceeded");
        assert_eq!(channel.lock().unwrap().closes, 1);
        assert!(channel.lock().unwrap().sent.is_empty());
        let devices = devices.lock().unwrap();
        assert_eq!(devices.capture_shutdowns, 1);
        assert_eq!(devices.output_shutdowns, 1);
    }

    #[tokio::test]
    async fn lost_device_tears_down_with_status() {
        let Harness {
            orc,
            state,
            channel,
            devices,
            tx,
            rx,
        } = harness();

        tx.send(SessionEvent::DeviceLost("microphone: device unplugged".into()))
            .unwrap();
        orc.run(rx).await;

        let st = state.lock().unwrap();
        assert!(st.closed);
        assert_eq!(
            st.status_message,
            "Audio device error: microphone: device unplugged"
        );
        assert_eq!(channel.lock().unwrap().closes, 1);
        let devices = devices.lock().unwrap();
        assert_eq!(devices.capture_shutdowns, 1);
        assert_eq!(devices.output_shutdowns, 1);
    }

    #[tokio::test]
    async fn model_turn_without_audio_keeps_waiting() {
        let mut h = harness();
        h.orc.handle(SessionEvent::ForceEndTurn).unwrap();

        let frame = r#"{"serverContent":{"modelTurn":{"parts":[{"text":"hola"}]},"turnComplete":true}}"#;
        h.orc
            .handle(SessionEvent::MessageReceived(ServerMessage::parse(frame).unwrap()))
            .unwrap();

        assert!(!h.orc.is_torn_down());
        assert_eq!(h.orc.turn_state(), TurnState::AwaitingResponse);
        assert_eq!(turn_completes(&h.channel), 1);
        assert_eq!(h.state.lock().unwrap().status_message, STALLED_STATUS);

        // Audio still reopens the gate afterwards.
        h.orc.handle(audio_message()).unwrap();
        assert_eq!(h.orc.turn_state(), TurnState::Idle);
        assert_eq!(h.state.lock().unwrap().status_message, "Listening");
    }

    #[tokio::test]
    async fn send_failure_is_terminal() {
        let Harness {
            orc,
            state,
            tx,
            rx,
            ..
        } = harness_with(AppConfig::default(), true);

        tx.send(chunk_event(false, Instant::now())).unwrap();
        orc.run(rx).await;

        let st = state.lock().unwrap();
        assert!(st.closed);
        assert!(st.status_message.starts_with("Connection lost"));
    }

    #[tokio::test]
    async fn teardown_is_idempotent() {
        let mut h = harness();
        h.orc.handle(chunk_event(true, Instant::now())).unwrap();

        h.orc.teardown();
        h.orc.teardown();
        h.orc.handle(SessionEvent::Shutdown).unwrap();

        assert_eq!(h.channel.lock().unwrap().closes, 1);
        let devices = h.devices.lock().unwrap();
        assert_eq!(devices.capture_shutdowns, 1);
        assert_eq!(devices.output_shutdowns, 1);
        assert_eq!(h.orc.turn_state(), TurnState::Idle);
        assert!(!h.state.lock().unwrap().accepts_audio());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_even_with_live_senders() {
        let Harness {
            orc, state, tx, rx, ..
        } = harness();
        tx.send(SessionEvent::Shutdown).unwrap();
        // `tx` is still alive; run must return anyway.
        orc.run(rx).await;
        assert!(state.lock().unwrap().closed);
        drop(tx);
    }
}
