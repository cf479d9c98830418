//! Application entry point — live translation client.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (defaults on first run) and apply the
//!    `GEMINI_API_KEY` override.
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Connect the session channel.
//! 5. Open the output device.
//! 6. Build the [`SessionOrchestrator`].
//! 7. Start the cpal capture stream behind a [`CaptureGate`].
//! 8. Spawn the hotkey listener thread and the ctrl-c watcher.
//! 9. Drive the orchestrator on the main thread until the session ends.
//!
//! Any failure in steps 4 to 7 is terminal: everything already opened is
//! released and the reason is logged as the final status.

use std::sync::Arc;
use std::time::{Duration, Instant};

use live_translate::{
    audio::{AudioCapture, AudioPlayer, CaptureError, ChunkFramer, StreamHandle, VoiceDetector},
    config::{AppConfig, API_KEY_ENV},
    hotkey::{parse_key, HotkeyListener},
    pipeline::{
        event_channel, new_shared_state, CaptureGate, EventSender, PipelineError, SessionEvent,
        SessionOrchestrator, SharedState,
    },
    session::GeminiLiveChannel,
    translate::ApiTranslator,
};

/// Time given to the channel writer to flush the close frame on exit.
const CLOSE_GRACE: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Capture wiring
// ---------------------------------------------------------------------------

/// Open the microphone and forward framed, classified chunks as
/// [`SessionEvent::ChunkCaptured`] through a [`CaptureGate`].
fn start_capture(
    config: &AppConfig,
    state: SharedState,
    tx: EventSender,
) -> Result<StreamHandle, CaptureError> {
    let rate = config.audio.input_sample_rate;
    let capture = AudioCapture::new(config.audio.input_device.as_deref(), rate)?;

    let framer = ChunkFramer::new(rate, config.audio.chunk_size.max(1));
    let vad = VoiceDetector::with_stride(
        config.turn.voice_threshold,
        config.turn.vad_stride.max(1),
    );
    let tx_lost = tx.clone();
    let mut gate = CaptureGate::new(framer, vad, state, tx, rate);

    let handle = capture.start(
        move |frame| {
            gate.on_frame(&frame, Instant::now());
        },
        move |reason| {
            let _ = tx_lost.send(SessionEvent::DeviceLost(reason));
        },
    )?;

    log::info!(
        "capture: {} Hz, {} ch → {} Hz mono, {} samples per chunk",
        capture.sample_rate(),
        capture.channels(),
        rate,
        config.audio.chunk_size
    );
    Ok(handle)
}

fn report_failure(state: &SharedState, message: String) {
    log::error!("{message}");
    if let Ok(mut st) = state.lock() {
        st.status_message = message;
        st.closed = true;
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("live-translate starting up");

    // 2. Configuration
    let config = AppConfig::load()
        .unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        })
        .with_api_key_override(std::env::var(API_KEY_ENV).ok());

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let state = new_shared_state();
    let (tx, rx) = event_channel();

    // 4. Session channel
    let channel = match rt.block_on(GeminiLiveChannel::connect(&config.session, tx.clone())) {
        Ok(channel) => channel,
        Err(e) => {
            report_failure(&state, format!("Could not connect: {e}"));
            return Err(e.into());
        }
    };

    // 5. Output device
    let tx_play = tx.clone();
    let tx_lost = tx.clone();
    let player = match AudioPlayer::start(
        move |event| {
            let _ = tx_play.send(SessionEvent::Playback(event));
        },
        move |reason| {
            let _ = tx_lost.send(SessionEvent::DeviceLost(reason));
        },
    ) {
        Ok(player) => player,
        Err(e) => {
            let err = PipelineError::Device(e.to_string());
            report_failure(&state, err.to_string());
            drop(channel);
            rt.block_on(tokio::time::sleep(CLOSE_GRACE));
            return Err(err.into());
        }
    };

    // 6. Orchestrator
    let mut orchestrator = SessionOrchestrator::new(
        Arc::clone(&state),
        &config,
        Box::new(channel),
        Box::new(player),
        tx.clone(),
    );
    if config.translate.enabled {
        log::info!(
            "translate: {} → {} via {}",
            config.translate.from,
            config.translate.to,
            config.translate.base_url
        );
        orchestrator =
            orchestrator.with_translator(Arc::new(ApiTranslator::from_config(&config.translate)));
    }

    // 7. Capture
    match start_capture(&config, Arc::clone(&state), tx.clone()) {
        Ok(handle) => orchestrator = orchestrator.with_capture(Box::new(handle)),
        Err(e) => {
            let message = e.to_string();
            orchestrator.fail(PipelineError::Device(message.clone()));
            rt.block_on(tokio::time::sleep(CLOSE_GRACE));
            return Err(PipelineError::Device(message).into());
        }
    }

    // 8. Hotkey and ctrl-c
    let _hotkey_listener = if config.hotkey.enabled {
        let key = parse_key(&config.hotkey.force_end_turn_key).unwrap_or_else(|| {
            log::warn!(
                "Unknown hotkey {:?}; using F9",
                config.hotkey.force_end_turn_key
            );
            rdev::Key::F9
        });
        match HotkeyListener::start(key, tx.clone()) {
            Ok(listener) => {
                log::info!("hotkey: {key:?} ends the current turn");
                Some(listener)
            }
            Err(e) => {
                log::warn!("hotkey: listener unavailable: {e}");
                None
            }
        }
    } else {
        None
    };

    let tx_signal = tx.clone();
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx_signal.send(SessionEvent::Shutdown);
        }
    });
    drop(tx);

    // 9. Run until the session ends
    log::info!("Listening. Speak, then pause to hand the turn to the model.");
    rt.block_on(async {
        orchestrator.run(rx).await;
        tokio::time::sleep(CLOSE_GRACE).await;
    });

    if let Ok(st) = state.lock() {
        log::info!("Final status: {}", st.status_message);
    }
    Ok(())
}
