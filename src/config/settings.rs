//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`, so a partial `settings.toml` only
//! needs the keys it changes.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Environment variable that overrides `session.api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

// ---------------------------------------------------------------------------
// ResponseModality
// ---------------------------------------------------------------------------

/// What the model answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseModality {
    /// Synthesised speech (24 kHz PCM16).
    Audio,
    /// Plain text parts only.
    Text,
}

impl Default for ResponseModality {
    fn default() -> Self {
        Self::Audio
    }
}

impl ResponseModality {
    /// Name used on the wire.
    pub fn as_wire(&self) -> &'static str {
        match self {
            ResponseModality::Audio => "AUDIO",
            ResponseModality::Text => "TEXT",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Settings for the streaming AI session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// WebSocket endpoint of the bidirectional streaming API.
    pub endpoint: String,
    /// API key appended as the `key` query parameter.  `None` means read
    /// [`API_KEY_ENV`] at startup.
    pub api_key: Option<String>,
    /// Model identity, e.g. `"models/gemini-2.0-flash-exp"`.
    pub model: String,
    pub response_modality: ResponseModality,
    /// Prebuilt voice name used for synthesised speech.
    pub voice: String,
    /// Optional system instruction sent with the setup message.
    pub system_instruction: Option<String>,
    /// Optional text turn sent right after setup to warm the model up.
    pub warmup_text: Option<String>,
    /// Seconds to wait for the WebSocket handshake.
    pub connect_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent".into(),
            api_key: None,
            model: "models/gemini-2.0-flash-exp".into(),
            response_modality: ResponseModality::default(),
            voice: "Puck".into(),
            system_instruction: Some(
                "You are a live interpreter. Translate everything the user says into the target language and speak only the translation.".into(),
            ),
            warmup_text: None,
            connect_timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate the session expects microphone audio at.
    pub input_sample_rate: u32,
    /// Samples per outbound chunk.
    pub chunk_size: usize,
    /// Input device name; `None` means the system default.
    pub input_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: 16_000,
            chunk_size: 4096,
            input_device: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TurnConfig
// ---------------------------------------------------------------------------

/// Voice-activity and turn-taking thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Chunk volume above which the chunk counts as voice.
    pub voice_threshold: u32,
    /// Inspect every N-th sample when scoring a chunk.
    pub vad_stride: usize,
    /// Silence after the last voiced chunk that ends the user's turn.
    pub silence_timeout_ms: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            voice_threshold: 5,
            vad_stride: 4,
            silence_timeout_ms: 1200,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Whether the global listener is started at all.
    pub enabled: bool,
    /// Key that ends the user's turn immediately (e.g. `"F9"`).
    pub force_end_turn_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            force_end_turn_key: "F9".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TranslateConfig
// ---------------------------------------------------------------------------

/// Settings for the text translation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Translate model text parts as they arrive.
    pub enabled: bool,
    /// Base URL; requests go to `{base_url}/translate`.
    pub base_url: String,
    /// Source language code.
    pub from: String,
    /// Target language code.
    pub to: String,
    /// Maximum seconds to wait for a translation.
    pub timeout_secs: u64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:3000/api".into(),
            from: "en".into(),
            to: "es".into(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use live_translate::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub audio: AudioConfig,
    pub turn: TurnConfig,
    pub hotkey: HotkeyConfig,
    pub translate: TranslateConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill `session.api_key` from `value` when it is a non-empty string.
    ///
    /// `main` passes `std::env::var(API_KEY_ENV).ok()`.
    pub fn with_api_key_override(mut self, value: Option<String>) -> Self {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            self.session.api_key = Some(key);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
