//! JSON message shapes of the bidirectional streaming API.
//!
//! Outbound messages are built with [`ClientMessage`]; inbound frames are
//! parsed into [`ServerMessage`].  The server mixes camelCase and snake_case
//! field names, so inbound fields accept both spellings.
//!
//! ```text
//! client → server
//!   {"setup": {"model", "generation_config", "system_instruction"}}
//!   {"realtime_input": {"media_chunks": [{"mime_type", "data"}]}}
//!   {"clientContent": {"turns": [...], "turnComplete": true}}
//!
//! server → client
//!   {"setupComplete": {}}
//!   {"serverContent": {"modelTurn": {"parts": [{"inlineData"} | {"text"}]},
//!                      "turnComplete", "interrupted"}}
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::audio::AudioChunk;
use crate::config::SessionConfig;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A message sent from this client to the streaming endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Setup {
        setup: Setup,
    },
    RealtimeInput {
        realtime_input: RealtimeInput,
    },
    ClientContent {
        #[serde(rename = "clientContent")]
        client_content: ClientContent,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// A role-tagged list of text parts.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaChunk {
    pub mime_type: String,
    /// Base64 of little-endian PCM16.
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

impl ClientMessage {
    /// The first message of every session: model identity, response
    /// modality, voice and the optional system instruction.
    pub fn setup(config: &SessionConfig) -> Self {
        let system_instruction = config
            .system_instruction
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .map(|text| Content {
                role: None,
                parts: vec![TextPart { text: text.clone() }],
            });

        ClientMessage::Setup {
            setup: Setup {
                model: config.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: vec![config.response_modality.as_wire().to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: config.voice.clone(),
                            },
                        },
                    },
                },
                system_instruction,
            },
        }
    }

    /// One captured audio chunk.
    pub fn audio(chunk: &AudioChunk) -> Self {
        ClientMessage::RealtimeInput {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: chunk.mime_type().to_string(),
                    data: chunk.to_base64(),
                }],
            },
        }
    }

    /// The end-of-turn signal: no new content, `turnComplete: true`.
    pub fn turn_complete() -> Self {
        ClientMessage::ClientContent {
            client_content: ClientContent {
                turns: Vec::new(),
                turn_complete: true,
            },
        }
    }

    /// A complete user text turn (used for the warm-up prompt).
    pub fn text_turn(text: &str) -> Self {
        ClientMessage::ClientContent {
            client_content: ClientContent {
                turns: vec![Content {
                    role: Some("user".into()),
                    parts: vec![TextPart { text: text.into() }],
                }],
                turn_complete: true,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// One parsed inbound frame.  Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerMessage {
    #[serde(default, rename = "serverContent", alias = "server_content")]
    pub server_content: Option<ServerContent>,
    #[serde(default, rename = "setupComplete", alias = "setup_complete")]
    pub setup_complete: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerContent {
    #[serde(default, rename = "modelTurn", alias = "model_turn")]
    pub model_turn: Option<ModelTurn>,
    #[serde(
        default,
        rename = "turnComplete",
        alias = "turn_complete",
        deserialize_with = "null_as_default"
    )]
    pub turn_complete: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelTurn {
    #[serde(default, deserialize_with = "null_as_default")]
    pub parts: Vec<Part>,
}

/// A response part: inline audio, text, or (rarely) both.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InlineData {
    #[serde(
        default,
        rename = "mimeType",
        alias = "mime_type",
        deserialize_with = "null_as_default"
    )]
    pub mime_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: String,
}

/// `null` reads as the field's default, same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ServerMessage {
    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.is_some()
    }

    pub fn is_turn_complete(&self) -> bool {
        self.server_content
            .as_ref()
            .is_some_and(|c| c.turn_complete)
    }

    pub fn is_interrupted(&self) -> bool {
        self.server_content.as_ref().is_some_and(|c| c.interrupted)
    }

    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.server_content
            .iter()
            .filter_map(|c| c.model_turn.as_ref())
            .flat_map(|t| t.parts.iter())
    }

    /// Base64 payloads of the audio parts, in order.
    pub fn audio_parts(&self) -> impl Iterator<Item = &InlineData> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .filter(|d| d.mime_type.is_empty() || d.mime_type.starts_with("audio/"))
    }

    /// Text parts, in order.  Blank parts are skipped.
    pub fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.parts()
            .filter_map(|p| p.text.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn has_audio(&self) -> bool {
        self.audio_parts().next().is_some()
    }

    pub fn has_text(&self) -> bool {
        self.text_parts().next().is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
