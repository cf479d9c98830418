//! Text translation client.
//!
//! * [`Translator`] — async trait implemented by translation backends.
//! * [`ApiTranslator`] — HTTP client for the `{text, from, to} → {translation}`
//!   endpoint.
//! * [`TranslateError`] — error variants for translation calls.
//!
//! The orchestrator uses it to translate model text parts when
//! `translate.enabled` is set; failures are logged and ignored.

pub mod client;

pub use client::{ApiTranslator, TranslateError, Translator};
