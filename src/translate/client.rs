//! `Translator` trait and the HTTP `ApiTranslator`.
//!
//! `ApiTranslator` posts `{text, from, to}` to `{base_url}/translate` and
//! reads the `translation` field of the JSON reply.  All connection details
//! come from [`TranslateConfig`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TranslateConfig;

// ---------------------------------------------------------------------------
// TranslateError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TranslateError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    #[error("translation request timed out")]
    Timeout,

    /// Non-success HTTP status.
    #[error("translation endpoint returned HTTP {0}")]
    Status(u16),

    #[error("failed to parse translation response: {0}")]
    Parse(String),

    #[error("translation endpoint returned an empty translation")]
    EmptyResponse,
}

impl From<reqwest::Error> for TranslateError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranslateError::Timeout
        } else {
            TranslateError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Translator trait
// ---------------------------------------------------------------------------

/// Async text translation.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn Translator>` with spawned tasks.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

// ---------------------------------------------------------------------------
// ApiTranslator
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    from: &'a str,
    to: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translation: Option<String>,
}

pub struct ApiTranslator {
    client: reqwest::Client,
    config: TranslateConfig,
}

impl ApiTranslator {
    /// Build an `ApiTranslator` with the per-request timeout from
    /// `config.timeout_secs`.
    pub fn from_config(config: &TranslateConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn url(&self) -> String {
        format!("{}/translate", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Translator for ApiTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let body = TranslateRequest {
            text,
            from: &self.config.from,
            to: &self.config.to,
        };

        let response = self.client.post(self.url()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::Parse(e.to_string()))?;

        let translation = parsed
            .translation
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if translation.is_empty() {
            return Err(TranslateError::EmptyResponse);
        }

        Ok(translation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn make_config(base_url: String) -> TranslateConfig {
        TranslateConfig {
            enabled: true,
            base_url,
            from: "en".into(),
            to: "es".into(),
            timeout_secs: 5,
        }
    }

    /// Serve exactly one HTTP request with `status` and `body`; returns the
    /// raw request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..split]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= split + 4 + length
    }

    #[tokio::test]
    async fn posts_text_and_reads_translation() {
        let (base, server) = serve_once("200 OK", r#"{"translation":" hola "}"#).await;
        let translator = ApiTranslator::from_config(&make_config(base));

        let out = translator.translate("hello").await.unwrap();
        assert_eq!(out, "hola");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /translate "));
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["from"], "en");
        assert_eq!(json["to"], "es");
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let (base, _server) = serve_once("500 Internal Server Error", "{}").await;
        let translator = ApiTranslator::from_config(&make_config(base));
        assert!(matches!(
            translator.translate("hello").await,
            Err(TranslateError::Status(500))
        ));
    }

    #[tokio::test]
    async fn missing_translation_is_empty_response() {
        let (base, _server) = serve_once("200 OK", r#"{"other":1}"#).await;
        let translator = ApiTranslator::from_config(&make_config(base));
        assert!(matches!(
            translator.translate("hello").await,
            Err(TranslateError::EmptyResponse)
        ));
    }

    #[test]
    fn url_ignores_trailing_slash() {
        let t = ApiTranslator::from_config(&make_config("http://host/api/".into()));
        assert_eq!(t.url(), "http://host/api/translate");
    }

    #[test]
    fn translator_is_object_safe() {
        let t: Box<dyn Translator> =
            Box::new(ApiTranslator::from_config(&TranslateConfig::default()));
        drop(t);
    }
}
