//! Transcription backends: one capability, two implementations.
//!
//! The pipeline only ever sees `Arc<dyn TranscriptionBackend>` — a single
//! operation that turns one page image into Markdown text. Which concrete
//! client sits behind it (Gemini over HTTPS or a local Ollama server) is
//! decided once, at configuration time, by [`create`]. Nothing downstream
//! branches on backend identity.

pub mod gemini;
pub mod ollama;

use crate::config::{BackendKind, ConversionConfig};
use crate::error::ScribeError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;

/// A vision model that can transcribe one page image into Markdown.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Optional pre-flight check, run once before a batch starts.
    async fn check_ready(&self) -> Result<(), ScribeError> {
        Ok(())
    }

    /// Transcribe one page. `png_base64` is a base64-encoded PNG raster;
    /// `prompt` is the full instruction text.
    async fn transcribe(&self, png_base64: &str, prompt: &str) -> Result<String, ScribeError>;
}

/// Build the backend selected by the configuration.
pub fn create(config: &ConversionConfig) -> Result<Arc<dyn TranscriptionBackend>, ScribeError> {
    match config.backend {
        BackendKind::Gemini => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or(ScribeError::MissingApiKey)?;
            Ok(Arc::new(GeminiBackend::new(key, config)?))
        }
        BackendKind::Ollama => Ok(Arc::new(OllamaBackend::new(config)?)),
    }
}

/// Shared `reqwest::Client` construction for both backends.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ScribeError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ScribeError::Internal(format!("HTTP client build failed: {e}")))
}

/// Map a `reqwest` transport error into the right `ScribeError`.
pub(crate) fn transport_error(
    backend: &'static str,
    url: &str,
    timeout_secs: u64,
    err: reqwest::Error,
) -> ScribeError {
    if err.is_timeout() {
        ScribeError::ApiTimeout {
            backend,
            secs: timeout_secs,
        }
    } else {
        ScribeError::BackendUnavailable {
            backend,
            url: url.to_string(),
            detail: err.to_string(),
        }
    }
}
