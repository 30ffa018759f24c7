//! Ollama backend: local inference via the `/api/chat` endpoint.
//!
//! No credential and no network beyond localhost (by default). The prompt
//! rides in a system message; the page image rides base64-encoded in the
//! `images` field of the user message, which is how Ollama feeds vision
//! models such as llava or llama3.2-vision.

use crate::config::ConversionConfig;
use crate::error::ScribeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_client, transport_error, TranscriptionBackend};

const BACKEND_NAME: &str = "ollama";

/// Client for a local Ollama server.
pub struct OllamaBackend {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

impl OllamaBackend {
    pub fn new(config: &ConversionConfig) -> Result<Self, ScribeError> {
        Ok(Self {
            http: http_client(config.api_timeout_secs)?,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.resolved_model().to_string(),
            temperature: config.temperature,
            timeout_secs: config.api_timeout_secs,
        })
    }
}

#[async_trait]
impl TranscriptionBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    /// Probe `/api/tags` so a missing server fails the batch up front
    /// instead of once per page.
    async fn check_ready(&self) -> Result<(), ScribeError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(BACKEND_NAME, &url, self.timeout_secs, e))?;

        if !response.status().is_success() {
            return Err(ScribeError::BackendUnavailable {
                backend: BACKEND_NAME,
                url,
                detail: format!("HTTP {}", response.status()),
            });
        }
        Ok(())
    }

    async fn transcribe(&self, png_base64: &str, prompt: &str) -> Result<String, ScribeError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt.to_string(),
                    images: None,
                },
                ChatMessage {
                    role: "user",
                    content: String::new(),
                    images: Some(vec![png_base64.to_string()]),
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(BACKEND_NAME, &url, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();

            // Ollama reports an uninstalled model as a 404 with a
            // "model ... not found" body.
            if message.contains("not found") && message.contains("model") {
                return Err(ScribeError::ModelUnavailable {
                    model: self.model.clone(),
                });
            }

            return Err(ScribeError::ApiError {
                backend: BACKEND_NAME,
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScribeError::MalformedResponse {
                backend: BACKEND_NAME,
                detail: format!("invalid JSON: {e}"),
            })?;

        // Empty content is a legitimate answer for a blank page; only a
        // body without a message at all fails deserialisation above.
        debug!(model = %self.model, chars = chat.message.content.len(), "Ollama page transcribed");
        Ok(chat.message.content)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}
