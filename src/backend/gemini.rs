//! Google Gemini backend: `generateContent` over REST.
//!
//! One request per page: a text part carrying the prompt and an
//! `inline_data` part carrying the base64 PNG. The API key travels in the
//! `x-goog-api-key` header rather than the query string so it never shows
//! up in logs or proxies that record URLs.

use crate::config::ConversionConfig;
use crate::error::ScribeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{http_client, transport_error, TranscriptionBackend};

const BACKEND_NAME: &str = "gemini";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout_secs: u64,
}

impl GeminiBackend {
    /// Create a client. The key is an explicit argument; the library never
    /// reads it from the environment.
    pub fn new(api_key: String, config: &ConversionConfig) -> Result<Self, ScribeError> {
        Ok(Self {
            http: http_client(config.api_timeout_secs)?,
            api_key,
            model: config.resolved_model().to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.api_timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{API_BASE}/{}:generateContent", self.model)
    }
}

#[async_trait]
impl TranscriptionBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn transcribe(&self, png_base64: &str, prompt: &str) -> Result<String, ScribeError> {
        let url = self.endpoint();
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type: "image/png".to_string(),
                            data: png_base64.to_string(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(BACKEND_NAME, &url, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            let body = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                429 => ScribeError::RateLimited {
                    backend: BACKEND_NAME,
                    retry_after_secs,
                },
                401 | 403 => ScribeError::AuthFailed {
                    backend: BACKEND_NAME,
                    detail: truncate(&body, 200),
                },
                code => ScribeError::ApiError {
                    backend: BACKEND_NAME,
                    status: code,
                    message: truncate(&body, 400),
                },
            });
        }

        let body: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| ScribeError::MalformedResponse {
                    backend: BACKEND_NAME,
                    detail: format!("invalid JSON: {e}"),
                })?;

        let text = extract_text(&body)?;
        debug!(model = %self.model, chars = text.len(), "Gemini page transcribed");
        Ok(text)
    }
}

/// Pull the transcription out of a 2xx response body.
///
/// Absent candidates or an empty parts array mean the model produced
/// nothing usable (or the prompt was blocked) and that is an error. A part
/// whose text is the empty string is a legitimate answer — a blank page
/// transcribes to nothing — and passes through unchanged.
fn extract_text(body: &GenerateContentResponse) -> Result<String, ScribeError> {
    let Some(candidate) = body.candidates.first() else {
        return Err(ScribeError::MalformedResponse {
            backend: BACKEND_NAME,
            detail: match body.block_reason() {
                Some(reason) => format!("response blocked: {reason}"),
                None => "no candidates in response".to_string(),
            },
        });
    };

    if candidate.content.parts.is_empty() {
        return Err(ScribeError::MalformedResponse {
            backend: BACKEND_NAME,
            detail: "candidate has no content parts".to_string(),
        });
    }

    Ok(body.text())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: Blob },
}

#[derive(Serialize)]
struct Blob {
    #[serde(rename = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: usize,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: "hi".into(),
                    },
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type: "image/png".into(),
                            data: "QUJD".into(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                max_output_tokens: 4096,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn response_text_concatenates_parts() {
        let body = r##"{
            "candidates": [{
                "content": { "parts": [{"text": "# Title\n"}, {"text": "body"}] }
            }]
        }"##;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text(), "# Title\nbody");
    }

    #[test]
    fn blocked_response_has_no_text_but_a_reason() {
        let body = r#"{ "promptFeedback": { "blockReason": "SAFETY" } }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.text().is_empty());
        assert_eq!(parsed.block_reason(), Some("SAFETY"));

        let err = extract_text(&parsed).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn empty_transcription_is_a_valid_answer() {
        // A blank page legally comes back as a present part with "".
        let body = r#"{
            "candidates": [{ "content": { "parts": [{"text": ""}] } }]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_text(&parsed).unwrap(), "");
    }

    #[test]
    fn missing_candidates_or_parts_are_malformed() {
        let no_candidates: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            extract_text(&no_candidates).unwrap_err(),
            ScribeError::MalformedResponse { .. }
        ));

        let no_parts: GenerateContentResponse =
            serde_json::from_str(r#"{ "candidates": [{ "content": { "parts": [] } }] }"#).unwrap();
        assert!(matches!(
            extract_text(&no_parts).unwrap_err(),
            ScribeError::MalformedResponse { .. }
        ));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "ééééé";
        let t = truncate(s, 3);
        assert!(t.starts_with('é'));
    }

    #[test]
    fn endpoint_includes_model() {
        let config = crate::config::ConversionConfig::default();
        let backend = GeminiBackend::new("key".into(), &config).unwrap();
        assert!(backend.endpoint().ends_with("gemini-2.0-flash:generateContent"));
    }
}
