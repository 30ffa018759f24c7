//! Error types for the mdscribe library.
//!
//! A single [`ScribeError`] enum covers the three failure domains of the
//! pipeline:
//!
//! * **Document open** — the PDF cannot be read or rasterised at all
//!   (missing file, not a PDF, corrupt cross-reference table).
//! * **Transcription** — the vision backend failed (network, quota,
//!   authentication, malformed reply, local model missing).
//! * **Write** — the assembled Markdown could not be persisted.
//!
//! Failure isolation is per file: the batch runner catches any of these for
//! one PDF, records it in the [`crate::output::BatchSummary`], and moves on
//! to the next file. [`ScribeError::is_retryable`] tells the per-page retry
//! loop which transcription failures are worth another attempt.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while converting PDFs to Markdown.
#[derive(Debug, Error)]
pub enum ScribeError {
    // ── Document open errors ──────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but does not start with `%PDF`.
    #[error("File is not a valid PDF: '{path}' (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// pdfium could not parse the document structure.
    #[error("PDF '{path}' is corrupt or unreadable: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium returned an error while rendering a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterizationFailed { page: usize, detail: String },

    // ── Transcription errors ──────────────────────────────────────────────
    /// The backend API returned a non-retryable error status.
    #[error("{backend} API error (HTTP {status}): {message}")]
    ApiError {
        backend: &'static str,
        status: u16,
        message: String,
    },

    /// The backend returned HTTP 429; the retry loop backs off.
    #[error("Rate limit exceeded on {backend}")]
    RateLimited {
        backend: &'static str,
        retry_after_secs: Option<u64>,
    },

    /// Authentication failed (401/403) — retrying cannot help.
    #[error("Authentication failed on {backend}: {detail}\nCheck the API key.")]
    AuthFailed {
        backend: &'static str,
        detail: String,
    },

    /// The API call exceeded the configured timeout.
    #[error("{backend} call timed out after {secs}s")]
    ApiTimeout { backend: &'static str, secs: u64 },

    /// The backend replied 2xx but the body had no usable text.
    #[error("Malformed response from {backend}: {detail}")]
    MalformedResponse {
        backend: &'static str,
        detail: String,
    },

    /// The requested local model is not installed.
    #[error("Model '{model}' is not available on the Ollama server.\nTry: ollama pull {model}")]
    ModelUnavailable { model: String },

    /// Could not reach the backend at all (connection refused, DNS).
    #[error("Cannot reach {backend} at '{url}': {detail}")]
    BackendUnavailable {
        backend: &'static str,
        url: String,
        detail: String,
    },

    /// A page still failed after every retry; aborts the file.
    #[error("Page {page} failed after {attempts} attempts: {detail}")]
    PageTranscriptionFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },

    // ── Write errors ──────────────────────────────────────────────────────
    /// Could not create or replace the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Setup errors ──────────────────────────────────────────────────────
    /// The target directory cannot be listed.
    #[error("Cannot read directory '{path}': {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The Gemini backend was selected but no API key was supplied.
    #[error("No API key configured for the Gemini backend.\nSet GEMINI_API_KEY or pass --api-key.")]
    MissingApiKey,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScribeError {
    /// Whether the per-page retry loop should attempt the call again.
    ///
    /// Rate limits, timeouts, unreachable servers, and 5xx responses are
    /// transient. Auth failures, missing models, and malformed responses
    /// repeat identically on retry and surface immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScribeError::RateLimited { .. }
            | ScribeError::ApiTimeout { .. }
            | ScribeError::BackendUnavailable { .. } => true,
            ScribeError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_retryable() {
        let e = ScribeError::RateLimited {
            backend: "gemini",
            retry_after_secs: Some(30),
        };
        assert!(e.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        let server = ScribeError::ApiError {
            backend: "gemini",
            status: 503,
            message: "overloaded".into(),
        };
        let client = ScribeError::ApiError {
            backend: "gemini",
            status: 400,
            message: "bad request".into(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
    }

    #[test]
    fn auth_failure_is_terminal() {
        let e = ScribeError::AuthFailed {
            backend: "gemini",
            detail: "invalid key".into(),
        };
        assert!(!e.is_retryable());
        assert!(e.to_string().contains("invalid key"));
    }

    #[test]
    fn not_a_pdf_display_includes_magic() {
        let e = ScribeError::NotAPdf {
            path: PathBuf::from("/tmp/notes.txt"),
            magic: *b"hell",
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.txt"), "got: {msg}");
    }

    #[test]
    fn model_unavailable_suggests_pull() {
        let e = ScribeError::ModelUnavailable {
            model: "llava".into(),
        };
        assert!(e.to_string().contains("ollama pull llava"));
    }
}
