//! Configuration for a batch conversion run.
//!
//! Every knob lives in one [`ConversionConfig`] built via its
//! [`ConversionConfigBuilder`]. Keeping the configuration in a single
//! cloneable struct makes it trivial to pass through the pipeline and to
//! log the settings of a run when diagnosing output differences.
//!
//! Credentials are explicit fields here, never read from the environment by
//! the library itself — the CLI resolves `GEMINI_API_KEY` / `OLLAMA_HOST`
//! and feeds the values in.

use crate::error::ScribeError;
use serde::{Deserialize, Serialize};

/// Which transcription backend to use for the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// Google Gemini REST API. Requires an API key.
    #[default]
    Gemini,
    /// A local Ollama server with a vision-capable model.
    Ollama,
}

/// Configuration for converting a directory of PDFs to Markdown.
///
/// Built via [`ConversionConfig::builder()`] or [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use mdscribe::{BackendKind, ConversionConfig};
///
/// let config = ConversionConfig::builder()
///     .backend(BackendKind::Ollama)
///     .model("llava")
///     .dpi(150)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Transcription backend. Default: [`BackendKind::Gemini`].
    pub backend: BackendKind,

    /// Model identifier. If `None`, the backend default is used
    /// (`gemini-2.0-flash` for Gemini, `llava` for Ollama).
    pub model: Option<String>,

    /// API key for the Gemini backend. Ignored by Ollama.
    pub api_key: Option<String>,

    /// Base URL of the Ollama server. Default: `http://localhost:11434`.
    pub ollama_url: String,

    /// Rendering DPI used when rasterising each page. Range: 72–400. Default: 150.
    ///
    /// 150 DPI keeps text sharp enough for a vision model while the PNG stays
    /// well below typical API upload limits. Raise it for small-print scans.
    pub dpi: u32,

    /// Cap on the longest rendered edge in pixels. Default: 2000.
    ///
    /// Independent of DPI: an A0 page at 150 DPI would otherwise produce a
    /// five-figure pixel dimension and exhaust memory.
    pub max_rendered_pixels: u32,

    /// Sampling temperature. Default: 0.1. Low values keep the model faithful
    /// to what is on the page, which is what transcription wants.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Extra attempts per page after a transient failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds; doubles each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Optional request budget. When set, the runner sleeps between
    /// transcription calls so the rate stays under this many per minute.
    pub requests_per_minute: Option<u32>,

    /// Per-API-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Language of the documents, appended to the prompt as a hint.
    pub language: Option<String>,

    /// Custom transcription prompt. If `None`, [`crate::prompts::DEFAULT_PROMPT`] is used.
    pub prompt: Option<String>,

    /// Separator inserted between pages in the assembled Markdown.
    pub separator: PageSeparator,

    /// Skip PDFs whose `.md` output already exists instead of overwriting.
    /// Default: false (overwrite).
    pub skip_existing: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Gemini,
            model: None,
            api_key: None,
            ollama_url: "http://localhost:11434".to_string(),
            dpi: 150,
            max_rendered_pixels: 2000,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            requests_per_minute: None,
            api_timeout_secs: 120,
            language: None,
            prompt: None,
            separator: PageSeparator::default(),
            skip_existing: false,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model to use, falling back to the backend default.
    pub fn resolved_model(&self) -> &str {
        self.model.as_deref().unwrap_or(match self.backend {
            BackendKind::Gemini => "gemini-2.0-flash",
            BackendKind::Ollama => "llava",
        })
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.config.backend = kind;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn ollama_url(mut self, url: impl Into<String>) -> Self {
        self.config.ollama_url = url.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn requests_per_minute(mut self, rpm: u32) -> Self {
        self.config.requests_per_minute = Some(rpm);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = Some(lang.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn separator(mut self, sep: PageSeparator) -> Self {
        self.config.separator = sep;
        self
    }

    pub fn skip_existing(mut self, v: bool) -> Self {
        self.config.skip_existing = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ScribeError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(ScribeError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if let Some(rpm) = c.requests_per_minute {
            if rpm == 0 {
                return Err(ScribeError::InvalidConfig(
                    "requests_per_minute must be ≥ 1".into(),
                ));
            }
        }
        if c.ollama_url.is_empty() {
            return Err(ScribeError::InvalidConfig("Ollama URL is empty".into()));
        }
        Ok(self.config)
    }
}

/// How consecutive pages are separated in the assembled Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Horizontal rule: `\n\n---\n\n`. (default)
    #[default]
    HorizontalRule,
    /// Just a blank line: `\n\n`.
    Blank,
    /// HTML comment naming the page that follows: `<!-- page N -->`.
    Comment,
    /// Custom string, padded with blank lines.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before the page with this 0-based index.
    pub fn render(&self, page_index: usize) -> String {
        match self {
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Blank => "\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_index),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}
