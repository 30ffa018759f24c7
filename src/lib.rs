//! # mdscribe
//!
//! Batch-convert directories of PDF documents to Markdown using vision
//! models.
//!
//! ## Why this crate?
//!
//! Classic text extractors (pdftotext and friends) garble scanned pages,
//! multi-column layouts, and tables. mdscribe instead rasterises each page
//! to a PNG and asks a vision model to read it the way a human would,
//! producing Markdown that keeps headings, lists, and tables intact. Two
//! backends share one contract: the Google Gemini API (hosted, needs a
//! key) and a local Ollama server (free, private, needs a vision model
//! such as llava).
//!
//! ## Pipeline
//!
//! ```text
//! directory
//!  │
//!  ├─ 1. Discover    *.pdf files, non-recursive, sorted
//!  ├─ 2. Rasterize   one page at a time via pdfium (spawn_blocking)
//!  ├─ 3. Encode      PNG → base64
//!  ├─ 4. Transcribe  one model call per page, retry + pacing
//!  ├─ 5. Clean       deterministic Markdown cleanup
//!  └─ 6. Assemble    join pages, write <name>.md beside the PDF
//! ```
//!
//! Processing is strictly sequential — one file, one page, one API call at
//! a time — and failures are isolated per file: a corrupt PDF or an
//! exhausted quota on one document never stops the rest of the batch.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mdscribe::{run_batch, ConversionConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let summary = run_batch(Path::new("./papers"), &config).await?;
//!     println!("{} files written, {} failed", summary.files_written, summary.files_failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mdscribe` binary (clap + anyhow + indicatif) |
//!
//! Library-only consumers can disable it:
//! ```toml
//! mdscribe = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{GeminiBackend, OllamaBackend, TranscriptionBackend};
pub use batch::{discover_pdfs, run_batch, run_batch_with_backend, run_batch_with_progress};
pub use config::{BackendKind, ConversionConfig, ConversionConfigBuilder, PageSeparator};
pub use error::ScribeError;
pub use output::{BatchSummary, FileOutcome, FileReport, PageTranscript};
pub use progress::{BatchProgress, NoopProgress, ProgressHandle};
