//! Result types: per-page transcripts, per-file reports, batch accounting.
//!
//! Everything here is `Serialize` so the CLI can emit the whole run as JSON
//! (`--json`) for scripting.

use serde::Serialize;
use std::path::PathBuf;

/// The Markdown produced for one page, 1:1 with the page it was rendered
/// from. `page_index` is 0-based and matches PDF page order.
#[derive(Debug, Clone, Serialize)]
pub struct PageTranscript {
    pub page_index: usize,
    pub markdown: String,
    /// Retries that were needed before the backend call succeeded.
    pub retries: u32,
    pub duration_ms: u64,
}

/// Outcome of one PDF file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Markdown written successfully.
    Written {
        output: PathBuf,
        pages: usize,
        duration_ms: u64,
    },
    /// Output already existed and `skip_existing` was set.
    Skipped { output: PathBuf },
    /// Processing aborted; no output was produced for this file.
    Failed { reason: String },
}

/// One entry per discovered PDF.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Accounting for a whole batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub files_discovered: usize,
    pub files_written: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub total_pages: usize,
    pub duration_ms: u64,
    pub reports: Vec<FileReport>,
}

impl BatchSummary {
    /// Record one file's outcome, updating the counters.
    pub fn record(&mut self, source: PathBuf, outcome: FileOutcome) {
        match &outcome {
            FileOutcome::Written { pages, .. } => {
                self.files_written += 1;
                self.total_pages += pages;
            }
            FileOutcome::Skipped { .. } => self.files_skipped += 1,
            FileOutcome::Failed { .. } => self.files_failed += 1,
        }
        self.reports.push(FileReport { source, outcome });
    }

    /// True when every discovered file was attempted without failure.
    pub fn is_clean(&self) -> bool {
        self.files_failed == 0
    }
}
