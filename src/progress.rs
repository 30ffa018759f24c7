//! Progress-reporting trait for batch runs.
//!
//! Inject an `Arc<dyn BatchProgress>` into
//! [`crate::batch::run_batch_with_progress`] to receive events as files and
//! pages complete. Callbacks keep the library agnostic about how the host
//! presents progress — a terminal bar, a log line, a job-status row. All
//! methods have no-op defaults so implementors only override what they need.
//!
//! The batch is strictly sequential, so no synchronisation is required
//! inside implementations; the trait is still `Send + Sync` so callbacks
//! can be shared with other tasks (e.g. a UI thread).

use crate::output::{BatchSummary, FileOutcome};
use std::path::Path;
use std::sync::Arc;

/// Events emitted while a batch runs.
pub trait BatchProgress: Send + Sync {
    /// The batch starts; `total_files` PDFs were discovered.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// A file's processing begins. `file_index` is 0-based;
    /// `page_count` is the number of pages about to be transcribed.
    fn on_file_start(&self, path: &Path, file_index: usize, total_files: usize, page_count: usize) {
        let _ = (path, file_index, total_files, page_count);
    }

    /// One page of the current file finished transcription.
    fn on_page_done(&self, page_index: usize, total_pages: usize) {
        let _ = (page_index, total_pages);
    }

    /// The current file reached a terminal state (written, skipped, failed).
    fn on_file_done(&self, path: &Path, outcome: &FileOutcome) {
        let _ = (path, outcome);
    }

    /// Every discovered file has been attempted.
    fn on_batch_end(&self, summary: &BatchSummary) {
        let _ = summary;
    }
}

/// Default silent implementation.
pub struct NoopProgress;

impl BatchProgress for NoopProgress {}

/// Convenience alias for the shared-callback type the runner accepts.
pub type ProgressHandle = Arc<dyn BatchProgress>;
