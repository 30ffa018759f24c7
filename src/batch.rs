//! The batch runner: discover PDFs, drive the pipeline per file,
//! isolate failures.
//!
//! Per file the state machine is
//! `Discovered → Rasterizing → Transcribing(page i) → Assembling → Written | Failed`,
//! realised as straight-line async code. Execution is strictly sequential —
//! one file at a time, one page at a time, one in-flight API call — which
//! matches how metered vision APIs want to be used and keeps memory flat
//! regardless of batch size.
//!
//! Failure isolation is per file: any error while processing one PDF is
//! recorded in the [`BatchSummary`] and the runner moves on to the next
//! file. One bad scan does not sink an overnight run.

use crate::backend::{self, TranscriptionBackend};
use crate::config::ConversionConfig;
use crate::error::ScribeError;
use crate::output::{BatchSummary, FileOutcome};
use crate::pipeline::{assemble, encode, postprocess, rasterize, transcribe};
use crate::progress::{BatchProgress, NoopProgress, ProgressHandle};
use crate::prompts;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Discover the PDFs in `dir`, non-recursively.
///
/// Extension matching is case-insensitive (`.pdf`, `.PDF`); results are
/// sorted by file name so batch order is deterministic across platforms.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, ScribeError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ScribeError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    pdfs.sort();
    Ok(pdfs)
}

/// Convert every PDF in `dir` to Markdown, using the backend named by the
/// configuration.
///
/// Returns `Err` only for setup failures (unreadable directory, missing
/// credential, unreachable backend). Per-file failures are reported inside
/// the summary, and the run still counts as successful.
pub async fn run_batch(dir: &Path, config: &ConversionConfig) -> Result<BatchSummary, ScribeError> {
    run_batch_with_progress(dir, config, Arc::new(NoopProgress)).await
}

/// [`run_batch`] with a progress callback.
pub async fn run_batch_with_progress(
    dir: &Path,
    config: &ConversionConfig,
    progress: ProgressHandle,
) -> Result<BatchSummary, ScribeError> {
    let pdfs = discover_pdfs(dir)?;
    if pdfs.is_empty() {
        info!("No PDF files in {}", dir.display());
        return Ok(BatchSummary::default());
    }

    // Backend construction after discovery: an empty directory should
    // complete without demanding a credential.
    let backend = backend::create(config)?;
    backend.check_ready().await?;

    run_files(&pdfs, backend, config, progress).await
}

/// [`run_batch`] with an injected backend; the seam used by tests and by
/// embedders that construct their own client.
pub async fn run_batch_with_backend(
    dir: &Path,
    backend: Arc<dyn TranscriptionBackend>,
    config: &ConversionConfig,
) -> Result<BatchSummary, ScribeError> {
    let pdfs = discover_pdfs(dir)?;
    if pdfs.is_empty() {
        return Ok(BatchSummary::default());
    }
    run_files(&pdfs, backend, config, Arc::new(NoopProgress)).await
}

async fn run_files(
    pdfs: &[PathBuf],
    backend: Arc<dyn TranscriptionBackend>,
    config: &ConversionConfig,
    progress: ProgressHandle,
) -> Result<BatchSummary, ScribeError> {
    let batch_start = Instant::now();
    let prompt = prompts::build_prompt(config.prompt.as_deref(), config.language.as_deref());
    let mut pacer = transcribe::Pacer::from_config(config);

    let mut summary = BatchSummary {
        files_discovered: pdfs.len(),
        ..Default::default()
    };
    progress.on_batch_start(pdfs.len());

    for (file_index, pdf) in pdfs.iter().enumerate() {
        info!(
            "Processing {} ({}/{})",
            pdf.display(),
            file_index + 1,
            pdfs.len()
        );

        if config.skip_existing {
            let out = assemble::output_path(pdf);
            if out.exists() {
                info!("Output {} already exists, skipping", out.display());
                let outcome = FileOutcome::Skipped { output: out };
                progress.on_file_done(pdf, &outcome);
                summary.record(pdf.clone(), outcome);
                continue;
            }
        }

        let outcome = match convert_file(
            pdf,
            &backend,
            config,
            &prompt,
            &mut pacer,
            file_index,
            pdfs.len(),
            progress.as_ref(),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to process {}: {}", pdf.display(), e);
                FileOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        progress.on_file_done(pdf, &outcome);
        summary.record(pdf.clone(), outcome);
    }

    summary.duration_ms = batch_start.elapsed().as_millis() as u64;
    progress.on_batch_end(&summary);

    info!(
        "Batch complete: {} written, {} skipped, {} failed ({} pages, {}ms)",
        summary.files_written,
        summary.files_skipped,
        summary.files_failed,
        summary.total_pages,
        summary.duration_ms
    );

    Ok(summary)
}

/// Run one PDF through the whole pipeline.
#[allow(clippy::too_many_arguments)]
async fn convert_file(
    pdf: &Path,
    backend: &Arc<dyn TranscriptionBackend>,
    config: &ConversionConfig,
    prompt: &str,
    pacer: &mut transcribe::Pacer,
    file_index: usize,
    total_files: usize,
    progress: &dyn BatchProgress,
) -> Result<FileOutcome, ScribeError> {
    let file_start = Instant::now();

    let total_pages = rasterize::page_count(pdf).await?;
    progress.on_file_start(pdf, file_index, total_files, total_pages);

    if total_pages == 0 {
        warn!("{} has no pages", pdf.display());
    }

    // One page in flight at a time: render it, encode it, drop the raster,
    // then make the model call. Peak memory stays flat however long the
    // document is.
    let mut transcripts = Vec::with_capacity(total_pages);
    for page_index in 0..total_pages {
        let page = rasterize::rasterize_page(pdf, page_index, config).await?;
        let png_base64 =
            encode::encode_png_base64(&page.image).map_err(|e| ScribeError::RasterizationFailed {
                page: page_index,
                detail: format!("PNG encoding failed: {e}"),
            })?;
        drop(page);

        pacer.wait().await;
        let mut transcript =
            transcribe::transcribe_page(backend, page_index, &png_base64, prompt, config).await?;
        transcript.markdown = postprocess::clean_page(&transcript.markdown);

        progress.on_page_done(page_index, total_pages);
        transcripts.push(transcript);
    }

    // Assembling → Written
    let document = assemble::assemble(&transcripts, &config.separator);
    let output = assemble::write_markdown(pdf, &document).await?;

    Ok(FileOutcome::Written {
        output,
        pages: total_pages,
        duration_ms: file_start.elapsed().as_millis() as u64,
    })
}
