//! Document assembly: join page transcripts and persist the Markdown.
//!
//! The write is atomic — contents go to `<name>.md.tmp` first and are then
//! renamed over `<name>.md` — so a crash or filesystem error mid-write
//! never leaves a half-finished document where the final output belongs.

use crate::config::PageSeparator;
use crate::error::ScribeError;
use crate::output::PageTranscript;
use std::path::{Path, PathBuf};
use tracing::info;

/// Join page transcripts in page order with the separator between
/// consecutive pages, ending with exactly one newline.
pub fn assemble(transcripts: &[PageTranscript], separator: &PageSeparator) -> String {
    let mut doc = String::new();
    for (i, t) in transcripts.iter().enumerate() {
        if i > 0 {
            doc.push_str(&separator.render(t.page_index));
        }
        doc.push_str(&t.markdown);
    }

    let trimmed = doc.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{trimmed}\n")
    }
}

/// The `.md` path that belongs to a given PDF: same directory, same stem.
pub fn output_path(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension("md")
}

/// Write `contents` to `<pdf_basename>.md` beside the source PDF,
/// creating or overwriting it. Returns the output path.
pub async fn write_markdown(pdf_path: &Path, contents: &str) -> Result<PathBuf, ScribeError> {
    let out = output_path(pdf_path);
    let tmp = out.with_extension("md.tmp");

    let write_err = |e: std::io::Error| ScribeError::OutputWriteFailed {
        path: out.clone(),
        source: e,
    };

    if let Err(e) = tokio::fs::write(&tmp, contents).await {
        // Drop any partial temp file; nothing observable must remain.
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(write_err(e));
    }

    tokio::fs::rename(&tmp, &out).await.map_err(write_err)?;

    info!("Wrote {}", out.display());
    Ok(out)
}
