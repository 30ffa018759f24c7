//! Backend invocation with retry, backoff, and request pacing.
//!
//! ## Retry strategy
//!
//! HTTP 429 and 5xx responses from hosted vision APIs are frequent and
//! transient. Each page gets up to `max_retries` extra attempts with
//! exponential backoff (`retry_backoff_ms * 2^(attempt-1)`); when the
//! server names its own delay via `Retry-After`, that wins over the
//! computed backoff. Permanent failures (bad key, missing model, malformed
//! reply) are not retried — see [`crate::error::ScribeError::is_retryable`].
//!
//! Unlike per-page tolerance schemes, a page that still fails after all
//! retries aborts its whole file: a Markdown document with silent holes is
//! worse than no document, and the batch runner isolates the failure to
//! that one PDF anyway.

use crate::backend::TranscriptionBackend;
use crate::config::ConversionConfig;
use crate::error::ScribeError;
use crate::output::PageTranscript;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// Transcribe one page, retrying transient failures.
///
/// `page_index` is 0-based and only used for error reporting.
pub async fn transcribe_page(
    backend: &Arc<dyn TranscriptionBackend>,
    page_index: usize,
    png_base64: &str,
    prompt: &str,
    config: &ConversionConfig,
) -> Result<PageTranscript, ScribeError> {
    let start = Instant::now();
    let mut last_err: Option<ScribeError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = backoff_delay(config.retry_backoff_ms, attempt, last_err.as_ref());
            warn!(
                "Page {}: retry {}/{} after {}ms",
                page_index,
                attempt,
                config.max_retries,
                delay.as_millis()
            );
            sleep(delay).await;
        }

        match backend.transcribe(png_base64, prompt).await {
            Ok(markdown) => {
                return Ok(PageTranscript {
                    page_index,
                    markdown,
                    retries: attempt,
                    duration_ms: start.elapsed().as_millis() as u64,
                });
            }
            Err(e) if e.is_retryable() => {
                warn!("Page {}: attempt {} failed — {}", page_index, attempt + 1, e);
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    let detail = last_err
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown error".to_string());

    Err(ScribeError::PageTranscriptionFailed {
        page: page_index,
        attempts: config.max_retries + 1,
        detail,
    })
}

/// Delay before retry `attempt` (1-based). A server-provided `Retry-After`
/// takes precedence over the exponential schedule.
fn backoff_delay(base_ms: u64, attempt: u32, last_err: Option<&ScribeError>) -> Duration {
    if let Some(ScribeError::RateLimited {
        retry_after_secs: Some(secs),
        ..
    }) = last_err
    {
        return Duration::from_secs(*secs);
    }
    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Spaces out API requests to stay under a requests-per-minute budget.
///
/// Hosted vision APIs meter free tiers aggressively; pacing up front beats
/// burning retries on 429 responses. The first call never waits.
pub struct Pacer {
    interval: Duration,
    last_request: Option<Instant>,
}

impl Pacer {
    /// `None` when no budget is configured; such a pacer never sleeps.
    pub fn from_config(config: &ConversionConfig) -> Self {
        let interval = match config.requests_per_minute {
            Some(rpm) => Duration::from_secs_f64(60.0 / rpm as f64),
            None => Duration::ZERO,
        };
        Self {
            interval,
            last_request: None,
        }
    }

    /// Sleep until the next request slot, then claim it.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                sleep(self.interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}
