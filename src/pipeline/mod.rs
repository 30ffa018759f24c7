//! Pipeline stages, one transformation per submodule.
//!
//! ```text
//! rasterize ──▶ encode ──▶ transcribe ──▶ postprocess ──▶ assemble
//! (pdfium)     (base64)    (backend)      (cleanup)       (join + write)
//! ```
//!
//! 1. [`rasterize`]   — render one PDF page at a time to a pixel image; runs
//!    in `spawn_blocking` because pdfium is not async-safe
//! 2. [`encode`]      — PNG-encode and base64-wrap each raster for the API
//!    request body
//! 3. [`transcribe`]  — drive the backend call with retry, backoff, and
//!    optional request pacing; the only stage with network I/O
//! 4. [`postprocess`] — deterministic cleanup of model output quirks
//! 5. [`assemble`]    — join pages with the separator and write the `.md`

pub mod assemble;
pub mod encode;
pub mod postprocess;
pub mod rasterize;
pub mod transcribe;
