//! PDF rasterisation: render pages to `DynamicImage`s via pdfium.
//!
//! pdfium wraps a C++ library with thread-local state, so all calls happen
//! inside `tokio::task::spawn_blocking` on a dedicated thread rather than
//! on the async workers.
//!
//! Rendering is one page per call: the batch runner asks for
//! [`page_count`] once, then [`rasterize_page`] inside its transcription
//! loop, so peak memory is a single raster regardless of document length.
//! The document is reopened per page; with page renders dwarfed by the
//! model call that follows each one, the reopen cost is noise.
//!
//! The rendered size is driven by `dpi` but capped by
//! `max_rendered_pixels` on the longest edge: page sizes vary wildly and an
//! uncapped A0 render would allocate hundreds of megabytes of pixels.

use crate::config::ConversionConfig;
use crate::error::ScribeError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One rendered page. `index` is 0-based and equals the PDF page index.
pub struct PageImage {
    pub index: usize,
    pub image: DynamicImage,
}

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Count the pages of a PDF without rendering anything.
///
/// Validates the `%PDF` magic bytes before handing the file to pdfium so a
/// stray text file produces a precise error instead of a parser failure.
pub async fn page_count(pdf_path: &Path) -> Result<usize, ScribeError> {
    validate_pdf_magic(pdf_path)?;
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let pdfium = Pdfium::default();
        let document = open_document(&pdfium, &path)?;
        Ok(document.pages().len() as usize)
    })
    .await
    .map_err(|e| ScribeError::Internal(format!("page-count task panicked: {e}")))?
}

/// Rasterise the single page at 0-based `index`.
pub async fn rasterize_page(
    pdf_path: &Path,
    index: usize,
    config: &ConversionConfig,
) -> Result<PageImage, ScribeError> {
    validate_pdf_magic(pdf_path)?;

    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;

    tokio::task::spawn_blocking(move || render_one(&path, index, dpi, max_pixels))
        .await
        .map_err(|e| ScribeError::Internal(format!("render task panicked: {e}")))?
}

/// Check existence, readability, and the `%PDF` header.
fn validate_pdf_magic(path: &Path) -> Result<(), ScribeError> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ScribeError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ScribeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
        return Err(ScribeError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

fn open_document<'a>(pdfium: &'a Pdfium, path: &PathBuf) -> Result<PdfDocument<'a>, ScribeError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ScribeError::CorruptPdf {
            path: path.clone(),
            detail: format!("{e:?}"),
        })
}

fn render_one(
    path: &PathBuf,
    index: usize,
    dpi: u32,
    max_pixels: u32,
) -> Result<PageImage, ScribeError> {
    let pdfium = Pdfium::default();
    let document = open_document(&pdfium, path)?;
    let pages = document.pages();
    let page = pages
        .get(index as u16)
        .map_err(|e| ScribeError::RasterizationFailed {
            page: index,
            detail: format!("{e:?}"),
        })?;

    let (width_px, height_px) = target_size(
        page.width().value,
        page.height().value,
        dpi,
        max_pixels,
    );

    let render_config = PdfRenderConfig::new()
        .set_target_width(width_px as i32)
        .set_maximum_height(height_px as i32);

    let bitmap =
        page.render_with_config(&render_config)
            .map_err(|e| ScribeError::RasterizationFailed {
                page: index,
                detail: format!("{e:?}"),
            })?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        index,
        image.width(),
        image.height()
    );

    Ok(PageImage { index, image })
}

/// Pixel dimensions for a page of `width_pt` × `height_pt` points at `dpi`,
/// scaled down uniformly if the longest edge would exceed `max_pixels`.
fn target_size(width_pt: f32, height_pt: f32, dpi: u32, max_pixels: u32) -> (u32, u32) {
    let scale = dpi as f32 / PDF_POINTS_PER_INCH;
    let mut w = (width_pt * scale).round().max(1.0);
    let mut h = (height_pt * scale).round().max(1.0);

    let longest = w.max(h);
    if longest > max_pixels as f32 {
        let shrink = max_pixels as f32 / longest;
        w = (w * shrink).round().max(1.0);
        h = (h * shrink).round().max(1.0);
    }

    (w as u32, h as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn a4_at_150_dpi() {
        // A4 portrait is 595 × 842 points.
        let (w, h) = target_size(595.0, 842.0, 150, 2000);
        assert_eq!(w, 1240);
        assert_eq!(h, 1754);
    }

    #[test]
    fn oversize_page_is_capped_proportionally() {
        // A0 is 2384 × 3370 points; at 150 DPI that is ~4967 × 7021 px.
        let (w, h) = target_size(2384.0, 3370.0, 150, 2000);
        assert_eq!(h, 2000);
        assert!(w < h);
        // Aspect ratio preserved within rounding.
        let ratio = w as f32 / h as f32;
        assert!((ratio - 2384.0 / 3370.0).abs() < 0.01);
    }

    #[test]
    fn degenerate_page_never_renders_at_zero() {
        let (w, h) = target_size(0.1, 0.1, 72, 2000);
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = validate_pdf_magic(Path::new("/nonexistent/doc.pdf")).unwrap_err();
        assert!(matches!(err, ScribeError::FileNotFound { .. }));
    }

    #[test]
    fn text_file_is_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello world")
            .unwrap();

        let err = validate_pdf_magic(&path).unwrap_err();
        assert!(matches!(err, ScribeError::NotAPdf { .. }));
    }

    #[test]
    fn pdf_magic_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.7\n")
            .unwrap();

        assert!(validate_pdf_magic(&path).is_ok());
    }
}
