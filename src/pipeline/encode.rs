//! Image encoding: `DynamicImage` → base64 PNG.
//!
//! PNG rather than JPEG because it is lossless: compression artefacts on
//! rendered text measurably hurt transcription accuracy, and a page raster
//! compresses well under PNG anyway.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as base64 PNG, ready for an API request body.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page image → {} bytes base64", b64.len());
    Ok(b64)
}
