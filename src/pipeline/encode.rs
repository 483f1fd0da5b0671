//! Image encoding: `DynamicImage` → PNG bytes.
//!
//! Both the cropper and the pdfium image enumeration go through here so every
//! file the pipeline writes is PNG, and so the byte length the deduplicator
//! compares is the byte length of exactly what lands on disk.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );

    Ok(buf)
}
