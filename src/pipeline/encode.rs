//! Image encoding: rendered first page → base64 PNG wrapped in `ImageData`.
//!
//! PNG over JPEG because it is lossless: compression artefacts on rendered
//! text measurably degrade what a vision model can read. `detail: "high"`
//! keeps small résumé type (contact lines, skill lists) within the model's
//! full image-tile budget.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode the rendered page as a base64 PNG ready for a vision request.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("encoded first page → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
