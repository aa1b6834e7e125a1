//! Image encoding: `PageImage` → base64 JPEG for the vision APIs.
//!
//! Every backend accepts base64 image payloads inside a JSON body. Pages are
//! flattened to RGB first (JPEG has no alpha channel, and handwriting exports
//! often carry a transparent background) and encoded as JPEG to keep
//! multi-page batch requests well under the APIs' body-size limits.

use crate::error::TranscribeError;
use crate::page::PageImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

const JPEG_QUALITY: u8 = 90;

/// A base64-encoded image plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: &'static str,
}

/// Encode a page as a base64 JPEG.
pub fn encode_page(page: &PageImage) -> Result<EncodedImage, TranscribeError> {
    let rgb = DynamicImage::ImageRgb8(page.image().to_rgb8());
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))?;

    let data = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} page → {} bytes base64",
        page.width(),
        page.height(),
        data.len()
    );
    Ok(EncodedImage {
        data,
        media_type: "image/jpeg",
    })
}

/// Encode every page, preserving order.
pub fn encode_pages(pages: &[PageImage]) -> Result<Vec<EncodedImage>, TranscribeError> {
    pages.iter().map(encode_page).collect()
}
