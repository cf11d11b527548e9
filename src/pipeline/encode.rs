//! Image encoding: rendered page → JPEG bytes, and any bytes → base64.
//!
//! Rendered PDF pages are re-encoded as JPEG because ID documents are
//! photographs and security prints where JPEG is several times smaller than
//! PNG at no visible cost to legibility. Alpha is dropped first since JPEG
//! has no alpha channel.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a rasterised page as JPEG at `quality` (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    debug!(
        "Encoded {}x{} page → {} bytes JPEG",
        rgb.width(),
        rgb.height(),
        buf.len()
    );
    Ok(buf)
}

/// Standard, padded base64 of `bytes`.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
