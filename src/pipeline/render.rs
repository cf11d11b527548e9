//! PDF rasterisation: render the first page of an in-memory PDF via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which uses thread-local
//! state and blocks for the whole render. Running it on the blocking pool
//! keeps the Tokio workers free to serve other uploads.
//!
//! Only page 1 is rendered. Identity documents carry their data on the
//! front page; later pages are discarded.

use crate::config::{MAX_RENDERED_PIXELS, MIN_RENDERED_PIXELS};
use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Page 1 of a PDF plus the document's page count.
#[derive(Debug)]
pub struct RenderedPage {
    pub image: DynamicImage,
    pub page_count: usize,
}

/// Rasterise page 1 of `pdf`, capping the longest edge at `max_pixels`.
pub async fn render_first_page(pdf: Vec<u8>, max_pixels: u32) -> Result<RenderedPage, ExtractError> {
    tokio::task::spawn_blocking(move || render_first_page_blocking(&pdf, max_pixels))
        .await
        .map_err(|e| ExtractError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of [`render_first_page`].
fn render_first_page_blocking(pdf: &[u8], max_pixels: u32) -> Result<RenderedPage, ExtractError> {
    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| ExtractError::Internal(format!("PDF engine unavailable: {}", e)))?;

    let document = pdfium.load_pdf_from_byte_slice(pdf, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            ExtractError::ingestion("PDF is password-protected")
        } else {
            ExtractError::ingestion(format!("PDF is corrupt or unreadable: {}", err_str))
        }
    })?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!("PDF loaded: {} pages", page_count);

    if page_count == 0 {
        return Err(ExtractError::ingestion("PDF has no pages"));
    }

    let page = pages
        .get(0)
        .map_err(|e| ExtractError::ingestion(format!("Cannot open page 1: {:?}", e)))?;

    let edge = render_edge(max_pixels);
    let render_config = PdfRenderConfig::new()
        .set_target_width(edge)
        .set_maximum_height(edge);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| ExtractError::ingestion(format!("Rasterisation of page 1 failed: {:?}", e)))?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 → {}x{} px", image.width(), image.height());

    Ok(RenderedPage { image, page_count })
}

/// Longest rendered edge in pdfium's units, kept inside the configured bounds
/// even when the config field was set directly.
fn render_edge(max_pixels: u32) -> i32 {
    max_pixels.clamp(MIN_RENDERED_PIXELS, MAX_RENDERED_PIXELS) as i32
}
