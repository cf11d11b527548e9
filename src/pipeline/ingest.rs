//! Upload ingestion: turn an uploaded file into exactly one encoded image.
//!
//! Images are forwarded byte-for-byte; the vision model is a better judge of
//! a JPEG's content than any local check we could run. PDFs are validated by
//! magic bytes (`%PDF`) before pdfium ever sees them, so garbage uploads fail
//! fast with a readable message instead of a pdfium error code.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::SourceKind;
use crate::pipeline::{encode, render};
use tracing::{debug, info};

const PDF_MIME: &str = "application/pdf";
const PDF_MAGIC: &[u8; 4] = b"%PDF";
/// MIME attached to images whose type is neither declared nor recognisable.
const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

/// One uploaded document, as received.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    /// Declared `Content-Type` of the part, if any.
    pub media_type: Option<String>,
    pub file_name: Option<String>,
}

impl UploadedFile {
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.map(str::to_string),
            file_name: None,
        }
    }

    /// Declared media type, lower-cased and without parameters.
    pub fn essence(&self) -> Option<String> {
        self.media_type.as_deref().and_then(|m| {
            let essence = m.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            if essence.is_empty() {
                None
            } else {
                Some(essence)
            }
        })
    }

    /// `true` if this upload is handled as a PDF.
    ///
    /// A declared `application/pdf` always wins. Undeclared or generic
    /// (`application/octet-stream`) uploads are sniffed for `%PDF`.
    /// Declared `image/*` is never treated as PDF.
    pub fn is_pdf(&self) -> bool {
        match self.essence().as_deref() {
            Some(PDF_MIME) => true,
            Some(m) if m.starts_with("image/") => false,
            _ => self.bytes.starts_with(PDF_MAGIC),
        }
    }
}

/// The single image sent to the model.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub base64: String,
    pub source: SourceKind,
    /// Page count of the source PDF (`None` for images).
    pub page_count: Option<usize>,
}

impl NormalizedImage {
    /// `data:` URI embedding the image.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Normalise `upload` into one image.
///
/// # Errors
/// [`ExtractError::Ingestion`] for empty uploads, non-PDF bytes declared as
/// PDF, corrupt or zero-page PDFs and encode failures.
/// [`ExtractError::Internal`] if the pdfium library cannot be loaded.
pub async fn normalize_upload(
    upload: &UploadedFile,
    config: &ExtractionConfig,
) -> Result<NormalizedImage, ExtractError> {
    if upload.bytes.is_empty() {
        return Err(ExtractError::ingestion("uploaded file is empty"));
    }

    if upload.is_pdf() {
        normalize_pdf(upload, config).await
    } else {
        Ok(normalize_image(upload))
    }
}

fn normalize_image(upload: &UploadedFile) -> NormalizedImage {
    let mime_type = image_mime(upload);
    debug!(
        "Passing through {} bytes of {} unchanged",
        upload.bytes.len(),
        mime_type
    );
    NormalizedImage {
        base64: encode::to_base64(&upload.bytes),
        bytes: upload.bytes.clone(),
        mime_type,
        source: SourceKind::Image,
        page_count: None,
    }
}

async fn normalize_pdf(
    upload: &UploadedFile,
    config: &ExtractionConfig,
) -> Result<NormalizedImage, ExtractError> {
    if !upload.bytes.starts_with(PDF_MAGIC) {
        let head: Vec<u8> = upload.bytes.iter().take(4).copied().collect();
        return Err(ExtractError::ingestion(format!(
            "file is not a valid PDF (first bytes: {:?})",
            head
        )));
    }

    let rendered = render::render_first_page(upload.bytes.clone(), config.max_rendered_pixels).await?;
    if rendered.page_count > 1 {
        info!(
            "PDF has {} pages; only page 1 is sent to the model",
            rendered.page_count
        );
    }

    let bytes = encode::encode_jpeg(&rendered.image, config.jpeg_quality)
        .map_err(|e| ExtractError::ingestion(format!("JPEG encoding of page 1 failed: {}", e)))?;

    Ok(NormalizedImage {
        base64: encode::to_base64(&bytes),
        bytes,
        mime_type: FALLBACK_IMAGE_MIME.to_string(),
        source: SourceKind::Pdf,
        page_count: Some(rendered.page_count),
    })
}

/// MIME for a pass-through image: declared `image/*`, else sniffed, else JPEG.
fn image_mime(upload: &UploadedFile) -> String {
    if let Some(m) = upload.essence() {
        if m.starts_with("image/") {
            return m;
        }
    }
    image::guess_format(&upload.bytes)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_IMAGE_MIME.to_string())
}
