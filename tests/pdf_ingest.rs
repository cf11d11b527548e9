//! PDF ingestion against a real pdfium library.
//!
//! Skipped (with a `SKIP` line) when pdfium is not already cached locally,
//! so CI without network access stays green.

mod common;

use common::pdf_with_pages;
use edgequake_idextract::pipeline::ingest::normalize_upload;
use edgequake_idextract::{ExtractError, ExtractionConfig, SourceKind, UploadedFile};

macro_rules! require_pdfium {
    () => {
        if !common::pdfium_ready() {
            println!("SKIP: pdfium not cached; set PDFIUM_LIB_PATH to run PDF tests");
            return;
        }
    };
}

fn decode(bytes: &[u8]) -> image::DynamicImage {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg).expect("valid JPEG")
}

#[tokio::test]
async fn single_page_pdf_becomes_jpeg() {
    require_pdfium!();
    let upload = UploadedFile::new(pdf_with_pages(&[(300, 200)]), Some("application/pdf"));

    let image = normalize_upload(&upload, &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(image.source, SourceKind::Pdf);
    assert_eq!(image.page_count, Some(1));
    assert_eq!(image.mime_type, "image/jpeg");
    assert_eq!(&image.bytes[..3], &[0xFF, 0xD8, 0xFF]);
    assert!(image.data_url().starts_with("data:image/jpeg;base64,/9j/"));

    let decoded = decode(&image.bytes);
    assert!(decoded.width() > decoded.height());
    assert!(decoded.width() <= 2000 && decoded.height() <= 2000);
}

#[tokio::test]
async fn only_first_page_of_multi_page_pdf_is_used() {
    require_pdfium!();
    // Landscape first page, portrait after: the output shape tells which page won.
    let pdf = pdf_with_pages(&[(300, 200), (200, 300), (200, 300)]);
    let upload = UploadedFile::new(pdf, Some("application/pdf"));

    let image = normalize_upload(&upload, &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(image.page_count, Some(3));
    let decoded = decode(&image.bytes);
    assert!(
        decoded.width() > decoded.height(),
        "expected landscape page 1, got {}x{}",
        decoded.width(),
        decoded.height()
    );
}

#[tokio::test]
async fn undeclared_pdf_is_sniffed() {
    require_pdfium!();
    let upload = UploadedFile::new(pdf_with_pages(&[(200, 300)]), None);

    let image = normalize_upload(&upload, &ExtractionConfig::default())
        .await
        .unwrap();
    assert_eq!(image.source, SourceKind::Pdf);
}

#[tokio::test]
async fn render_size_follows_config() {
    require_pdfium!();
    let config = ExtractionConfig::builder()
        .max_rendered_pixels(400)
        .build()
        .unwrap();
    let upload = UploadedFile::new(pdf_with_pages(&[(300, 200)]), Some("application/pdf"));

    let image = normalize_upload(&upload, &config).await.unwrap();
    let decoded = decode(&image.bytes);
    assert!(decoded.width() <= 400 && decoded.height() <= 400);
}

#[tokio::test]
async fn zero_page_pdf_is_ingestion_error() {
    require_pdfium!();
    let upload = UploadedFile::new(pdf_with_pages(&[]), Some("application/pdf"));

    let err = normalize_upload(&upload, &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::Ingestion { .. }), "got {err:?}");
}

#[tokio::test]
async fn truncated_pdf_is_ingestion_error() {
    require_pdfium!();
    let upload = UploadedFile::new(
        b"%PDF-1.4\n1 0 obj\n<< /Type /Catal".to_vec(),
        Some("application/pdf"),
    );

    let err = normalize_upload(&upload, &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::Ingestion { .. }), "got {err:?}");
    assert!(err.is_client_error());
}
