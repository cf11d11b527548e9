//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_idextract::{ExtractionRequest, GatewayError, ModelGateway};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Gateway double returning a fixed answer and recording every request.
pub struct MockGateway {
    answer: Result<String, GatewayError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ExtractionRequest>>,
}

impl MockGateway {
    pub fn answering(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: GatewayError) -> Self {
        Self {
            answer: Err(err),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ExtractionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &ExtractionRequest) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.answer.clone()
    }
}

/// A few bytes with a JPEG SOI/APP0 header. Never decoded by the service.
pub fn fake_jpeg() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00]
}

/// Minimal PDF with one blank page per `(width, height)` entry, in points.
pub fn pdf_with_pages(sizes: &[(u32, u32)]) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..sizes.len())
                .map(|i| format!("{} 0 R", i + 3))
                .collect::<Vec<_>>()
                .join(" "),
            sizes.len()
        ),
    ];
    for (w, h) in sizes {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] /Resources << >> >>"
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, obj).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

/// `true` when a pdfium library is already on disk (no download needed).
pub fn pdfium_ready() -> bool {
    pdfium_auto::cached_pdfium_path().is_some()
}
