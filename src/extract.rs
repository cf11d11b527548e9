//! Extraction entry point: one uploaded document in, one record out.
//!
//! [`Extractor`] sequences the pipeline stages for a single request:
//!
//! ```text
//! normalize_upload ──▶ build_request ──▶ gateway (timeout) ──▶ normalize_answer
//! ```
//!
//! It holds only read-only state (config + gateway behind `Arc`s), so one
//! instance is shared by every concurrent request without locking.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{ExtractionOutput, ExtractionStats};
use crate::pipeline::gateway::ModelGateway;
use crate::pipeline::ingest::{normalize_upload, UploadedFile};
use crate::pipeline::request::build_request;
use crate::pipeline::response::normalize_answer;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The document-to-record pipeline.
#[derive(Clone)]
pub struct Extractor {
    config: Arc<ExtractionConfig>,
    gateway: Arc<dyn ModelGateway>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.config)
            .field("gateway", &self.gateway.name())
            .finish()
    }
}

impl Extractor {
    pub fn new(config: ExtractionConfig, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run the full pipeline on `upload`.
    ///
    /// # Errors
    /// - [`ExtractError::Ingestion`]: upload cannot become an image; the
    ///   gateway is not called
    /// - [`ExtractError::Gateway`] / [`ExtractError::GatewayTimeout`]: the
    ///   model call failed or took longer than `api_timeout_secs`
    /// - [`ExtractError::ResponseFormat`]: the answer is not one JSON object
    pub async fn extract(&self, upload: &UploadedFile) -> Result<ExtractionOutput, ExtractError> {
        let total_start = Instant::now();
        info!(
            "Extracting fields from {} ({} bytes, {})",
            upload.file_name.as_deref().unwrap_or("<unnamed>"),
            upload.bytes.len(),
            upload.media_type.as_deref().unwrap_or("no content type")
        );

        // ── Step 1: Normalise upload ─────────────────────────────────────
        let ingest_start = Instant::now();
        let image = normalize_upload(upload, &self.config).await?;
        let ingest_duration_ms = ingest_start.elapsed().as_millis() as u64;
        debug!(
            "Normalised to {} ({} bytes) in {}ms",
            image.mime_type,
            image.bytes.len(),
            ingest_duration_ms
        );

        // ── Step 2: Build request ────────────────────────────────────────
        let request = build_request(&image, &self.config);

        // ── Step 3: Call the model ───────────────────────────────────────
        let gateway_start = Instant::now();
        let secs = self.config.api_timeout_secs;
        let raw = tokio::time::timeout(Duration::from_secs(secs), self.gateway.complete(&request))
            .await
            .map_err(|_| ExtractError::GatewayTimeout { secs })??;
        let gateway_duration_ms = gateway_start.elapsed().as_millis() as u64;
        debug!(
            "{} answered {} chars in {}ms",
            self.gateway.name(),
            raw.len(),
            gateway_duration_ms
        );

        // ── Step 4: Parse the answer ─────────────────────────────────────
        let record = normalize_answer(&raw)?;

        let audit = self.config.schema.audit(&record);
        if !audit.is_clean() {
            warn!(
                "Record does not match schema '{}' v{}: missing {:?}, unexpected {:?}",
                self.config.schema.name, self.config.schema.version, audit.missing, audit.unexpected
            );
        }

        let stats = ExtractionStats {
            source: image.source,
            page_count: image.page_count,
            image_bytes: image.bytes.len(),
            ingest_duration_ms,
            gateway_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Extraction complete: {} fields, {}ms total",
            record.len(),
            stats.total_duration_ms
        );

        Ok(ExtractionOutput { record, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::output::SourceKind;
    use crate::pipeline::request::ExtractionRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Canned-answer gateway that records what it was sent.
    struct Canned {
        answer: Result<String, GatewayError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        last: Mutex<Option<ExtractionRequest>>,
    }

    impl Canned {
        fn ok(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.to_string()),
                delay: None,
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl ModelGateway for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &ExtractionRequest) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request.clone());
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            self.answer.clone()
        }
    }

    fn jpeg_upload() -> UploadedFile {
        UploadedFile::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3], Some("image/jpeg"))
    }

    #[tokio::test]
    async fn happy_path_image() {
        let gw = Canned::ok("  {\"nombre\":\"Ana\",\"apellido_paterno\":\"Ruiz\"}  ");
        let ex = Extractor::new(ExtractionConfig::default(), gw.clone());
        let out = ex.extract(&jpeg_upload()).await.unwrap();
        assert_eq!(out.record.get_str("nombre"), Some("Ana"));
        assert_eq!(out.stats.source, SourceKind::Image);
        assert_eq!(out.stats.image_bytes, 7);
        assert_eq!(gw.calls.load(Ordering::SeqCst), 1);

        let sent = gw.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.image().unwrap().url, "data:image/jpeg;base64,/9j/4AECAw==");
    }

    #[tokio::test]
    async fn ingestion_failure_skips_gateway() {
        let gw = Canned::ok("{}");
        let ex = Extractor::new(ExtractionConfig::default(), gw.clone());
        let bad = UploadedFile::new(b"not a pdf".to_vec(), Some("application/pdf"));
        let err = ex.extract(&bad).await.unwrap_err();
        assert!(matches!(err, ExtractError::Ingestion { .. }));
        assert_eq!(gw.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gateway_error_propagates() {
        let gw = Arc::new(Canned {
            answer: Err(GatewayError::Auth {
                provider: "canned".into(),
                detail: "bad key".into(),
            }),
            delay: None,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        });
        let ex = Extractor::new(ExtractionConfig::default(), gw);
        let err = ex.extract(&jpeg_upload()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Gateway(GatewayError::Auth { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_gateway_times_out() {
        let gw = Arc::new(Canned {
            answer: Ok("{}".into()),
            delay: Some(Duration::from_secs(30)),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        });
        let config = ExtractionConfig::builder().api_timeout_secs(5).build().unwrap();
        let ex = Extractor::new(config, gw);
        let err = ex.extract(&jpeg_upload()).await.unwrap_err();
        assert!(matches!(err, ExtractError::GatewayTimeout { secs: 5 }), "got {err:?}");
    }

    #[tokio::test]
    async fn schema_mismatch_still_succeeds() {
        let gw = Canned::ok("{\"inventado\":\"x\"}");
        let ex = Extractor::new(ExtractionConfig::default(), gw);
        let out = ex.extract(&jpeg_upload()).await.unwrap();
        assert_eq!(out.record.get_str("inventado"), Some("x"));
    }

    #[tokio::test]
    async fn prose_answer_is_format_error() {
        let gw = Canned::ok("Lo siento, no puedo procesar esto.");
        let ex = Extractor::new(ExtractionConfig::default(), gw);
        match ex.extract(&jpeg_upload()).await.unwrap_err() {
            ExtractError::ResponseFormat { raw, .. } => {
                assert_eq!(raw, "Lo siento, no puedo procesar esto.")
            }
            other => panic!("expected ResponseFormat, got {other:?}"),
        }
    }
}
