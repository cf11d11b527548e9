//! # edgequake-idextract
//!
//! Extract personal-data fields from identity documents (photos, scans or
//! PDFs) with a Vision Language Model, and serve it over HTTP.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (JPEG / PNG / PDF)
//!  │
//!  ├─ 1. Ingest    images pass through; PDFs → page 1 via pdfium
//!  ├─ 2. Encode    rendered page → JPEG, then base64 data URI
//!  ├─ 3. Request   schema-driven instruction + one image
//!  ├─ 4. VLM       one call to gpt-4o / claude / gemini / … (with timeout)
//!  └─ 5. Parse     strip one ```json fence pair, parse exactly one JSON object
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_idextract::{ExtractionConfig, Extractor, OpenAiGateway, UploadedFile};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Arc::new(OpenAiGateway::new(std::env::var("OPENAI_API_KEY")?));
//!     let extractor = Extractor::new(ExtractionConfig::default(), gateway);
//!
//!     let bytes = std::fs::read("ine.jpg")?;
//!     let upload = UploadedFile::new(bytes, Some("image/jpeg"));
//!     let output = extractor.extract(&upload).await?;
//!     println!("{}", serde_json::to_string_pretty(&output.record)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `idextract` server binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, ServerConfig};
pub use error::{ExtractError, GatewayError};
pub use extract::Extractor;
pub use output::{ExtractedRecord, ExtractionOutput, ExtractionStats, SourceKind};
pub use pipeline::gateway::{ModelGateway, OpenAiGateway, ProviderGateway};
pub use pipeline::ingest::{NormalizedImage, UploadedFile};
pub use pipeline::request::ExtractionRequest;
pub use pipeline::response::normalize_answer;
pub use schema::{ExtractionSchema, SchemaKind};
pub use server::{router, serve};
