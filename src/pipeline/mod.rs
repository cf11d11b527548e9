//! Pipeline stages for document field extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested without the others and the gateway can be swapped for a test
//! double.
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ render ──▶ encode ──▶ request ──▶ gateway ──▶ response
//! (upload)   (pdfium)   (JPEG/b64)  (parts)     (VLM)       (JSON record)
//! ```
//!
//! 1. [`ingest`]  : classify the upload; images pass through, PDFs go on
//! 2. [`render`]  : rasterise page 1 of a PDF; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`encode`]  : JPEG-encode the rendered page and base64 any image
//! 4. [`request`] : instruction text + one image reference
//! 5. [`gateway`] : the only stage with network I/O
//! 6. [`response`]: strip one fence pair, parse exactly one JSON object

pub mod encode;
pub mod gateway;
pub mod ingest;
pub mod render;
pub mod request;
pub mod response;
