//! Result types produced by a successful extraction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Deref;

/// One document's extracted fields, in the order the model emitted them.
///
/// Values are kept as raw JSON: the model is asked for strings (or the
/// fixed sentinels `"Sí"`/`"No"`, `"M"`/`"F"`) but nothing re-checks that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedRecord(Map<String, Value>);

impl ExtractedRecord {
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// String value of `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for ExtractedRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Deref for ExtractedRecord {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// What kind of upload the image was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// An image passed through unchanged.
    Image,
    /// Page 1 of a PDF, rasterised to JPEG.
    Pdf,
}

/// Timings and sizes for one extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub source: SourceKind,
    /// Total pages in the uploaded PDF (`None` for images).
    pub page_count: Option<usize>,
    /// Size of the image actually sent, before base64.
    pub image_bytes: usize,
    pub ingest_duration_ms: u64,
    pub gateway_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A successful extraction: the record plus how it was obtained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub record: ExtractedRecord,
    pub stats: ExtractionStats,
}
