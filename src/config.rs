//! Configuration types for document extraction and the HTTP endpoint.
//!
//! Everything that shapes an extraction request lives in [`ExtractionConfig`],
//! built via [`ExtractionConfigBuilder`]. The gateway credential is NOT part
//! of it: it is handed to the gateway constructor directly (see
//! [`crate::pipeline::gateway::OpenAiGateway::new`]) so that configs can be
//! logged and shared freely.

use crate::error::ExtractError;
use crate::schema::{ExtractionSchema, SchemaKind};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Bounds applied to [`ExtractionConfig::max_rendered_pixels`].
pub const MIN_RENDERED_PIXELS: u32 = 100;
pub const MAX_RENDERED_PIXELS: u32 = 10_000;

/// Configuration for one extraction pipeline.
///
/// # Example
/// ```rust
/// use edgequake_idextract::{ExtractionConfig, SchemaKind};
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4o-mini")
///     .schema_kind(SchemaKind::Identity)
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.schema.name, "identity");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Model identifier sent to the gateway. Default: `gpt-4o`.
    pub model: String,

    /// Maximum tokens the model may generate. Default: 300.
    ///
    /// The extended schema answer is ~200 tokens; a tight cap keeps a
    /// chatty model from burning budget on prose we will reject anyway.
    pub max_tokens: usize,

    /// Sampling temperature. `None` leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Per-gateway-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Longest edge, in pixels, of a rasterised PDF page. Default: 2000.
    pub max_rendered_pixels: u32,

    /// JPEG quality (1–100) for rasterised PDF pages. Default: 90.
    pub jpeg_quality: u8,

    /// Target field set. Default: [`ExtractionSchema::extended`].
    pub schema: ExtractionSchema,

    /// Full instruction text override. If `None`, the instruction is
    /// rendered from `schema`.
    pub instruction: Option<String>,

    /// Image detail hint (`low`, `high`, `auto`). `None` omits it.
    pub image_detail: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 300,
            temperature: None,
            api_timeout_secs: 60,
            max_rendered_pixels: 2000,
            jpeg_quality: 90,
            schema: ExtractionSchema::default(),
            instruction: None,
            image_detail: None,
        }
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(MIN_RENDERED_PIXELS, MAX_RENDERED_PIXELS);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn schema(mut self, schema: ExtractionSchema) -> Self {
        self.config.schema = schema;
        self
    }

    pub fn schema_kind(self, kind: SchemaKind) -> Self {
        self.schema(ExtractionSchema::from_kind(kind))
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn image_detail(mut self, detail: impl Into<String>) -> Self {
        self.config.image_detail = Some(detail.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(ExtractError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.schema.fields.is_empty() && c.instruction.is_none() {
            return Err(ExtractError::InvalidConfig(
                "schema has no fields and no instruction override was given".into(),
            ));
        }
        if let Some(ref d) = c.image_detail {
            if !matches!(d.as_str(), "low" | "high" | "auto") {
                return Err(ExtractError::InvalidConfig(format!(
                    "image_detail must be low, high or auto, got '{d}'"
                )));
            }
        }
        Ok(self.config)
    }
}

/// Settings for the HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address. Default: `0.0.0.0:5000`.
    pub bind: SocketAddr,
    /// Largest accepted request body, in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Set the upload limit in MiB. Zero becomes 1 MiB; overflow saturates.
    pub fn with_max_upload_mb(mut self, mb: usize) -> Self {
        self.max_upload_bytes = mb.max(1).saturating_mul(1024 * 1024);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}
