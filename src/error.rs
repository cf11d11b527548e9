//! Error types for the edgequake-idextract library.
//!
//! Two error types reflect the two sides of the pipeline:
//!
//! * [`ExtractError`]: the outcome of one extraction request. Every variant
//!   carries a stable classification string (see [`ExtractError::classification`])
//!   which is what HTTP clients match on, plus a human-readable message.
//!
//! * [`GatewayError`]: a failure inside the Model Gateway (transport, auth,
//!   rate limiting, upstream rejection). It is opaque to the rest of the
//!   pipeline and surfaces wrapped in [`ExtractError::Gateway`].
//!
//! Caller-caused failures (no file, undecodable upload) are distinguished
//! from service-dependency failures by [`ExtractError::is_client_error`].

use thiserror::Error;

/// All failures an extraction request can end in.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Caller errors ─────────────────────────────────────────────────────
    /// The multipart body had no `file` part.
    #[error("No file was uploaded. Send the document in a multipart field named 'file'.")]
    MissingFile,

    /// The upload could not be turned into an image (corrupt PDF, zero pages, …).
    #[error("Could not process the uploaded file: {reason}")]
    Ingestion { reason: String },

    /// The request body exceeded the server's upload limit.
    #[error("Uploaded file exceeds the {limit_bytes}-byte upload limit")]
    UploadTooLarge { limit_bytes: usize },

    // ── Service-dependency errors ─────────────────────────────────────────
    /// The Model Gateway failed.
    #[error("Model gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The Model Gateway did not answer within the configured timeout.
    #[error("Model gateway timed out after {secs}s")]
    GatewayTimeout { secs: u64 },

    /// The model answered, but not with a single JSON object.
    #[error("Model answer is not a single JSON object: {reason}")]
    ResponseFormat {
        /// Parser message (or shape mismatch) explaining the rejection.
        reason: String,
        /// The answer exactly as the gateway returned it.
        raw: String,
        /// The text the parser actually saw, after trimming and fence-stripping.
        cleaned: String,
    },

    // ── Config / internal ─────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error (task panic, pdfium unavailable, …).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Stable classification string sent to HTTP clients in the `error` field.
    pub fn classification(&self) -> &'static str {
        match self {
            ExtractError::MissingFile => "MissingFileError",
            ExtractError::Ingestion { .. } | ExtractError::UploadTooLarge { .. } => {
                "IngestionError"
            }
            ExtractError::Gateway(_) => "GatewayError",
            ExtractError::GatewayTimeout { .. } => "GatewayTimeoutError",
            ExtractError::ResponseFormat { .. } => "ResponseFormatError",
            ExtractError::InvalidConfig(_) | ExtractError::Internal(_) => "InternalError",
        }
    }

    /// `true` when the caller can fix the failure by sending a different request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExtractError::MissingFile
                | ExtractError::Ingestion { .. }
                | ExtractError::UploadTooLarge { .. }
        )
    }

    pub(crate) fn ingestion(reason: impl Into<String>) -> Self {
        ExtractError::Ingestion {
            reason: reason.into(),
        }
    }
}

/// A failure reported by a [`crate::pipeline::gateway::ModelGateway`].
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Connection refused, DNS failure, TLS error, broken body, …
    #[error("transport failure: {0}")]
    Transport(String),

    /// 401/403 from the provider; retrying will not help.
    #[error("authorization rejected by provider '{provider}': {detail}")]
    Auth { provider: String, detail: String },

    /// 429 from the provider.
    #[error("rate limit exceeded for provider '{provider}'")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Any other non-success status.
    #[error("provider '{provider}' returned HTTP {status}: {detail}")]
    Upstream {
        provider: String,
        status: u16,
        detail: String,
    },

    /// Opaque failure from a provider library that does not expose a status.
    #[error("provider '{provider}' failed: {detail}")]
    Provider { provider: String, detail: String },

    /// The provider answered successfully but without any text.
    #[error("provider '{provider}' returned no answer text")]
    EmptyAnswer { provider: String },
}
