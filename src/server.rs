//! HTTP endpoint: `POST /ocr-curp` with a multipart `file` field.
//!
//! The handler is a thin shim over [`Extractor::extract`]. All failures come
//! back as [`ExtractError`] and are rendered by its `IntoResponse` impl into
//! a JSON body with a stable `error` classification:
//!
//! | classification        | status |
//! |-----------------------|--------|
//! | `MissingFileError`    | 400    |
//! | `IngestionError`      | 422 (413 when over the upload limit) |
//! | `GatewayError`        | 502    |
//! | `ResponseFormatError` | 502    |
//! | `GatewayTimeoutError` | 504    |
//! | `InternalError`       | 500    |

use crate::config::ServerConfig;
use crate::error::{ExtractError, GatewayError};
use crate::extract::Extractor;
use crate::output::ExtractedRecord;
use crate::pipeline::ingest::UploadedFile;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Route of the extraction endpoint.
pub const EXTRACT_PATH: &str = "/ocr-curp";
/// Name of the multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

#[derive(Clone)]
struct AppState {
    extractor: Extractor,
    max_upload_bytes: usize,
}

/// Build the application router.
pub fn router(extractor: Extractor, server: &ServerConfig) -> Router {
    Router::new()
        .route(EXTRACT_PATH, post(extract_document))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            extractor,
            max_upload_bytes: server.max_upload_bytes,
        })
}

/// Bind `server.bind` and serve until `shutdown` resolves.
pub async fn serve(
    extractor: Extractor,
    server: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(server.bind).await?;
    info!(
        "Listening on http://{}{}",
        listener.local_addr()?,
        EXTRACT_PATH
    );
    axum::serve(listener, router(extractor, server))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn extract_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractedRecord>, ExtractError> {
    let multipart = multipart.map_err(|rejection| {
        debug!("Request is not multipart: {}", rejection.body_text());
        ExtractError::MissingFile
    })?;

    let upload = read_file_field(multipart, state.max_upload_bytes).await?;
    let output = state.extractor.extract(&upload).await?;
    Ok(Json(output.record))
}

/// Pull the first `file` part that carries a filename out of the body.
///
/// A plain text field named `file` is not an upload. Other fields are ignored.
async fn read_file_field(
    mut multipart: Multipart,
    limit_bytes: usize,
) -> Result<UploadedFile, ExtractError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Failed to parse multipart data", limit_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            debug!("Ignoring '{}' field without a filename", FILE_FIELD);
            continue;
        };

        let media_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "Failed to read uploaded file", limit_bytes))?;

        return Ok(UploadedFile {
            bytes: bytes.to_vec(),
            media_type,
            file_name: Some(file_name),
        });
    }
    Err(ExtractError::MissingFile)
}

fn multipart_error(e: MultipartError, context: &str, limit_bytes: usize) -> ExtractError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ExtractError::UploadTooLarge { limit_bytes }
    } else {
        ExtractError::ingestion(format!("{}: {}", context, e.body_text()))
    }
}

impl ExtractError {
    /// HTTP status for this failure: 4xx for caller errors, 5xx otherwise.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExtractError::MissingFile => StatusCode::BAD_REQUEST,
            ExtractError::Ingestion { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ExtractError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ExtractError::Gateway(_) | ExtractError::ResponseFormat { .. } => StatusCode::BAD_GATEWAY,
            ExtractError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ExtractError::InvalidConfig(_) | ExtractError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON error body: classification, message and any diagnostic detail.
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "error": self.classification(),
            "message": self.to_string(),
        });
        match self {
            ExtractError::Ingestion { reason } => {
                body["detail"] = json!(reason);
            }
            ExtractError::UploadTooLarge { limit_bytes } => {
                body["limit_bytes"] = json!(limit_bytes);
            }
            ExtractError::Gateway(gw) => {
                body["detail"] = json!(gw.to_string());
                if let GatewayError::RateLimited {
                    retry_after_secs: Some(secs),
                    ..
                } = gw
                {
                    body["retry_after_secs"] = json!(secs);
                }
            }
            ExtractError::ResponseFormat {
                reason,
                raw,
                cleaned,
            } => {
                body["detail"] = json!(reason);
                body["raw"] = json!(raw);
                body["cleaned"] = json!(cleaned);
            }
            _ => {}
        }
        body
    }
}

impl IntoResponse for ExtractError {
    fn into_response(self) -> Response {
        match &self {
            ExtractError::MissingFile
            | ExtractError::Ingestion { .. }
            | ExtractError::UploadTooLarge { .. } => {
                warn!("Rejected upload: {}", self);
            }
            ExtractError::Gateway(_)
            | ExtractError::GatewayTimeout { .. }
            | ExtractError::ResponseFormat { .. } => {
                error!("Upstream model failure: {}", self);
            }
            ExtractError::InvalidConfig(_) | ExtractError::Internal(_) => {
                error!("Internal service error: {:#}", self);
            }
        }

        (self.status_code(), Json(self.to_body())).into_response()
    }
}
