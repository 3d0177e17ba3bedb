//! HTTP surface for CouncellorX.
//!
//! - `POST /process` – multipart upload (field `file`) of a PDF, JPEG, or PNG. Responds with
//!   `{"data": {"keyClauses": [...], "obligations": [...], "evidence": [...]}}`.
//! - `GET /health` – liveness check.
//!
//! Failures are reported as `{"detail": "..."}` with status 400 (bad request or unsupported
//! type), 413 (upload over 25 MiB), or 500 (storage or processing failure). The upload's
//! temporary file is removed before the response is returned, whatever the outcome.

use crate::mime::{self, MimeError};
use crate::pipeline::{PipelineError, SummaryPipeline};
use crate::summary::StructuredSummary;
use crate::upload::{UploadError, UploadReceiver};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::Instrument;
use uuid::Uuid;

/// Multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

/// Shared state handed to every request.
pub struct AppState<P> {
    /// Document pipeline invoked once the upload is stored.
    pub pipeline: Arc<P>,
    /// Receiver spooling uploads to temporary storage.
    pub receiver: UploadReceiver,
}

/// Build the HTTP router exposing the processing API.
pub fn create_router<P>(state: AppState<P>, allowed_origins: &[String]) -> Router
where
    P: SummaryPipeline + 'static,
{
    Router::new()
        .route("/process", post(process_document::<P>))
        .route("/health", get(health))
        // The receiver enforces the upload budget while streaming.
        .layer(DefaultBodyLimit::disable())
        .layer(cors_layer(allowed_origins))
        .with_state(Arc::new(state))
}

/// CORS policy admitting the configured origins with credentials.
///
/// A `*` entry admits any origin by echoing the caller's `Origin` header back, since a literal
/// wildcard cannot be combined with credentials.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|origin| origin == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(parse_origins(allowed_origins))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn parse_origins(allowed_origins: &[String]) -> Vec<HeaderValue> {
    allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

/// Success response for `POST /process`.
#[derive(Serialize)]
struct ProcessResponse {
    data: StructuredSummary,
}

/// Store the uploaded document, run the pipeline, and return the structured summary.
async fn process_document<P>(
    State(state): State<Arc<AppState<P>>>,
    multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError>
where
    P: SummaryPipeline,
{
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("process", %request_id);
    async move {
        let result = handle_upload(&state, multipart).await;
        match &result {
            Ok(_) => tracing::info!("Process request completed"),
            Err(error) => tracing::warn!(status = %error.status(), error = %error.detail(), "Process request failed"),
        }
        result.map(|data| Json(ProcessResponse { data }))
    }
    .instrument(span)
    .await
}

async fn handle_upload<P>(
    state: &AppState<P>,
    mut multipart: Multipart,
) -> Result<StructuredSummary, ApiError>
where
    P: SummaryPipeline,
{
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::BadRequest(format!("Invalid multipart body: {error}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Uploaded file has no filename".into()))?;
        let mime = mime::resolve(&filename)?;
        tracing::info!(filename = %filename, %mime, "Receiving upload");

        let upload = state.receiver.receive(Box::pin(field), &filename).await?;
        tracing::debug!(bytes = upload.size_bytes(), "Upload stored; running pipeline");

        let outcome = state.pipeline.run(upload.path()).await;
        upload.cleanup();
        return Ok(outcome?);
    }

    Err(ApiError::BadRequest(format!(
        "No file provided in multipart field '{FILE_FIELD}'"
    )))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Transport-level failure returned by the handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request (multipart problems, missing file).
    BadRequest(String),
    /// Extension is not a supported document type.
    UnsupportedType(MimeError),
    /// Upload exceeded the byte budget.
    PayloadTooLarge(String),
    /// Saving the upload, or reading it back, failed.
    Storage(String),
    /// Extraction or structuring failed.
    Processing(PipelineError),
}

impl ApiError {
    /// HTTP status reported for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::UnsupportedType(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(_) | Self::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable description placed in the response body.
    pub fn detail(&self) -> String {
        match self {
            Self::BadRequest(message) | Self::PayloadTooLarge(message) | Self::Storage(message) => {
                message.clone()
            }
            Self::UnsupportedType(error) => error.to_string(),
            Self::Processing(error) => format!("Processing failed: {error}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.detail() }))).into_response()
    }
}

impl From<MimeError> for ApiError {
    fn from(inner: MimeError) -> Self {
        Self::UnsupportedType(inner)
    }
}

impl From<UploadError> for ApiError {
    fn from(inner: UploadError) -> Self {
        match inner {
            UploadError::PayloadTooLarge { .. } => Self::PayloadTooLarge(inner.to_string()),
            UploadError::Io(_) | UploadError::Stream(_) => Self::Storage(inner.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(inner: PipelineError) -> Self {
        match inner {
            PipelineError::UnsupportedType(error) => Self::UnsupportedType(error),
            error @ PipelineError::Read(_) => Self::Storage(error.to_string()),
            other => Self::Processing(other),
        }
    }
}
