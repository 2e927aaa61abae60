use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roadwatch_core::error::CoreError;
use roadwatch_pipeline::{ArtifactError, PipelineError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `roadwatch_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The detection pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Writing to the media directory failed.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// The multipart body could not be read (malformed or over the size limit).
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// A media file that does not exist or may not be served.
    #[error("File not found")]
    FileNotFound,

    /// The request did not finish within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }

            // --- Database errors ---
            AppError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                internal()
            }

            // --- Pipeline errors ---
            AppError::Pipeline(PipelineError::Decode(err)) => {
                tracing::warn!(error = %err, "Uploaded video could not be decoded");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "DECODE_ERROR",
                    "Uploaded file could not be decoded as video".to_string(),
                )
            }
            AppError::Pipeline(err) => {
                tracing::error!(error = %err, "Pipeline error");
                internal()
            }
            AppError::Artifact(err) => {
                tracing::error!(error = %err, "Media storage error");
                internal()
            }

            // --- HTTP-specific errors ---
            AppError::Multipart(err) => {
                let status = err.status();
                if status == StatusCode::PAYLOAD_TOO_LARGE {
                    (status, "PAYLOAD_TOO_LARGE", "Uploaded file is too large".to_string())
                } else {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.body_text())
                }
            }
            AppError::FileNotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "File not found".to_string(),
            ),
            AppError::Timeout => (
                StatusCode::REQUEST_TIMEOUT,
                "REQUEST_TIMEOUT",
                "Request timed out".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
