use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Terminal failure states of one upload/profile cycle.
///
/// Every variant is recovered at the controller boundary and turned into a
/// user-visible banner plus a redirect back to the upload form; none of them
/// crash the worker.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no file part in the request, or the filename was empty")]
    NoFile,

    #[error("rejected extension for '{0}'")]
    RejectedFormat(String),

    #[error("could not read file: {0}")]
    Unreadable(String),

    #[error("profiling engine failed: {0}")]
    Profiling(String),

    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

/// Web-boundary errors: transport-level faults that never reach the pipeline.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid multipart request: {0}")]
    Multipart(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Multipart(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
