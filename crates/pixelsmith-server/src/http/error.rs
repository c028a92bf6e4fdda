use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pixelsmith_core::{ErrorKind, TransformError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Message sent for every server-side failure; the cause goes in `details`.
pub const PROCESSING_FAILED: &str = "Image processing failed";

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("request body too large: {0}")]
    BodyTooLarge(String),
    #[error("malformed multipart body: {0}")]
    Multipart(String),
    #[error("processing worker stopped before replying")]
    WorkerGone,
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::BodyTooLarge(err.body_text())
        } else {
            AppError::Multipart(err.body_text())
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Transform(err) => match err.kind() {
                ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                kind if kind.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::WorkerGone => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        if self.status().is_server_error() {
            return ErrorBody {
                error: PROCESSING_FAILED.to_string(),
                details: Some(self.to_string()),
            };
        }
        let error = match self {
            AppError::Transform(TransformError::InvalidParameters(message)) => message.clone(),
            other => other.to_string(),
        };
        ErrorBody {
            error,
            details: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "request failed: {}", self);
        } else {
            debug!(status = status.as_u16(), "request rejected: {}", self);
        }
        (status, Json(self.body())).into_response()
    }
}
