//! Error taxonomy shared by every endpoint.
//!
//! Each failure is rendered at the request boundary as a JSON body with an
//! `error` field and, when the upstream service sent one, the raw payload as
//! `details`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// A required request field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The referenced model or image does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A cloud API answered with an explicit error.
    #[error("{message}")]
    UpstreamReported {
        message: String,
        details: Option<Value>,
    },

    /// A cloud API answered, but without any field we can use.
    #[error("{message}")]
    UpstreamShape {
        message: String,
        details: Option<Value>,
    },

    /// Network or decompression failure.
    #[error("{0}")]
    Transport(String),

    #[error("Timeout waiting for job")]
    Timeout { job_id: String, attempts: u32 },

    #[error("Polling cancelled for job {job_id}")]
    Cancelled { job_id: String },

    #[error("{0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl AppError {
    pub fn upstream(message: impl Into<String>, details: Value) -> Self {
        AppError::UpstreamReported {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn shape(message: impl Into<String>, details: Option<Value>) -> Self {
        AppError::UpstreamShape {
            message: message.into(),
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamReported { .. }
            | AppError::UpstreamShape { .. }
            | AppError::Transport(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Configuration(_) | AppError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<&Value> {
        match self {
            AppError::UpstreamReported { details, .. } | AppError::UpstreamShape { details, .. } => {
                details.as_ref()
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::Transport(format!("Failed to unpack model archive: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let mut body = json!({ "error": self.to_string() });
        if let Some(details) = self.details() {
            body["details"] = details.clone();
        }
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
