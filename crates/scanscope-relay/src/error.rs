use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::files::PathError;

/// Failures inside the relay itself
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors of the file and scan-trigger routes, rendered as `{"error": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("File not found")]
    FileNotFound,

    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Jenkins credentials not configured")]
    CredentialsMissing,

    #[error("Jenkins responded with status: {}", status.as_u16())]
    Upstream { status: StatusCode, details: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::FileNotFound => StatusCode::NOT_FOUND,
            Self::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Self::CredentialsMissing | Self::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Upstream { details, .. } => json!({ "error": self.to_string(), "details": details }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Errors of the package upload route, rendered as `{"success": false, "error": ...}`
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file provided")]
    NoFile,

    #[error("Invalid file type. Only IPA files are allowed.")]
    InvalidFileType,

    #[error("Malformed upload: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoFile | Self::InvalidFileType => StatusCode::BAD_REQUEST,
            Self::Multipart(e) => e.status(),
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
