//! Error handling for the snapshot server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::models::ErrorBody;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
///
/// Every failure that reaches the HTTP boundary is one of these kinds.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Camera id is not in the registry
    #[error("Unknown camera: {0}")]
    UnknownCamera(String),

    /// Frame source failed, ended, or produced unusable data
    #[error("Source unavailable for camera {camera_id}: {message}")]
    SourceUnavailable { camera_id: String, message: String },

    /// No first frame arrived within the start timeout
    #[error("Camera {camera_id} produced no frame within {timeout_ms}ms")]
    StartTimeout { camera_id: String, timeout_ms: u64 },

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Shorthand for a [`Error::SourceUnavailable`]
    pub fn source_unavailable(camera_id: &str, message: impl Into<String>) -> Self {
        Error::SourceUnavailable {
            camera_id: camera_id.to_string(),
            message: message.into(),
        }
    }

    /// Machine readable error code used in API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::UnknownCamera(_) => "UNKNOWN_CAMERA",
            Error::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            Error::StartTimeout { .. } => "START_TIMEOUT",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Error::UnknownCamera(_) => StatusCode::NOT_FOUND,
            Error::SourceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::StartTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Config(_) | Error::Io(_) | Error::Yaml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error_code = %error_code,
                message = %message,
                "Request error"
            );
        } else {
            tracing::debug!(
                status = %status,
                error_code = %error_code,
                message = %message,
                "Request rejected"
            );
        }

        let body = Json(ErrorBody {
            error_code: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
