use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::ffmpeg::RunError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure classes surfaced to callers. Every failure terminates its job;
/// nothing retries.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Processing failed: {0}")]
    Processing(String),

    #[error("Background removal failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Processing(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<RunError> for ApiError {
    fn from(error: RunError) -> Self {
        match error {
            RunError::Ffmpeg(diagnostic) => Self::Processing(format!("FFmpeg error: {diagnostic}")),
            RunError::MissingOutput => Self::Processing("Output file was not created".into()),
            RunError::Spawn(error) => Self::Processing(format!("Failed to spawn ffmpeg: {error}")),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details stay in the log; the caller gets a generic
        // message. Everything else is already caller-safe.
        let message = match &self {
            ApiError::Internal(source) => {
                error!(%status, error = ?source, "Request failed unexpectedly");
                "Unexpected error".to_string()
            }
            other => {
                let message = other.to_string();
                if status.is_server_error() {
                    error!(%status, %message, "Request failed");
                } else {
                    warn!(%status, %message, "Request rejected");
                }
                message
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
