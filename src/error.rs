use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// HTTP-facing error for the generation endpoints.
///
/// Every variant renders the same `{error, details?}` body so callers can
/// branch on the status code alone.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// A required setting is missing; the request is not attempted.
    #[error("{0}")]
    Misconfigured(&'static str),

    #[error("{message}")]
    Internal {
        message: &'static str,
        details: String,
    },

    #[error("{message}")]
    UpstreamRejected {
        message: &'static str,
        details: String,
    },

    #[error("{message}")]
    UpstreamTimeout {
        message: &'static str,
        details: String,
    },
}

/// JSON error body shared by all endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Misconfigured(_) | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::UpstreamRejected { .. } => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.to_string();
        let details = match self {
            ApiError::Internal { details, .. }
            | ApiError::UpstreamRejected { details, .. }
            | ApiError::UpstreamTimeout { details, .. } => Some(details),
            ApiError::Misconfigured(msg) => {
                tracing::error!(error = msg, "Server misconfiguration");
                None
            }
            ApiError::BadRequest(_) | ApiError::Unauthorized => None,
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}
