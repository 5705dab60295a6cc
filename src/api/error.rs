//! HTTP error responses for the proxy endpoints

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::Error;

/// Proxy endpoint errors
///
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    /// Inference credential missing; no external call was attempted
    NotConfigured(&'static str),
    /// Malformed or missing request input
    BadRequest(String),
    /// Gateway or knowledge document failure
    Upstream(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(msg) => Self::BadRequest(msg),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl ApiError {
    /// HTTP status for this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let status = self.status();
        let error = match self {
            Self::NotConfigured(msg) => msg.to_string(),
            Self::BadRequest(msg) | Self::Upstream(msg) => msg,
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %error, "request failed");
        } else {
            tracing::debug!(status = %status, error = %error, "request rejected");
        }

        (status, Json(ErrorResponse { error })).into_response()
    }
}
