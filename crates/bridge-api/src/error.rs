//! Error-to-response mapping for the admin API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use bridge_core::error::BridgeError;

/// Error response body with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Stable error code (`invalid_url`, `unknown_subscriber`, ...).
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

/// API-level wrapper around [`BridgeError`].
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BridgeError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            BridgeError::UnknownSubscriber { .. } => StatusCode::NOT_FOUND,
            BridgeError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Store failures keep their detail in the log, not the response.
        let message = match &self.0 {
            BridgeError::Store { .. } => {
                tracing::error!(error = %self.0, "store failure surfaced to API");
                "internal storage error".to_string()
            },
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorDetail { code: self.0.code().to_string(), message },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_maps_to_bad_request() {
        let response = ApiError(BridgeError::invalid_url("ftp://x")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_subscriber_maps_to_not_found() {
        let id = bridge_core::SubscriberId::new();
        let response = ApiError(BridgeError::unknown_subscriber(id)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_errors_hide_detail() {
        let response = ApiError(BridgeError::store("disk exploded at /var/db")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
