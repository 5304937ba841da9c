// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of service errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga_core::SagaError;
use serde::Serialize;
use tracing::{error, warn};

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// The request body failed validation.
    BadRequest(String),
    Service(SagaError),
}

impl From<SagaError> for ApiError {
    fn from(e: SagaError) -> Self {
        ApiError::Service(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(e) => match e {
                SagaError::NotFound(_) => StatusCode::NOT_FOUND,
                SagaError::Provider { .. } => StatusCode::BAD_GATEWAY,
                SagaError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(message) => message,
            ApiError::Service(e) => {
                if status.is_server_error() {
                    error!(status = status.as_u16(), error = %e, "request failed");
                } else {
                    warn!(status = status.as_u16(), error = %e, "request rejected");
                }
                e.to_string()
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_mapping() {
        let cases = [
            (SagaError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                SagaError::Provider {
                    message: "down".into(),
                    source: None,
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                SagaError::Timeout {
                    duration: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (SagaError::storage_msg("locked"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
        assert_eq!(
            ApiError::BadRequest("empty".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn error_body_shape() {
        let json = serde_json::to_string(&ErrorResponse {
            error: "not found: story line 9".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"not found: story line 9"}"#);
    }
}
