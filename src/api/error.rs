//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::envelope::EnvelopeError;
use crate::credentials::CredentialError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Malformed event: {0}")]
    BadRequest(String),
    #[error("Credential exchange failed: {0}")]
    Credentials(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_EVENT", detail.clone())
            }
            ApiError::Credentials(detail) => {
                tracing::error!(detail, "Credential exchange failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CREDENTIALS",
                    "Failed to obtain storage credentials".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(err: EnvelopeError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        ApiError::Credentials(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn bad_request_returns_400_with_detail() {
        let response = ApiError::BadRequest("missing field `Records`".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "MALFORMED_EVENT");
        assert_eq!(json["error"]["message"], "missing field `Records`");
    }

    #[tokio::test]
    async fn credentials_returns_500_without_detail() {
        let err: ApiError = CredentialError::TokenRejected {
            status: 401,
            body: "secret-bearing body".into(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "CREDENTIALS");
        assert!(!json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("secret-bearing"));
    }

    #[tokio::test]
    async fn internal_returns_500() {
        let response = ApiError::Internal("worker panicked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn envelope_error_maps_to_bad_request() {
        let err: ApiError = EnvelopeError::NoRecords.into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
