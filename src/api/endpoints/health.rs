//! Liveness endpoint.

use axum::http::StatusCode;

pub const HEALTH_BODY: &str = "Health OK";

/// `GET /` and `GET /healthz`. Touches no storage.
pub async fn check() -> (StatusCode, &'static str) {
    (StatusCode::OK, HEALTH_BODY)
}
