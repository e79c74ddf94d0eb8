//! Ingest router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes: `GET /` and `GET /healthz` for liveness, `POST /` for events.

use axum::routing::get;
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the ingest router with access logging on every route.
pub fn ingest_router(ctx: ApiContext) -> Router {
    Router::new()
        .route(
            "/",
            get(endpoints::health::check).post(endpoints::ingest::trigger),
        )
        .route("/healthz", get(endpoints::health::check))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
}
