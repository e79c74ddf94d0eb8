//! Event trigger: one storage notification in, one pipeline run out.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::api::envelope;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline;

/// `POST /`: run the pipeline for the notification's single object.
///
/// Responds 204 once the run reaches a terminal state, including aborts and
/// skipped redeliveries. Storage failures are logged inside the run and are
/// not surfaced to the event source.
pub async fn trigger(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let event = envelope::parse_event(&headers, &body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected malformed event");
        ApiError::from(e)
    })?;

    tracing::info!(
        bucket = %event.source_bucket,
        key = %event.object_key,
        "Ingest event received"
    );

    // Storage adapters block; keep them off the async workers.
    let outcome = tokio::task::spawn_blocking(move || {
        pipeline::ingest_event(ctx.broker.as_ref(), &ctx.orchestrator, &event)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Pipeline worker failed: {e}")))??;

    tracing::debug!(
        final_state = outcome.final_state().as_str(),
        "Ingest event handled"
    );
    Ok(StatusCode::NO_CONTENT)
}
