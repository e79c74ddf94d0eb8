pub mod classify;
pub mod error;
pub mod idempotency;
pub mod orchestrator;
pub mod routing;
pub mod transform;
pub mod types;

pub use error::PipelineError;
pub use orchestrator::PersistenceOrchestrator;
pub use routing::BucketRouter;
pub use types::{
    ClassificationTag, ClassificationVerdict, Disposition, IngestEvent, PipelineOutcome,
    PipelineState, RoutingDecision,
};

use uuid::Uuid;

use crate::credentials::{self, CredentialBroker, CredentialError};

/// Open fresh sessions for both roles and run the orchestrator.
///
/// Blocking. The only error is a failed credential exchange, which happens
/// before any storage I/O.
pub fn ingest_event(
    broker: &dyn CredentialBroker,
    orchestrator: &PersistenceOrchestrator,
    event: &IngestEvent,
) -> Result<PipelineOutcome, CredentialError> {
    let span = tracing::info_span!(
        "ingest",
        run_id = %Uuid::new_v4(),
        bucket = %event.source_bucket,
        key = %event.object_key,
    );
    let _guard = span.enter();

    let sessions = credentials::open_sessions(broker).map_err(|e| {
        tracing::error!(error = %e, "Credential exchange failed");
        e
    })?;

    let outcome = orchestrator.run(event, &sessions);
    tracing::info!(
        final_state = outcome.final_state().as_str(),
        step_failures = outcome.step_failures.len(),
        "Pipeline run finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BucketConfig;
    use crate::credentials::{MockCredentialBroker, StorageRole};
    use crate::storage::{MemoryObjectStore, StoreOperation};

    fn orchestrator() -> PersistenceOrchestrator {
        PersistenceOrchestrator::new(BucketRouter::new(BucketConfig::default()))
    }

    #[test]
    fn credential_failure_precedes_storage_io() {
        let store = MemoryObjectStore::new();
        store.insert("raw", "shop1_a.csv", "a,b\n");
        let broker = MockCredentialBroker::new(store.clone()).refusing(StorageRole::Source);

        let result = ingest_event(&broker, &orchestrator(), &IngestEvent::new("raw", "shop1_a.csv"));

        assert!(result.is_err());
        assert!(store.calls().is_empty());
    }

    #[test]
    fn runs_with_both_sessions() {
        let store = MemoryObjectStore::new();
        store.insert("raw", "shop1_a.csv", "a,b\n");
        let broker = MockCredentialBroker::new(store.clone());

        let outcome =
            ingest_event(&broker, &orchestrator(), &IngestEvent::new("raw", "shop1_a.csv")).unwrap();

        assert!(outcome.is_complete());
        assert_eq!(store.count(StoreOperation::PutObject), 1);
        assert_eq!(
            store.object("anonymized", "shop1_a.csv").unwrap().body_text(),
            "shop1,a,b\n"
        );
    }
}
