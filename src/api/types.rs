//! Shared state for the ingest router.

use std::sync::Arc;

use crate::config::BucketConfig;
use crate::credentials::CredentialBroker;
use crate::pipeline::{BucketRouter, PersistenceOrchestrator};

/// Shared context for all routes and middleware.
///
/// Holds no per-event state: credentials are exchanged per event inside the
/// handler, so concurrent requests never share a storage session.
#[derive(Clone)]
pub struct ApiContext {
    pub broker: Arc<dyn CredentialBroker>,
    pub orchestrator: Arc<PersistenceOrchestrator>,
}

impl ApiContext {
    pub fn new(broker: Arc<dyn CredentialBroker>, buckets: BucketConfig) -> Self {
        Self {
            broker,
            orchestrator: Arc::new(PersistenceOrchestrator::new(BucketRouter::new(buckets))),
        }
    }
}
