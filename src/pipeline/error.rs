//! Reasons a pipeline run stops early.
//!
//! These never cross the orchestrator boundary as `Err`; they are carried in
//! the run's `Disposition` and logged.

use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Idempotency check failed, skipping: {0}")]
    IdempotencyCheck(StoreError),

    #[error("Read failed: {0}")]
    Read(StoreError),

    #[error("Payload of {bucket}/{key} is not valid UTF-8: {reason}")]
    Decode {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("Write failed: {0}")]
    Write(StoreError),
}
