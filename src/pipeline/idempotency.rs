//! Processed-marker guard.
//!
//! The `processed=true` tag on the source object is the only record that an
//! object has been routed. A missing object or missing tag reads as "not
//! processed"; any other lookup failure is returned to the caller, which skips
//! the run rather than risk duplicate side effects on a transient error.

use crate::storage::{ObjectStore, ObjectTag, StoreError};

pub fn is_processed(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<bool, StoreError> {
    match store.get_tags(bucket, key) {
        Ok(tags) => Ok(tags.iter().any(ObjectTag::is_processed_marker)),
        Err(e) if e.is_no_such_key() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Overwrite the tag set with exactly `processed=true`.
pub fn mark_processed(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<(), StoreError> {
    store.put_tags(bucket, key, &[ObjectTag::processed()])
}
