//! In-process object store.
//!
//! Clones share one lake, so a source session and a destination session built
//! from the same `MemoryObjectStore` see each other's writes, like two
//! credentialed clients against one S3 endpoint. Every call is recorded and
//! failures can be injected per operation (optionally per bucket).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{LegalHold, ObjectStore, ObjectTag, StoreError, StoreOperation};

/// Object as held by the memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub tags: Vec<ObjectTag>,
    pub legal_hold: LegalHold,
}

impl StoredObject {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: StoreOperation,
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: StoreOperation,
    bucket: Option<String>,
    message: String,
}

#[derive(Debug, Default)]
struct Lake {
    objects: HashMap<(String, String), StoredObject>,
    calls: Vec<StoreCall>,
    failures: Vec<InjectedFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    lake: Arc<Mutex<Lake>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lake(&self) -> MutexGuard<'_, Lake> {
        // A panicking test thread must not hide the lake from the assertions.
        self.lake.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed an object without recording a call.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.insert_object(
            bucket,
            key,
            StoredObject {
                body: body.into(),
                ..StoredObject::default()
            },
        );
    }

    pub fn insert_object(&self, bucket: &str, key: &str, object: StoredObject) {
        self.lake()
            .objects
            .insert((bucket.to_string(), key.to_string()), object);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lake()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Fail every call of `operation`, on any bucket.
    pub fn fail(&self, operation: StoreOperation, message: &str) {
        self.push_failure(operation, None, message);
    }

    /// Fail calls of `operation` that target `bucket`.
    pub fn fail_on_bucket(&self, operation: StoreOperation, bucket: &str, message: &str) {
        self.push_failure(operation, Some(bucket.to_string()), message);
    }

    fn push_failure(&self, operation: StoreOperation, bucket: Option<String>, message: &str) {
        self.lake().failures.push(InjectedFailure {
            operation,
            bucket,
            message: message.to_string(),
        });
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lake().calls.clone()
    }

    /// Recorded calls that mutate the lake.
    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation.is_write())
            .collect()
    }

    pub fn count(&self, operation: StoreOperation) -> usize {
        self.lake()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.lake().calls.clear();
    }

    /// Record the call, then apply any injected failure and run `f`.
    fn with_object<T>(
        &self,
        operation: StoreOperation,
        bucket: &str,
        key: &str,
        f: impl FnOnce(&mut Lake, (String, String)) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut lake = self.lake();
        lake.calls.push(StoreCall {
            operation,
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        let injected = lake.failures.iter().find(|failure| {
            failure.operation == operation
                && failure.bucket.as_deref().map_or(true, |b| b == bucket)
        });
        if let Some(failure) = injected {
            return Err(StoreError::Request {
                operation,
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: failure.message.clone(),
            });
        }

        f(&mut *lake, (bucket.to_string(), key.to_string()))
    }
}

fn no_such_key(id: &(String, String)) -> StoreError {
    StoreError::NoSuchKey {
        bucket: id.0.clone(),
        key: id.1.clone(),
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.with_object(StoreOperation::GetObject, bucket, key, |lake, id| {
            lake.objects
                .get(&id)
                .map(|o| o.body.clone())
                .ok_or_else(|| no_such_key(&id))
        })
    }

    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.with_object(StoreOperation::PutObject, bucket, key, |lake, id| {
            // An overwrite starts with an empty tag set, as on S3.
            lake.objects.insert(
                id,
                StoredObject {
                    body,
                    ..StoredObject::default()
                },
            );
            Ok(())
        })
    }

    fn get_tags(&self, bucket: &str, key: &str) -> Result<Vec<ObjectTag>, StoreError> {
        self.with_object(StoreOperation::GetTags, bucket, key, |lake, id| {
            lake.objects
                .get(&id)
                .map(|o| o.tags.clone())
                .ok_or_else(|| no_such_key(&id))
        })
    }

    fn put_tags(&self, bucket: &str, key: &str, tags: &[ObjectTag]) -> Result<(), StoreError> {
        self.with_object(StoreOperation::PutTags, bucket, key, |lake, id| {
            let object = lake.objects.get_mut(&id).ok_or_else(|| no_such_key(&id))?;
            object.tags = tags.to_vec();
            Ok(())
        })
    }

    fn legal_hold(&self, bucket: &str, key: &str) -> Result<LegalHold, StoreError> {
        self.with_object(StoreOperation::GetLegalHold, bucket, key, |lake, id| {
            lake.objects
                .get(&id)
                .map(|o| o.legal_hold)
                .ok_or_else(|| no_such_key(&id))
        })
    }

    fn set_legal_hold(&self, bucket: &str, key: &str, hold: LegalHold) -> Result<(), StoreError> {
        self.with_object(StoreOperation::PutLegalHold, bucket, key, |lake, id| {
            let object = lake.objects.get_mut(&id).ok_or_else(|| no_such_key(&id))?;
            object.legal_hold = hold;
            Ok(())
        })
    }
}
