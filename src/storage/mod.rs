//! Object-store boundary.
//!
//! The pipeline only ever talks to the lake through [`ObjectStore`]. Two
//! implementations ship with the crate:
//! - [`s3::S3ObjectStore`]: S3-compatible endpoint via `aws-sdk-s3`
//! - [`memory::MemoryObjectStore`]: in-process lake with failure injection
//!
//! The trait is blocking. Callers run it on the blocking pool.

pub mod memory;
pub mod s3;

use std::fmt;

pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

/// Tag key for the idempotency marker.
pub const PROCESSED_TAG_KEY: &str = "processed";
/// Tag key for the routing classification.
pub const CLASSIFICATION_TAG_KEY: &str = "DataClassification";

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Single key/value tag on an object.
///
/// Constructed only through [`ObjectTag::processed`] and
/// `ClassificationTag::object_tag`, never from loose strings in pipeline code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTag {
    pub key: String,
    pub value: String,
}

impl ObjectTag {
    pub(crate) fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The `processed=true` marker.
    pub fn processed() -> Self {
        Self::new(PROCESSED_TAG_KEY, "true")
    }

    pub fn is_processed_marker(&self) -> bool {
        self.key == PROCESSED_TAG_KEY && self.value == "true"
    }
}

/// Legal-hold state of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegalHold {
    On,
    #[default]
    Off,
}

/// Store operation, carried in errors and in the memory store's call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    GetObject,
    PutObject,
    GetTags,
    PutTags,
    GetLegalHold,
    PutLegalHold,
}

impl StoreOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetObject => "get_object",
            Self::PutObject => "put_object",
            Self::GetTags => "get_object_tagging",
            Self::PutTags => "put_object_tagging",
            Self::GetLegalHold => "get_object_legal_hold",
            Self::PutLegalHold => "put_object_legal_hold",
        }
    }

    /// Whether the operation mutates the store.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::PutObject | Self::PutTags | Self::PutLegalHold)
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("No such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    #[error("{operation} failed for {bucket}/{key}: {message}")]
    Request {
        operation: StoreOperation,
        bucket: String,
        key: String,
        message: String,
    },
}

impl StoreError {
    pub fn is_no_such_key(&self) -> bool {
        matches!(self, Self::NoSuchKey { .. })
    }
}

// ═══════════════════════════════════════════════════════════
// Trait
// ═══════════════════════════════════════════════════════════

/// Blocking object-store operations used by the pipeline.
pub trait ObjectStore: Send + Sync {
    /// Read the full object body.
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Write (create or overwrite) an object.
    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// Current tag set. An object with no tags yields an empty vector.
    fn get_tags(&self, bucket: &str, key: &str) -> Result<Vec<ObjectTag>, StoreError>;

    /// Replace the whole tag set.
    fn put_tags(&self, bucket: &str, key: &str, tags: &[ObjectTag]) -> Result<(), StoreError>;

    /// Current legal-hold state. No hold configured reads as [`LegalHold::Off`].
    fn legal_hold(&self, bucket: &str, key: &str) -> Result<LegalHold, StoreError>;

    fn set_legal_hold(&self, bucket: &str, key: &str, hold: LegalHold) -> Result<(), StoreError>;
}

/// The two independently credentialed sessions one pipeline run works with.
pub struct StorageSessions {
    pub source: Box<dyn ObjectStore>,
    pub destination: Box<dyn ObjectStore>,
}
