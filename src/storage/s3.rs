//! S3-compatible object store backed by `aws-sdk-s3`.
//!
//! The SDK is async; the pipeline is not. Each call is driven to completion on
//! the runtime handle captured when the session was opened, from a thread of
//! the blocking pool.

use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectLockLegalHold, ObjectLockLegalHoldStatus, Tag, Tagging};
use tokio::runtime::Handle;

use crate::config::sdk_base;

use super::{LegalHold, ObjectStore, ObjectTag, StoreError, StoreOperation};

/// Error codes S3 (and MinIO) use for a missing object.
const MISSING_KEY_CODES: &[&str] = &["NoSuchKey", "NotFound"];
/// Returned by `GetObjectLegalHold` when no hold was ever configured.
const NO_LEGAL_HOLD_CODES: &[&str] = &["NoSuchObjectLockConfiguration", "ObjectLockConfigurationNotFoundError"];

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    runtime: Handle,
}

impl S3ObjectStore {
    /// Build a client for `endpoint_url` using role-scoped credentials.
    ///
    /// Path-style addressing is forced (MinIO and most self-hosted lakes do
    /// not serve virtual-hosted buckets). SDK retries are disabled: redelivery
    /// of the whole event is the only retry mechanism.
    pub fn new(
        endpoint_url: &str,
        region: &str,
        credentials: Credentials,
        runtime: Handle,
    ) -> Self {
        let config = aws_sdk_s3::config::Builder::from(&sdk_base(endpoint_url, region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(config),
            runtime,
        }
    }
}

fn error_code<E, R>(err: &SdkError<E, R>) -> Option<&str>
where
    E: ProvideErrorMetadata,
{
    err.as_service_error().and_then(|e| e.code())
}

/// Map an SDK failure to a `StoreError`, recognising missing keys.
fn map_sdk_error<E, R>(
    operation: StoreOperation,
    bucket: &str,
    key: &str,
    err: SdkError<E, R>,
) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    if error_code(&err).is_some_and(|code| MISSING_KEY_CODES.contains(&code)) {
        return StoreError::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
    }
    StoreError::Request {
        operation,
        bucket: bucket.to_string(),
        key: key.to_string(),
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn build_error(operation: StoreOperation, bucket: &str, key: &str, message: String) -> StoreError {
    StoreError::Request {
        operation,
        bucket: bucket.to_string(),
        key: key.to_string(),
        message,
    }
}

impl ObjectStore for S3ObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let op = StoreOperation::GetObject;
        self.runtime.block_on(async {
            let output = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| map_sdk_error(op, bucket, key, e))?;

            let bytes = output
                .body
                .collect()
                .await
                .map_err(|e| build_error(op, bucket, key, format!("body stream: {e}")))?;
            Ok::<_, StoreError>(bytes.into_bytes().to_vec())
        })
    }

    fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.runtime.block_on(async {
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(ByteStream::from(body))
                .send()
                .await
                .map_err(|e| map_sdk_error(StoreOperation::PutObject, bucket, key, e))?;
            Ok::<_, StoreError>(())
        })
    }

    fn get_tags(&self, bucket: &str, key: &str) -> Result<Vec<ObjectTag>, StoreError> {
        self.runtime.block_on(async {
            let output = self
                .client
                .get_object_tagging()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| map_sdk_error(StoreOperation::GetTags, bucket, key, e))?;

            Ok::<_, StoreError>(output
                .tag_set()
                .iter()
                .map(|t| ObjectTag::new(t.key(), t.value()))
                .collect())
        })
    }

    fn put_tags(&self, bucket: &str, key: &str, tags: &[ObjectTag]) -> Result<(), StoreError> {
        let op = StoreOperation::PutTags;
        let tag_set = tags
            .iter()
            .map(|t| {
                Tag::builder()
                    .key(&t.key)
                    .value(&t.value)
                    .build()
                    .map_err(|e| build_error(op, bucket, key, e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| build_error(op, bucket, key, e.to_string()))?;

        self.runtime.block_on(async {
            self.client
                .put_object_tagging()
                .bucket(bucket)
                .key(key)
                .tagging(tagging)
                .send()
                .await
                .map_err(|e| map_sdk_error(op, bucket, key, e))?;
            Ok::<_, StoreError>(())
        })
    }

    fn legal_hold(&self, bucket: &str, key: &str) -> Result<LegalHold, StoreError> {
        self.runtime.block_on(async {
            let result = self
                .client
                .get_object_legal_hold()
                .bucket(bucket)
                .key(key)
                .send()
                .await;

            match result {
                Ok(output) => {
                    let on = output
                        .legal_hold()
                        .and_then(|h| h.status())
                        .is_some_and(|s| *s == ObjectLockLegalHoldStatus::On);
                    Ok(if on { LegalHold::On } else { LegalHold::Off })
                }
                Err(e) if error_code(&e).is_some_and(|c| NO_LEGAL_HOLD_CODES.contains(&c)) => {
                    Ok(LegalHold::Off)
                }
                Err(e) => Err(map_sdk_error(StoreOperation::GetLegalHold, bucket, key, e)),
            }
        })
    }

    fn set_legal_hold(&self, bucket: &str, key: &str, hold: LegalHold) -> Result<(), StoreError> {
        let status = match hold {
            LegalHold::On => ObjectLockLegalHoldStatus::On,
            LegalHold::Off => ObjectLockLegalHoldStatus::Off,
        };
        self.runtime.block_on(async {
            self.client
                .put_object_legal_hold()
                .bucket(bucket)
                .key(key)
                .legal_hold(ObjectLockLegalHold::builder().status(status).build())
                .send()
                .await
                .map_err(|e| map_sdk_error(StoreOperation::PutLegalHold, bucket, key, e))?;
            Ok::<_, StoreError>(())
        })
    }
}
