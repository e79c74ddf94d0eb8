//! Inbound event envelope: CloudEvents over HTTP carrying an S3 notification.
//!
//! Structured mode (`application/cloudevents+json`, or a JSON body with a
//! `specversion` attribute) keeps the notification under `data` or, base64
//! encoded, under `data_base64`. Binary mode puts the CloudEvents attributes
//! in `ce-*` headers and the notification in the body.

use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use crate::pipeline::IngestEvent;

const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";
const BINARY_MODE_HEADER: &str = "ce-specversion";

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("CloudEvent data_base64 is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("CloudEvent has no data")]
    MissingData,

    #[error("Missing key in CloudEvent payload: {0}")]
    MissingField(String),

    #[error("Notification contains no records")]
    NoRecords,
}

// S3 bucket-notification shape, limited to the fields the pipeline reads.

#[derive(Deserialize)]
struct S3Notification {
    #[serde(rename = "Records")]
    records: Vec<S3Record>,
}

#[derive(Deserialize)]
struct S3Record {
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Deserialize)]
struct S3Object {
    key: String,
}

fn is_structured(headers: &HeaderMap, body: &Value) -> bool {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if content_type.starts_with(STRUCTURED_CONTENT_TYPE) {
        return true;
    }
    !headers.contains_key(BINARY_MODE_HEADER) && body.get("specversion").is_some()
}

/// Extract the single `(bucket, key)` pair from an inbound request.
pub fn parse_event(headers: &HeaderMap, body: &[u8]) -> Result<IngestEvent, EnvelopeError> {
    let body: Value =
        serde_json::from_slice(body).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;

    let data = if is_structured(headers, &body) {
        match (body.get("data"), body.get("data_base64")) {
            // String-encoded JSON data is allowed by the JSON event format.
            (Some(Value::String(raw)), _) => serde_json::from_str(raw)
                .map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?,
            (Some(Value::Null) | None, Some(Value::String(encoded))) => {
                let decoded = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| EnvelopeError::InvalidBase64(e.to_string()))?;
                serde_json::from_slice(&decoded)
                    .map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?
            }
            (Some(Value::Null) | None, _) => return Err(EnvelopeError::MissingData),
            (Some(data), _) => data.clone(),
        }
    } else {
        body
    };

    let notification: S3Notification =
        serde_json::from_value(data).map_err(|e| EnvelopeError::MissingField(e.to_string()))?;
    let record = notification
        .records
        .into_iter()
        .next()
        .ok_or(EnvelopeError::NoRecords)?;

    if record.s3.bucket.name.is_empty() {
        return Err(EnvelopeError::MissingField("s3.bucket.name is empty".into()));
    }
    if record.s3.object.key.is_empty() {
        return Err(EnvelopeError::MissingField("s3.object.key is empty".into()));
    }

    Ok(IngestEvent::new(record.s3.bucket.name, record.s3.object.key))
}
