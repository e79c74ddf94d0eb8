//! Process configuration, assembled once at startup.
//!
//! Every environment lookup happens in [`IngestConfig::from_env`]. The
//! resulting value is immutable and handed to the HTTP layer, the credential
//! broker and the router explicitly.

use std::fmt;
use std::net::SocketAddr;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use zeroize::Zeroizing;

/// Application-level constants
pub const APP_NAME: &str = "lake-ingest";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_SENSITIVE_BUCKET: &str = "confidential";
pub const DEFAULT_ANONYMIZED_BUCKET: &str = "anonymized";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Keys that must be present (and non-empty) for the service to start.
pub const REQUIRED_KEYS: &[&str] = &[
    "SOURCE_ROLE_ARN",
    "DESTINATION_ROLE_ARN",
    "OIDC_PROVIDER_URL",
    "OIDC_CLIENT_ID",
    "OIDC_CLIENT_SECRET",
    "OIDC_USERNAME",
    "OIDC_PASSWORD",
    "S3_ENDPOINT_URL",
    "STS_ENDPOINT_URL",
];

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,lake_ingest_lib=debug"
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment parameters: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Password-grant inputs for the OIDC provider.
#[derive(Clone)]
pub struct OidcConfig {
    pub provider_url: String,
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    pub username: String,
    pub password: Zeroizing<String>,
}

impl OidcConfig {
    /// `<provider>/token`, tolerating a trailing slash on the provider URL.
    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.provider_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcConfig")
            .field("provider_url", &self.provider_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Destination buckets for the two routing outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketConfig {
    pub sensitive: String,
    pub anonymized: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            sensitive: DEFAULT_SENSITIVE_BUCKET.to_string(),
            anonymized: DEFAULT_ANONYMIZED_BUCKET.to_string(),
        }
    }
}

/// Immutable service configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub source_role_arn: String,
    pub destination_role_arn: String,
    pub oidc: OidcConfig,
    pub s3_endpoint_url: String,
    pub sts_endpoint_url: String,
    pub region: String,
    pub buckets: BucketConfig,
    pub listen_addr: SocketAddr,
}

impl IngestConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary lookup. All missing required keys are
    /// reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(vec![key]));

        let listen_raw = get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "LISTEN_ADDR",
                reason: format!("{listen_raw:?}: {e}"),
            })?;

        let buckets = BucketConfig {
            sensitive: get("SENSITIVE_BUCKET")
                .unwrap_or_else(|| DEFAULT_SENSITIVE_BUCKET.to_string()),
            anonymized: get("ANONYMIZED_BUCKET")
                .unwrap_or_else(|| DEFAULT_ANONYMIZED_BUCKET.to_string()),
        };
        if buckets.sensitive == buckets.anonymized {
            return Err(ConfigError::Invalid {
                key: "ANONYMIZED_BUCKET",
                reason: "must differ from SENSITIVE_BUCKET".into(),
            });
        }

        Ok(Self {
            source_role_arn: required("SOURCE_ROLE_ARN")?,
            destination_role_arn: required("DESTINATION_ROLE_ARN")?,
            oidc: OidcConfig {
                provider_url: required("OIDC_PROVIDER_URL")?,
                client_id: required("OIDC_CLIENT_ID")?,
                client_secret: Zeroizing::new(required("OIDC_CLIENT_SECRET")?),
                username: required("OIDC_USERNAME")?,
                password: Zeroizing::new(required("OIDC_PASSWORD")?),
            },
            s3_endpoint_url: required("S3_ENDPOINT_URL")?,
            sts_endpoint_url: required("STS_ENDPOINT_URL")?,
            region: get("AWS_DEFAULT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            buckets,
            listen_addr,
        })
    }
}

/// Shared AWS SDK settings for one endpoint: region, endpoint override, and
/// retries off. Credentials are added per client.
pub fn sdk_base(endpoint_url: &str, region: &str) -> SdkConfig {
    SdkConfig::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .endpoint_url(endpoint_url)
        .retry_config(RetryConfig::disabled())
        .build()
}
