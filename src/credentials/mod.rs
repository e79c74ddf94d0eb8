//! Credential exchange: OIDC access token → STS role credentials → S3 session.
//!
//! The pipeline asks a [`CredentialBroker`] for one session per role, fresh
//! for every event. Nothing is cached across events or shared between the
//! source and destination roles.

pub mod oidc;
pub mod sts;

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::config::IngestConfig;
use crate::storage::{MemoryObjectStore, ObjectStore, S3ObjectStore, StorageSessions};

pub use oidc::OidcTokenClient;
pub use sts::StsExchange;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CredentialError {
    #[error("Token request failed: {0}")]
    TokenRequest(String),

    #[error("Token endpoint returned {status}: {body}")]
    TokenRejected { status: u16, body: String },

    #[error("Token response has no access_token")]
    MissingAccessToken,

    #[error("AssumeRoleWithWebIdentity failed for {role_arn}: {message}")]
    AssumeRole { role_arn: String, message: String },

    #[error("STS returned no credentials for {0}")]
    NoCredentials(String),
}

/// Which side of the move a session is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageRole {
    Source,
    Destination,
}

impl StorageRole {
    pub fn session_name(&self) -> &'static str {
        match self {
            Self::Source => "source_session",
            Self::Destination => "destination_session",
        }
    }
}

/// Produces role-scoped storage sessions. Blocking.
pub trait CredentialBroker: Send + Sync {
    fn open_session(&self, role: StorageRole) -> Result<Box<dyn ObjectStore>, CredentialError>;
}

/// Open both sessions for one run. Either failure aborts before any storage I/O.
pub fn open_sessions(broker: &dyn CredentialBroker) -> Result<StorageSessions, CredentialError> {
    let source = broker.open_session(StorageRole::Source)?;
    let destination = broker.open_session(StorageRole::Destination)?;
    Ok(StorageSessions {
        source,
        destination,
    })
}

// ═══════════════════════════════════════════════════════════
// Federated broker (production)
// ═══════════════════════════════════════════════════════════

/// OIDC password grant + STS web-identity exchange, yielding S3 sessions.
pub struct FederatedBroker {
    config: Arc<IngestConfig>,
    runtime: Handle,
}

impl FederatedBroker {
    pub fn new(config: Arc<IngestConfig>, runtime: Handle) -> Self {
        Self { config, runtime }
    }

    fn role_arn(&self, role: StorageRole) -> &str {
        match role {
            StorageRole::Source => &self.config.source_role_arn,
            StorageRole::Destination => &self.config.destination_role_arn,
        }
    }
}

impl CredentialBroker for FederatedBroker {
    fn open_session(&self, role: StorageRole) -> Result<Box<dyn ObjectStore>, CredentialError> {
        let role_arn = self.role_arn(role);

        let token = OidcTokenClient::new(self.config.oidc.clone())?.fetch_token()?;
        let sts = StsExchange::new(
            &self.config.sts_endpoint_url,
            &self.config.region,
            self.runtime.clone(),
        );
        let credentials = sts.assume_role(role_arn, role.session_name(), &token)?;

        tracing::debug!(?role, role_arn, "Storage session opened");

        Ok(Box::new(S3ObjectStore::new(
            &self.config.s3_endpoint_url,
            &self.config.region,
            credentials,
            self.runtime.clone(),
        )))
    }
}

// ═══════════════════════════════════════════════════════════
// Mock broker
// ═══════════════════════════════════════════════════════════

/// Broker handing out sessions over a shared [`MemoryObjectStore`].
/// Can be told to refuse one role.
pub struct MockCredentialBroker {
    store: MemoryObjectStore,
    refuse: Option<StorageRole>,
}

impl MockCredentialBroker {
    pub fn new(store: MemoryObjectStore) -> Self {
        Self {
            store,
            refuse: None,
        }
    }

    pub fn refusing(mut self, role: StorageRole) -> Self {
        self.refuse = Some(role);
        self
    }
}

impl CredentialBroker for MockCredentialBroker {
    fn open_session(&self, role: StorageRole) -> Result<Box<dyn ObjectStore>, CredentialError> {
        if self.refuse == Some(role) {
            return Err(CredentialError::TokenRejected {
                status: 401,
                body: r#"{"error":"invalid_grant"}"#.into(),
            });
        }
        Ok(Box::new(self.store.clone()))
    }
}
