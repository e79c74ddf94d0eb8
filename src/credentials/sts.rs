//! STS `AssumeRoleWithWebIdentity` exchange via `aws-sdk-sts`.

use aws_sdk_sts::error::DisplayErrorContext;
use tokio::runtime::Handle;

use super::CredentialError;
use crate::config::sdk_base;

/// Role-scoped temporary credentials, ready for an S3 client.
pub type RoleCredentials = aws_sdk_s3::config::Credentials;

const PROVIDER_NAME: &str = "AssumeRoleWithWebIdentity";

pub struct StsExchange {
    client: aws_sdk_sts::Client,
    runtime: Handle,
}

impl StsExchange {
    pub fn new(endpoint_url: &str, region: &str, runtime: Handle) -> Self {
        // The web-identity call is unsigned; no credentials provider is needed.
        Self {
            client: aws_sdk_sts::Client::new(&sdk_base(endpoint_url, region)),
            runtime,
        }
    }

    /// Trade `web_identity_token` for credentials scoped to `role_arn`.
    pub fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
        web_identity_token: &str,
    ) -> Result<RoleCredentials, CredentialError> {
        self.runtime.block_on(async {
            let output = self
                .client
                .assume_role_with_web_identity()
                .role_arn(role_arn)
                .role_session_name(session_name)
                .web_identity_token(web_identity_token)
                .send()
                .await
                .map_err(|e| CredentialError::AssumeRole {
                    role_arn: role_arn.to_string(),
                    message: DisplayErrorContext(&e).to_string(),
                })?;

            let creds = output
                .credentials()
                .ok_or_else(|| CredentialError::NoCredentials(role_arn.to_string()))?;

            Ok::<_, CredentialError>(RoleCredentials::new(
                creds.access_key_id(),
                creds.secret_access_key(),
                Some(creds.session_token().to_string()),
                None,
                PROVIDER_NAME,
            ))
        })
    }
}
