//! OIDC password-grant client.
//!
//! Posts the resource-owner credentials to `<provider>/token` and returns the
//! bearer access token used as the web-identity assertion for STS.

use serde::Deserialize;
use zeroize::Zeroizing;

use super::CredentialError;
use crate::config::OidcConfig;

/// Response body of the token endpoint (only the field we use).
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

pub struct OidcTokenClient {
    config: OidcConfig,
    client: reqwest::blocking::Client,
}

impl OidcTokenClient {
    pub fn new(config: OidcConfig) -> Result<Self, CredentialError> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| CredentialError::TokenRequest(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Fetch a fresh access token. Never cached.
    pub fn fetch_token(&self) -> Result<Zeroizing<String>, CredentialError> {
        let endpoint = self.config.token_endpoint();
        let form = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&endpoint)
            .form(form.as_slice())
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    CredentialError::TokenRequest(format!("cannot reach {endpoint}"))
                } else {
                    CredentialError::TokenRequest(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CredentialError::TokenRejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = response
            .json()
            .map_err(|e| CredentialError::TokenRequest(format!("invalid token response: {e}")))?;

        parsed
            .access_token
            .filter(|t| !t.is_empty())
            .map(Zeroizing::new)
            .ok_or(CredentialError::MissingAccessToken)
    }
}
