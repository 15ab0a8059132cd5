//! Bearer-token acquisition.
//!
//! The synchronization engine only ever sees [`TokenProvider`]; how a token
//! is obtained (static flag, dynamic client registration plus password
//! grant) stays behind the trait.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::CatalogConfig;

/// Token scope required for export operations.
pub const EXPORT_SCOPE: &str = "apim:api_view";
/// Token scope required for import operations.
pub const IMPORT_SCOPE: &str = "apim:api_create";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while acquiring a token. These are always fatal to
/// the run; no item-level work starts without a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The registration or token endpoint rejected the credentials.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The endpoint answered with an unexpected status.
    #[error("token endpoint returned status {status}: {body}")]
    Unexpected {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response carried no usable token.
    #[error("token response did not contain an access token")]
    MissingToken,

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Result type for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;

// =============================================================================
// TokenProvider
// =============================================================================

/// Supplies an opaque bearer token for a requested scope.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, scope: &str) -> Result<String>;
}

/// A provider that returns a caller-supplied token as-is.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, _scope: &str) -> Result<String> {
        Ok(self.token.clone())
    }
}

// =============================================================================
// Client Registration + Password Grant
// =============================================================================

/// Consumer key/secret issued by dynamic client registration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumerCredentials {
    #[serde(rename = "clientId")]
    pub client_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Register this tool as an OAuth client and obtain consumer credentials.
///
/// The registration endpoint authenticates the operator's own username and
/// password via HTTP basic auth.
pub async fn register_client(
    http: &Client,
    catalog: &CatalogConfig,
    username: &str,
    password: &str,
) -> Result<ConsumerCredentials> {
    let payload = serde_json::json!({
        "clientName": catalog.client_name,
        "owner": username,
        "grantType": "password",
        "saasApp": true,
    });
    let response = http
        .post(catalog.registration_url.as_str())
        .basic_auth(username, Some(password))
        .json(&payload)
        .send()
        .await?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(TokenError::InvalidCredentials(
            "registration endpoint rejected the username or password".to_string(),
        ));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TokenError::Unexpected { status, body });
    }
    Ok(response.json().await?)
}

/// Obtains tokens via the OAuth password grant, using registered consumer
/// credentials.
pub struct PasswordGrantProvider {
    http: Client,
    token_url: String,
    credentials: ConsumerCredentials,
    username: String,
    password: String,
}

impl PasswordGrantProvider {
    pub fn new(
        http: Client,
        token_url: impl Into<String>,
        credentials: ConsumerCredentials,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            credentials,
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for PasswordGrantProvider {
    async fn token(&self, scope: &str) -> Result<String> {
        let params = [
            ("grant_type", "password"),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("scope", scope),
        ];
        let response = self
            .http
            .post(self.token_url.as_str())
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TokenError::InvalidCredentials(
                "token endpoint rejected the consumer credentials".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Unexpected { status, body });
        }
        let token: TokenResponse = response.json().await?;
        token.access_token.ok_or(TokenError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_ignores_scope() {
        let provider = StaticTokenProvider::new("abc123");
        assert_eq!(provider.token(EXPORT_SCOPE).await.unwrap(), "abc123");
        assert_eq!(provider.token(IMPORT_SCOPE).await.unwrap(), "abc123");
    }

    #[test]
    fn test_consumer_credentials_deserialization() {
        let creds: ConsumerCredentials = serde_json::from_value(serde_json::json!({
            "clientId": "k1",
            "clientSecret": "s1",
            "callBackURL": null,
        }))
        .unwrap();
        assert_eq!(creds.client_id, "k1");
        assert_eq!(creds.client_secret, "s1");
    }
}
