//! Remote Item Source: the inventory service as seen by the client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::RemoteError;
use crate::types::{AuthToken, Credentials, ItemBatch, ItemResponse, LoginResponse, STATUS_OK};

/// Fetches the full item collection.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_all(&self, token: &AuthToken) -> Result<ItemBatch, RemoteError>;
}

/// Exchanges credentials for a bearer token.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, RemoteError>;
}

/// HTTP client for the inventory service.
#[derive(Debug, Clone)]
pub struct HttpItemSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpItemSource {
    /// `base_url` is the API root, e.g. `https://host/api/dev/`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::transport)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn map_status(status: StatusCode, body: String) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
        _ => RemoteError::TransportFailure(format!("API error ({}): {}", status.as_u16(), body)),
    }
}

#[async_trait]
impl ItemSource for HttpItemSource {
    async fn fetch_all(&self, token: &AuthToken) -> Result<ItemBatch, RemoteError> {
        let url = self.endpoint("list-items");
        tracing::debug!(%url, "fetching items");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(RemoteError::transport)?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(map_status(status, resp.text().await.unwrap_or_default()));
        }

        let body: ItemResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::transport(format!("malformed payload: {e}")))?;

        tracing::debug!(
            status_code = body.status_code,
            count = body.data.as_ref().map_or(0, Vec::len),
            "item list received"
        );
        Ok(body.into())
    }
}

#[async_trait]
impl Authenticator for HttpItemSource {
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, RemoteError> {
        let url = self.endpoint("login");
        tracing::debug!(%url, email = %credentials.email, "logging in");

        let resp = self
            .client
            .post(&url)
            .form(credentials)
            .send()
            .await
            .map_err(RemoteError::transport)?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(map_status(status, resp.text().await.unwrap_or_default()));
        }

        let body: LoginResponse = resp
            .json()
            .await
            .map_err(|e| RemoteError::transport(format!("malformed payload: {e}")))?;

        match body.data {
            Some(data) if body.status_code == STATUS_OK && !data.api_token.is_empty() => {
                Ok(AuthToken::new(data.api_token))
            }
            _ => {
                tracing::warn!(
                    status_code = body.status_code,
                    message = body.message.as_deref().unwrap_or_default(),
                    "login rejected"
                );
                Err(RemoteError::Unauthorized)
            }
        }
    }
}
