//! Client configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::engine::EngineOptions;
use crate::error::{RemoteError, StoreResult};
use crate::remote::HttpItemSource;
use crate::store::SqliteItemStore;

pub const ENV_API_URL: &str = "STOCKSYNC_API_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "STOCKSYNC_REQUEST_TIMEOUT_SECS";
pub const ENV_DB_PATH: &str = "STOCKSYNC_DB_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root; endpoints are resolved relative to it.
    pub api_url: String,
    /// Bound for every HTTP request (and the engine's fetch timeout).
    pub request_timeout: Duration,
    /// `None` selects the per-device default location.
    pub database_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/".to_string(),
            request_timeout: Duration::from_secs(30),
            database_path: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `STOCKSYNC_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_REQUEST_TIMEOUT_SECS} must be whole seconds, got {raw:?}"))?;
            anyhow::ensure!(secs > 0, "{ENV_REQUEST_TIMEOUT_SECS} must be greater than zero");
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(path) = lookup(ENV_DB_PATH).filter(|v| !v.trim().is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Open the configured SQLite store.
    pub async fn open_store(&self) -> StoreResult<SqliteItemStore> {
        match &self.database_path {
            Some(path) => SqliteItemStore::open(path).await,
            None => SqliteItemStore::open_default().await,
        }
    }

    /// HTTP source pointed at `api_url`.
    pub fn http_source(&self) -> Result<HttpItemSource, RemoteError> {
        HttpItemSource::new(self.api_url.clone(), self.request_timeout)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            fetch_timeout: self.request_timeout,
        }
    }
}
