//! Preview origin registries.
//!
//! A registry maps a parameter key (`/{project}/preview/{branchId}/{app}`) to
//! the URL of a deployed preview service.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::config::PreviewConfig;

/// Errors talking to the preview registry.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("registry lookup for {key} failed: {reason}")]
    Registry { key: String, reason: String },

    #[error("registry lookup for {key} timed out after {timeout_ms} ms")]
    Timeout { key: String, timeout_ms: u64 },
}

pub type PreviewResult<T> = Result<T, PreviewError>;

#[async_trait]
pub trait PreviewRegistry: Send + Sync + fmt::Debug {
    /// The URL registered under `key`, or `None` when nothing is registered.
    async fn lookup(&self, key: &str) -> PreviewResult<Option<String>>;
}

/// Parameter store exposed over HTTP: `GET {base}{key}` returns the URL as text.
#[derive(Debug, Clone)]
pub struct HttpPreviewRegistry {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPreviewRegistry {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(
            config.registry_url.clone().unwrap_or_default(),
            Duration::from_millis(config.timeout_ms),
        )
    }
}

#[async_trait]
impl PreviewRegistry for HttpPreviewRegistry {
    async fn lookup(&self, key: &str) -> PreviewResult<Option<String>> {
        let url = format!("{}{}", self.base_url, key);
        let request = async {
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match timeout(self.timeout, request).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                return Err(PreviewError::Registry {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(PreviewError::Timeout {
                    key: key.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        };

        match status {
            StatusCode::OK => {
                let value = body.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            StatusCode::NOT_FOUND => Ok(None),
            other => Err(PreviewError::Registry {
                key: key.to_string(),
                reason: format!("HTTP {}", other),
            }),
        }
    }
}

/// In-memory registry for local development and tests.
#[derive(Debug, Default)]
pub struct StaticPreviewRegistry {
    entries: DashMap<String, String>,
}

impl StaticPreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, url: impl Into<String>) {
        self.entries.insert(key.into(), url.into());
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[async_trait]
impl PreviewRegistry for StaticPreviewRegistry {
    async fn lookup(&self, key: &str) -> PreviewResult<Option<String>> {
        Ok(self.entries.get(key).map(|url| url.value().clone()))
    }
}
