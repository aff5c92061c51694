//! Remote configuration store over HTTP.
//!
//! # Responsibilities
//! - Read the version token from the key-value endpoint (`{kv}/{env}_version`)
//! - Read config documents from the object store (`{base}/{env}/{ver}/{name}.json`)
//! - Bound every call with a deadline suited to the edge latency budget
//!
//! # Design Decisions
//! - The version probe never fails: errors and timeouts read as "no version"
//! - Document fetches return typed errors so the cache can fail open
//! - Uses a dedicated client; redirects from the config CDN are not followed

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::StoreConfig;
use crate::snapshot::ConfigSnapshot;
use crate::store::documents::{assemble_snapshot, document_path, Document, DocumentSource};
use crate::store::{ConfigStore, StoreError, StoreResult, VersionToken};

#[derive(Debug, Clone)]
pub struct HttpConfigStore {
    client: reqwest::Client,
    base_url: String,
    version_url: Option<String>,
    probe_timeout: Duration,
    fetch_timeout: Duration,
}

impl HttpConfigStore {
    pub fn new(
        base_url: impl Into<String>,
        version_url: Option<String>,
        probe_timeout: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            version_url: version_url.map(|u| u.trim_end_matches('/').to_string()),
            probe_timeout,
            fetch_timeout,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(
            config.base_url.clone().unwrap_or_default(),
            config.version_url.clone(),
            Duration::from_millis(config.probe_timeout_ms),
            Duration::from_millis(config.fetch_timeout_ms),
        )
    }

    async fn get(&self, url: &str, deadline: Duration) -> StoreResult<(StatusCode, Vec<u8>)> {
        let request = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body.to_vec()))
        };

        match timeout(deadline, request).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(StoreError::RemoteFetch {
                path: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(StoreError::Timeout {
                path: url.to_string(),
                timeout_ms: deadline.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl DocumentSource for HttpConfigStore {
    async fn read_document(
        &self,
        environment: &str,
        version: Option<&VersionToken>,
        document: Document,
    ) -> StoreResult<Vec<u8>> {
        let url = format!("{}/{}", self.base_url, document_path(environment, version, document));
        let (status, body) = self.get(&url, self.fetch_timeout).await?;

        if status != StatusCode::OK {
            return Err(StoreError::RemoteFetch {
                path: url,
                reason: format!("HTTP {}", status),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl ConfigStore for HttpConfigStore {
    async fn fetch_version(&self, environment: &str) -> Option<VersionToken> {
        let version_url = self.version_url.as_ref()?;
        let url = format!("{}/{}_version", version_url, environment);

        match self.get(&url, self.probe_timeout).await {
            Ok((StatusCode::OK, body)) => {
                let token = String::from_utf8_lossy(&body).trim().to_string();
                (!token.is_empty()).then(|| VersionToken::new(token))
            }
            Ok((StatusCode::NOT_FOUND, _)) => None,
            Ok((status, _)) => {
                tracing::warn!(url = %url, status = %status, "Unexpected version probe status");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Version probe failed");
                None
            }
        }
    }

    async fn fetch_snapshot(
        &self,
        environment: &str,
        version: Option<&VersionToken>,
    ) -> StoreResult<ConfigSnapshot> {
        tracing::debug!(environment, version = ?version.map(VersionToken::as_str), "Fetching config snapshot");
        assemble_snapshot(self, environment, version).await
    }
}
