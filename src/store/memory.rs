//! In-process configuration store.
//!
//! Serves the built-in snapshot until other documents are published. Used when
//! no config backend is configured, and by tests.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::sync::Arc;

use crate::snapshot::defaults::DEFAULT_VERSION;
use crate::snapshot::{ConfigSnapshot, SnapshotDocuments};
use crate::store::{ConfigStore, StoreResult, VersionToken};

#[derive(Debug)]
struct Published {
    version: VersionToken,
    documents: SnapshotDocuments,
}

#[derive(Debug)]
pub struct MemoryConfigStore {
    published: ArcSwap<Published>,
}

impl MemoryConfigStore {
    /// A store holding the built-in documents.
    pub fn new() -> Self {
        Self::with_documents(DEFAULT_VERSION, SnapshotDocuments::default())
    }

    pub fn with_documents(version: impl Into<VersionToken>, documents: SnapshotDocuments) -> Self {
        Self {
            published: ArcSwap::from_pointee(Published {
                version: version.into(),
                documents,
            }),
        }
    }

    /// Replace the published documents; the next probe sees `version`.
    pub fn publish(&self, version: impl Into<VersionToken>, documents: SnapshotDocuments) {
        self.published.store(Arc::new(Published {
            version: version.into(),
            documents,
        }));
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn fetch_version(&self, _environment: &str) -> Option<VersionToken> {
        Some(self.published.load().version.clone())
    }

    async fn fetch_snapshot(
        &self,
        _environment: &str,
        _version: Option<&VersionToken>,
    ) -> StoreResult<ConfigSnapshot> {
        let published = self.published.load_full();
        Ok(ConfigSnapshot::compile(
            published.version.as_str(),
            published.documents.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_changes_version() {
        let store = MemoryConfigStore::new();
        assert_eq!(store.fetch_version("production").await.unwrap().as_str(), DEFAULT_VERSION);

        let mut documents = SnapshotDocuments::default();
        documents.routes.clear();
        store.publish("v2", documents);

        let version = store.fetch_version("production").await.unwrap();
        let snapshot = store.fetch_snapshot("production", Some(&version)).await.unwrap();
        assert_eq!(snapshot.version(), "v2");
        assert!(snapshot.routes().is_empty());
    }
}
