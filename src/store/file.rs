//! Local directory configuration store.
//!
//! Reads the published layout from disk, which is what the deploy tooling
//! produces and what developers edit locally:
//!
//! ```text
//! {root}/{env}_version            optional, pins the active version
//! {root}/{env}/{version}/*.json   versioned documents
//! {root}/{env}/www/*.json         unversioned documents
//! ```
//!
//! Without a pinned version file, the version token is a content hash of the
//! unversioned documents. When a [`ConfigWatcher`](crate::store::watcher::ConfigWatcher)
//! is attached the hash is only recomputed after a filesystem change.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::snapshot::ConfigSnapshot;
use crate::store::documents::{assemble_snapshot, document_path, Document, DocumentSource};
use crate::store::{ConfigStore, StoreError, StoreResult, VersionToken};

/// Hex characters kept from the content hash.
const VERSION_HASH_LEN: usize = 12;

#[derive(Debug)]
pub struct FileConfigStore {
    root: PathBuf,
    /// Set by the watcher when anything under `root` changes.
    dirty: Arc<AtomicBool>,
    watched: AtomicBool,
    cached_version: ArcSwapOption<VersionToken>,
}

impl FileConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dirty: Arc::new(AtomicBool::new(true)),
            watched: AtomicBool::new(false),
            cached_version: ArcSwapOption::empty(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Flag shared with a watcher; the version is re-hashed only after it is set.
    pub fn change_flag(&self) -> Arc<AtomicBool> {
        self.watched.store(true, Ordering::Release);
        self.dirty.clone()
    }

    async fn read(&self, relative: &str) -> StoreResult<Vec<u8>> {
        let path = self.root.join(relative);
        tokio::fs::read(&path).await.map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    async fn compute_version(&self, environment: &str) -> Option<VersionToken> {
        if let Ok(pinned) = self.read(&format!("{}_version", environment)).await {
            let token = String::from_utf8_lossy(&pinned).trim().to_string();
            if !token.is_empty() {
                return Some(VersionToken::new(token));
            }
        }

        let mut documents = Vec::new();
        for document in Document::ALL {
            if let Ok(body) = self.read(&document_path(environment, None, document)).await {
                documents.push((document.name(), body));
            }
        }
        if documents.is_empty() {
            return None;
        }
        Some(content_version(&documents))
    }
}

/// Short SHA-256 over document names and contents, in document order.
pub fn content_version(documents: &[(&str, Vec<u8>)]) -> VersionToken {
    let mut hasher = Sha256::new();
    for (name, body) in documents {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(body);
    }

    let mut token = String::with_capacity(VERSION_HASH_LEN);
    for byte in hasher.finalize().iter().take(VERSION_HASH_LEN / 2) {
        // Writing to a String cannot fail.
        let _ = write!(token, "{:02x}", byte);
    }
    VersionToken::new(token)
}

#[async_trait]
impl DocumentSource for FileConfigStore {
    async fn read_document(
        &self,
        environment: &str,
        version: Option<&VersionToken>,
        document: Document,
    ) -> StoreResult<Vec<u8>> {
        // Content-hash tokens have no directory of their own.
        let versioned = match version {
            Some(v) => tokio::fs::metadata(self.root.join(environment).join(v.as_str()))
                .await
                .is_ok_and(|meta| meta.is_dir())
                .then_some(v),
            None => None,
        };
        self.read(&document_path(environment, versioned, document)).await
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn fetch_version(&self, environment: &str) -> Option<VersionToken> {
        let unwatched = !self.watched.load(Ordering::Acquire);
        if unwatched || self.dirty.swap(false, Ordering::AcqRel) {
            let version = self.compute_version(environment).await;
            self.cached_version.store(version.map(Arc::new));
        }
        self.cached_version.load_full().map(|v| (*v).clone())
    }

    async fn fetch_snapshot(
        &self,
        environment: &str,
        version: Option<&VersionToken>,
    ) -> StoreResult<ConfigSnapshot> {
        assemble_snapshot(self, environment, version).await
    }
}
