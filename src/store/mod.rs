//! Configuration document stores.
//!
//! # Data Flow
//! ```text
//! ConfigCache
//!     → fetch_version(env)          cheap probe, one small read
//!     → fetch_snapshot(env, ver)    only when the version changed
//!         → documents.rs: fetch all six documents concurrently
//!             routes, config         load-bearing, failure fails the fetch
//!             redirects, csp-domains,
//!             cors-config, cache-rules   degrade to built-in defaults
//!         → ConfigSnapshot::compile
//! ```
//!
//! # Backends
//! - `http.rs`: remote object store behind a CDN, plus a key-value version endpoint
//! - `file.rs`: local directory with the same layout, for development
//! - `memory.rs`: in-process documents, defaults to the built-in snapshot
//!
//! `validate.rs` checks a document directory offline, before it is published.

pub mod documents;
pub mod file;
pub mod http;
pub mod memory;
pub mod validate;
pub mod watcher;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::snapshot::ConfigSnapshot;

pub use file::FileConfigStore;
pub use http::HttpConfigStore;
pub use memory::MemoryConfigStore;

/// Opaque content version identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for VersionToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// Version label of snapshots fetched without a token.
pub const LEGACY_VERSION: &str = "legacy";

/// Errors that can occur while fetching configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network failure or non-success status.
    #[error("fetch of {path} failed: {reason}")]
    RemoteFetch { path: String, reason: String },

    /// The backend did not answer within the deadline.
    #[error("fetch of {path} timed out after {timeout_ms} ms")]
    Timeout { path: String, timeout_ms: u64 },

    /// The document is not valid JSON for its schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Local filesystem error.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A source of versioned configuration snapshots.
#[async_trait]
pub trait ConfigStore: Send + Sync + fmt::Debug {
    /// Current version token, or `None` when the backend has none or is unreachable.
    async fn fetch_version(&self, environment: &str) -> Option<VersionToken>;

    /// Fetch and compile every document for `version` (legacy layout when `None`).
    async fn fetch_snapshot(
        &self,
        environment: &str,
        version: Option<&VersionToken>,
    ) -> StoreResult<ConfigSnapshot>;
}
