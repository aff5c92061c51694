//! Versioned routing configuration.
//!
//! # Data Flow
//! ```text
//! store (raw JSON documents)
//!     → schema.rs (deserialize)
//!     → SnapshotDocuments
//!     → ConfigSnapshot::compile (route table, redirect table,
//!       cache-control rules, CSP header)
//!     → Arc<ConfigSnapshot> swapped into the ConfigCache
//! ```
//!
//! # Design Decisions
//! - A snapshot is immutable once compiled; a new version replaces it wholesale
//! - Matchers are compiled at load, never re-parsed per request
//! - `fallback()` is always available, so routing never lacks a table

pub mod defaults;
pub mod schema;

use axum::http::HeaderValue;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::policy::cache_control::CacheControlRules;
use crate::policy::csp::build_csp;
use crate::routing::matcher::RouteTable;
use crate::routing::redirect::RedirectTable;

pub use schema::{
    CacheRule, CacheRules, CorsPolicy, CspDomain, OriginConfig, RedirectRule, RedirectType,
    RouteRule,
};

/// The deserialized documents that make up one configuration version.
#[derive(Debug, Clone)]
pub struct SnapshotDocuments {
    pub routes: Vec<RouteRule>,
    pub redirects: Vec<RedirectRule>,
    pub origins: HashMap<String, OriginConfig>,
    pub csp_domains: Vec<CspDomain>,
    pub cors: CorsPolicy,
    pub cache_rules: CacheRules,
}

impl Default for SnapshotDocuments {
    fn default() -> Self {
        Self {
            routes: defaults::default_routes(),
            redirects: Vec::new(),
            origins: HashMap::new(),
            csp_domains: defaults::default_csp_domains(),
            cors: CorsPolicy::default(),
            cache_rules: CacheRules::default(),
        }
    }
}

/// An immutable, compiled configuration version.
#[derive(Debug)]
pub struct ConfigSnapshot {
    version: String,
    documents: SnapshotDocuments,
    routes: RouteTable,
    redirects: RedirectTable,
    cache_control: CacheControlRules,
    csp: HeaderValue,
    fetched_at: Instant,
    /// Built-in stand-in, not fetched from any store.
    fallback: bool,
}

impl ConfigSnapshot {
    /// Compile documents into a snapshot labelled `version`.
    pub fn compile(version: impl Into<String>, documents: SnapshotDocuments) -> Self {
        let version = version.into();
        let routes = RouteTable::compile(&documents.routes);
        let redirects = RedirectTable::compile(&documents.redirects);
        let cache_control = CacheControlRules::compile(&documents.cache_rules);

        let csp_value = build_csp(&documents.csp_domains);
        let csp = HeaderValue::from_str(&csp_value).unwrap_or_else(|_| {
            tracing::warn!(version = %version, "CSP contains invalid header characters, using baseline");
            HeaderValue::from_str(&build_csp(&[])).unwrap_or(HeaderValue::from_static("default-src 'self'"))
        });

        Self {
            version,
            documents,
            routes,
            redirects,
            cache_control,
            csp,
            fetched_at: Instant::now(),
            fallback: false,
        }
    }

    /// The built-in snapshot.
    pub fn fallback() -> Self {
        Self {
            fallback: true,
            ..Self::compile(defaults::DEFAULT_VERSION, SnapshotDocuments::default())
        }
    }

    /// True for the built-in snapshot installed while the store is unreachable.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn documents(&self) -> &SnapshotDocuments {
        &self.documents
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn redirects(&self) -> &RedirectTable {
        &self.redirects
    }

    pub fn cache_control(&self) -> &CacheControlRules {
        &self.cache_control
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.documents.cors
    }

    /// Pre-rendered `Content-Security-Policy-Report-Only` value.
    pub fn csp_header(&self) -> &HeaderValue {
        &self.csp
    }

    /// Upstream for an application key, if one is configured.
    pub fn origin(&self, app: &str) -> Option<&OriginConfig> {
        self.documents.origins.get(app)
    }

    /// Time since this snapshot was compiled.
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_snapshot() {
        let snapshot = ConfigSnapshot::fallback();
        assert_eq!(snapshot.version(), "default");
        assert_eq!(snapshot.routes().find("/"), "core");
        assert_eq!(snapshot.routes().find("/pricing/"), "core");
        assert_eq!(snapshot.routes().find("/whatever"), "kitchen-sink");
        assert!(snapshot.origin("core").is_none());
        assert!(snapshot.csp_header().to_str().unwrap().contains("https://cdn.amplitude.com"));
    }
}
