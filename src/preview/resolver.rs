use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::config::PreviewConfig;
use crate::observability::metrics;
use crate::preview::registry::{PreviewRegistry, PreviewResult};
use crate::snapshot::schema::strip_scheme;
use crate::snapshot::OriginConfig;

/// Hex characters kept from the branch digest.
const BRANCH_ID_LEN: usize = 12;

/// Expired entries are still served for this long while the registry is failing.
const STALE_RETENTION: Duration = Duration::from_secs(3600);

/// Registry-safe identifier for a branch name.
pub fn branch_id(branch: &str) -> String {
    let digest = Sha256::digest(branch.as_bytes());
    let mut id = String::with_capacity(BRANCH_ID_LEN);
    for byte in digest.iter().take(BRANCH_ID_LEN / 2) {
        let _ = write!(id, "{:02x}", byte);
    }
    id
}

#[derive(Debug, Clone)]
pub struct PreviewCacheEntry {
    pub branch_id: String,
    pub app: String,
    pub resolved_url: String,
    pub fetched_at: Instant,
}

/// A resolved preview deployment for one branch and application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewTarget {
    pub branch: String,
    pub branch_id: String,
    pub app: String,
    pub resolved_url: String,
    /// `resolved_url` without its scheme.
    pub domain: String,
}

impl PreviewTarget {
    /// HTTPS on 443 unless the registered URL names its own scheme and port.
    pub fn origin(&self) -> OriginConfig {
        let explicit_port = self.domain.contains(':');
        match OriginConfig::from_url(&self.resolved_url) {
            Some(origin) if explicit_port || origin.protocol == "https" => origin,
            _ => OriginConfig::https(self.domain.clone()),
        }
    }
}

/// Detects `{branch}.www.{beta-domain}` hosts and resolves them through a registry.
#[derive(Debug)]
pub struct PreviewResolver {
    registry: Arc<dyn PreviewRegistry>,
    beta_domain: String,
    project_prefix: String,
    ttl: Duration,
    cache: DashMap<(String, String), PreviewCacheEntry>,
}

impl PreviewResolver {
    pub fn new(
        registry: Arc<dyn PreviewRegistry>,
        beta_domain: impl Into<String>,
        project_prefix: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            beta_domain: beta_domain.into().trim_start_matches('.').to_ascii_lowercase(),
            project_prefix: project_prefix.into().trim_matches('/').to_string(),
            ttl: Duration::from_secs(300),
            cache: DashMap::new(),
        }
    }

    pub fn from_config(registry: Arc<dyn PreviewRegistry>, config: &PreviewConfig) -> Self {
        Self::new(registry, config.beta_domain.clone(), config.project_prefix.clone())
            .with_ttl(Duration::from_secs(config.ttl_secs))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Branch name when `host` is a preview host, e.g. `feature-x.www.example-beta.com`.
    pub fn extract_branch(&self, host: &str) -> Option<String> {
        if self.beta_domain.is_empty() {
            return None;
        }

        let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
        let under_beta = host
            .strip_suffix(self.beta_domain.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.ends_with('.'));
        if !under_beta {
            return None;
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() >= 4 && !labels[0].is_empty() && labels[0] != "www" && labels[1] == "www" {
            return Some(labels[0].to_string());
        }
        None
    }

    /// Registry key for a branch and application.
    pub fn registry_key(&self, branch_id: &str, app: &str) -> String {
        format!("/{}/preview/{}/{}", self.project_prefix, branch_id, app)
    }

    /// Resolve `host` for `app`. `Ok(None)` for non-preview hosts and unregistered previews.
    pub async fn resolve(&self, host: &str, app: &str) -> PreviewResult<Option<PreviewTarget>> {
        match self.extract_branch(host) {
            Some(branch) => self.lookup(&branch, app).await,
            None => Ok(None),
        }
    }

    /// Look up the preview deployment of `app` for `branch`.
    pub async fn lookup(&self, branch: &str, app: &str) -> PreviewResult<Option<PreviewTarget>> {
        let id = branch_id(branch);
        let cache_key = (id.clone(), app.to_string());

        if let Some(entry) = self.cache.get(&cache_key) {
            if entry.fetched_at.elapsed() < self.ttl {
                metrics::record_preview_lookup("cached");
                return Ok(Some(target(branch, &entry)));
            }
        }

        let key = self.registry_key(&id, app);
        match self.registry.lookup(&key).await {
            Ok(Some(url)) => {
                metrics::record_preview_lookup("hit");
                let entry = PreviewCacheEntry {
                    branch_id: id,
                    app: app.to_string(),
                    resolved_url: url,
                    fetched_at: Instant::now(),
                };
                let resolved = target(branch, &entry);
                self.cache.insert(cache_key, entry);
                Ok(Some(resolved))
            }
            Ok(None) => {
                metrics::record_preview_lookup("miss");
                self.cache.remove(&cache_key);
                tracing::debug!(branch, app, key = %key, "No preview registered");
                Ok(None)
            }
            Err(e) => {
                metrics::record_preview_lookup("error");
                let stale = self
                    .cache
                    .get(&cache_key)
                    .filter(|entry| entry.fetched_at.elapsed() < self.ttl + STALE_RETENTION)
                    .map(|entry| target(branch, &entry));

                match stale {
                    Some(resolved) => {
                        tracing::warn!(error = %e, branch, app, "Preview registry failed, serving expired entry");
                        Ok(Some(resolved))
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// Drop every cached entry. Returns how many were removed.
    pub fn purge(&self) -> usize {
        let removed = self.cache.len();
        self.cache.clear();
        removed
    }

    /// Drop entries past the stale retention window.
    pub fn evict_expired(&self) -> usize {
        let before = self.cache.len();
        let horizon = self.ttl + STALE_RETENTION;
        self.cache.retain(|_, entry| entry.fetched_at.elapsed() < horizon);
        before.saturating_sub(self.cache.len())
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Periodically evict expired entries until shutdown.
    pub async fn run_eviction(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.ttl.max(Duration::from_secs(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let evicted = self.evict_expired();
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = self.len(), "Evicted preview cache entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Preview cache eviction stopped");
                    return;
                }
            }
        }
    }
}

fn target(branch: &str, entry: &PreviewCacheEntry) -> PreviewTarget {
    PreviewTarget {
        branch: branch.to_string(),
        branch_id: entry.branch_id.clone(),
        app: entry.app.clone(),
        resolved_url: entry.resolved_url.clone(),
        domain: strip_scheme(&entry.resolved_url).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::registry::{PreviewError, StaticPreviewRegistry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct FlakyRegistry {
        inner: StaticPreviewRegistry,
        lookups: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl PreviewRegistry for FlakyRegistry {
        async fn lookup(&self, key: &str) -> PreviewResult<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(PreviewError::Timeout {
                    key: key.to_string(),
                    timeout_ms: 100,
                });
            }
            self.inner.lookup(key).await
        }
    }

    fn resolver(registry: Arc<dyn PreviewRegistry>) -> PreviewResolver {
        PreviewResolver::new(registry, "example-beta.com", "mk-www")
    }

    #[test]
    fn test_branch_id() {
        let id = branch_id("feature-login");
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, branch_id("feature-login"));
        assert_ne!(id, branch_id("feature-logout"));
        assert_eq!(branch_id("main"), "0d6e4079e367");
    }

    #[test]
    fn test_extract_branch() {
        let resolver = resolver(Arc::new(StaticPreviewRegistry::new()));

        assert_eq!(
            resolver.extract_branch("feature-login.www.example-beta.com").as_deref(),
            Some("feature-login")
        );
        assert_eq!(
            resolver.extract_branch("Feature-Login.www.example-beta.com:443").as_deref(),
            Some("feature-login")
        );
        assert_eq!(resolver.extract_branch("www.example-beta.com"), None);
        assert_eq!(resolver.extract_branch("www.www.example-beta.com"), None);
        assert_eq!(resolver.extract_branch("feature.api.example-beta.com"), None);
        assert_eq!(resolver.extract_branch("feature.www.example.com"), None);
        assert_eq!(resolver.extract_branch("feature.www.notexample-beta.com"), None);
        assert_eq!(resolver.extract_branch("feature.www.staging.notexample-beta.com"), None);
        assert_eq!(resolver.extract_branch(""), None);
    }

    #[test]
    fn test_no_beta_domain_disables_detection() {
        let resolver = PreviewResolver::new(Arc::new(StaticPreviewRegistry::new()), "", "mk-www");
        assert_eq!(resolver.extract_branch("feature.www.example-beta.com"), None);
    }

    #[tokio::test]
    async fn test_unregistered_preview_fails_closed() {
        let resolver = resolver(Arc::new(StaticPreviewRegistry::new()));
        let resolved = resolver.resolve("feature.www.example-beta.com", "core").await.unwrap();
        assert!(resolved.is_none());
        assert!(resolver.is_empty());
    }

    #[tokio::test]
    async fn test_resolves_and_caches() {
        let registry = Arc::new(FlakyRegistry::default());
        let resolver = resolver(registry.clone());
        let key = resolver.registry_key(&branch_id("feature"), "core");
        registry.inner.insert(key, "https://abc123.awsapprunner.com");

        let first = resolver.lookup("feature", "core").await.unwrap().unwrap();
        assert_eq!(first.domain, "abc123.awsapprunner.com");
        assert_eq!(first.origin().base_url(), "https://abc123.awsapprunner.com:443");

        let second = resolver.lookup("feature", "core").await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.len(), 1);

        // Same branch, different app is a separate entry.
        assert!(resolver.lookup("feature", "lp").await.unwrap().is_none());
        assert_eq!(registry.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_origin_honours_explicit_port() {
        let registry = Arc::new(StaticPreviewRegistry::new());
        let resolver = resolver(registry.clone());
        registry.insert(resolver.registry_key(&branch_id("local"), "core"), "http://127.0.0.1:8081");
        registry.insert(resolver.registry_key(&branch_id("bare"), "core"), "bare.example.net/");

        let local = resolver.lookup("local", "core").await.unwrap().unwrap();
        assert_eq!(local.origin().base_url(), "http://127.0.0.1:8081");
        assert_eq!(local.origin().domain_name, "127.0.0.1");

        let bare = resolver.lookup("bare", "core").await.unwrap().unwrap();
        assert_eq!(bare.origin().base_url(), "https://bare.example.net:443");
    }

    #[tokio::test]
    async fn test_registry_error_without_entry() {
        let registry = Arc::new(FlakyRegistry::default());
        registry.failing.store(true, Ordering::SeqCst);
        let resolver = resolver(registry);

        assert!(resolver.lookup("feature", "core").await.is_err());
    }

    #[tokio::test]
    async fn test_registry_error_serves_expired_entry() {
        let registry = Arc::new(FlakyRegistry::default());
        let resolver = resolver(registry.clone()).with_ttl(Duration::ZERO);
        let key = resolver.registry_key(&branch_id("feature"), "core");
        registry.inner.insert(key, "https://preview.example.net");

        resolver.lookup("feature", "core").await.unwrap();
        registry.failing.store(true, Ordering::SeqCst);

        let stale = resolver.lookup("feature", "core").await.unwrap().unwrap();
        assert_eq!(stale.domain, "preview.example.net");
    }

    #[tokio::test]
    async fn test_purge() {
        let registry = Arc::new(StaticPreviewRegistry::new());
        let resolver = resolver(registry.clone());
        registry.insert(resolver.registry_key(&branch_id("a"), "core"), "https://a.example.net");
        registry.insert(resolver.registry_key(&branch_id("b"), "core"), "https://b.example.net");

        resolver.lookup("a", "core").await.unwrap();
        resolver.lookup("b", "core").await.unwrap();
        assert_eq!(resolver.purge(), 2);
        assert!(resolver.is_empty());
    }
}
