use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::StoreConfig;
use crate::observability::metrics;
use crate::snapshot::ConfigSnapshot;
use crate::store::{ConfigStore, StoreResult, VersionToken};

/// Default maximum snapshot age before a re-fetch is forced.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

/// Default pause after a failed refresh.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Holds the live [`ConfigSnapshot`] and refreshes it from a [`ConfigStore`].
#[derive(Debug)]
pub struct ConfigCache {
    store: Arc<dyn ConfigStore>,
    current: ArcSwapOption<ConfigSnapshot>,
    refresh_gate: Mutex<()>,
    max_age: Duration,
    retry_interval: Duration,
    /// Set after a failed refresh; the cached snapshot is served until then.
    backoff_until: ArcSwapOption<Instant>,
}

impl ConfigCache {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            current: ArcSwapOption::empty(),
            refresh_gate: Mutex::new(()),
            max_age: DEFAULT_MAX_AGE,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            backoff_until: ArcSwapOption::empty(),
        }
    }

    pub fn from_config(store: Arc<dyn ConfigStore>, config: &StoreConfig) -> Self {
        Self::new(store)
            .with_max_age(Duration::from_secs(config.max_age_secs))
            .with_retry_interval(Duration::from_secs(config.retry_interval_secs))
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// The snapshot currently held, without any I/O.
    pub fn current(&self) -> Option<Arc<ConfigSnapshot>> {
        self.current.load_full()
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    /// Return a snapshot that is current for `environment`.
    ///
    /// Never fails: fetch errors keep the previous snapshot, or install the
    /// built-in one when nothing was cached yet.
    pub async fn ensure_fresh(&self, environment: &str) -> Arc<ConfigSnapshot> {
        let probed = self.store.fetch_version(environment).await;
        if let Some(snapshot) = self.reusable(probed.as_ref()) {
            return snapshot;
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(snapshot) = self.reusable(probed.as_ref()) {
            return snapshot;
        }

        self.refresh(environment, probed.as_ref()).await
    }

    /// Re-fetch regardless of version or age. Errors are returned, and the
    /// cached snapshot is left untouched.
    pub async fn force_refresh(&self, environment: &str) -> StoreResult<Arc<ConfigSnapshot>> {
        let _gate = self.refresh_gate.lock().await;
        let started = Instant::now();

        let probed = self.store.fetch_version(environment).await;
        match self.store.fetch_snapshot(environment, probed.as_ref()).await {
            Ok(snapshot) => Ok(self.install(snapshot, started)),
            Err(e) => {
                metrics::record_config_refresh("failure", started);
                Err(e)
            }
        }
    }

    /// Drop the cached snapshot. The next request fetches again.
    pub fn teardown(&self) {
        self.current.store(None);
        self.backoff_until.store(None);
        tracing::info!("Config cache cleared");
    }

    fn reusable(&self, probed: Option<&VersionToken>) -> Option<Arc<ConfigSnapshot>> {
        let snapshot = self.current.load_full()?;

        if self.in_backoff() {
            return Some(snapshot);
        }
        // The built-in stand-in is only kept while backing off.
        if snapshot.is_fallback() {
            return None;
        }
        if snapshot.age() >= self.max_age {
            return None;
        }
        match probed {
            Some(version) if version.as_str() != snapshot.version() => None,
            _ => Some(snapshot),
        }
    }

    fn in_backoff(&self) -> bool {
        self.backoff_until
            .load()
            .as_deref()
            .is_some_and(|until| Instant::now() < *until)
    }

    async fn refresh(&self, environment: &str, version: Option<&VersionToken>) -> Arc<ConfigSnapshot> {
        let started = Instant::now();

        match self.store.fetch_snapshot(environment, version).await {
            Ok(snapshot) => self.install(snapshot, started),
            Err(e) => {
                metrics::record_config_refresh("failure", started);
                self.backoff_until
                    .store(Some(Arc::new(Instant::now() + self.retry_interval)));

                match self.current.load_full() {
                    Some(previous) => {
                        tracing::warn!(
                            error = %e,
                            environment,
                            serving = previous.version(),
                            "Config refresh failed, serving cached snapshot"
                        );
                        previous
                    }
                    None => {
                        tracing::warn!(
                            error = %e,
                            environment,
                            "Config refresh failed with nothing cached, using built-in routes"
                        );
                        let fallback = Arc::new(ConfigSnapshot::fallback());
                        self.current.store(Some(fallback.clone()));
                        metrics::record_config_version(fallback.version());
                        fallback
                    }
                }
            }
        }
    }

    fn install(&self, snapshot: ConfigSnapshot, started: Instant) -> Arc<ConfigSnapshot> {
        let snapshot = Arc::new(snapshot);
        let previous = self.current.swap(Some(snapshot.clone()));
        self.backoff_until.store(None);

        metrics::record_config_refresh("success", started);
        metrics::record_config_version(snapshot.version());

        match previous {
            Some(previous) if previous.version() == snapshot.version() => {
                tracing::debug!(version = snapshot.version(), "Config snapshot re-validated");
            }
            previous => {
                tracing::info!(
                    version = snapshot.version(),
                    previous = previous.as_deref().map(ConfigSnapshot::version),
                    routes = snapshot.routes().len(),
                    redirects = snapshot.redirects().len(),
                    "Config snapshot installed"
                );
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{RouteRule, SnapshotDocuments};
    use crate::store::{MemoryConfigStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Wraps a memory store, counting fetches and optionally failing them.
    #[derive(Debug, Default)]
    struct CountingStore {
        inner: MemoryConfigStore,
        fetches: AtomicUsize,
        failing: AtomicBool,
        fetch_delay: Option<Duration>,
        /// Behave like a store without a version endpoint.
        unversioned: bool,
    }

    impl CountingStore {
        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConfigStore for CountingStore {
        async fn fetch_version(&self, environment: &str) -> Option<VersionToken> {
            if self.unversioned {
                return None;
            }
            self.inner.fetch_version(environment).await
        }

        async fn fetch_snapshot(
            &self,
            environment: &str,
            version: Option<&VersionToken>,
        ) -> StoreResult<ConfigSnapshot> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::RemoteFetch {
                    path: format!("{}/routes.json", environment),
                    reason: "HTTP 503".to_string(),
                });
            }
            self.inner.fetch_snapshot(environment, version).await
        }
    }

    fn docs_routes() -> SnapshotDocuments {
        let mut documents = SnapshotDocuments::default();
        documents.routes = vec![RouteRule::new("/", "core", true), RouteRule::new("/docs*", "docs", false)];
        documents
    }

    #[tokio::test]
    async fn test_matching_version_skips_fetch() {
        let store = Arc::new(CountingStore::default());
        let cache = ConfigCache::new(store.clone());

        let first = cache.ensure_fresh("production").await;
        let second = cache.ensure_fresh("production").await;

        assert_eq!(store.fetches(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_version_change_refetches() {
        let store = Arc::new(CountingStore::default());
        let cache = ConfigCache::new(store.clone());
        assert_eq!(cache.ensure_fresh("production").await.version(), "default");

        store.inner.publish("v2", docs_routes());
        let snapshot = cache.ensure_fresh("production").await;

        assert_eq!(snapshot.version(), "v2");
        assert_eq!(snapshot.routes().find("/docs/guide"), "docs");
        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_snapshot() {
        let store = Arc::new(CountingStore::default());
        store.inner.publish("v1", docs_routes());
        let cache = ConfigCache::new(store.clone());
        let before = cache.ensure_fresh("production").await;

        store.failing.store(true, Ordering::SeqCst);
        store.inner.publish("v2", SnapshotDocuments::default());
        let after = cache.ensure_fresh("production").await;

        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.version(), "v1");
    }

    #[tokio::test]
    async fn test_failure_without_snapshot_uses_fallback() {
        let store = Arc::new(CountingStore::default());
        store.failing.store(true, Ordering::SeqCst);
        let cache = ConfigCache::new(store.clone());

        let snapshot = cache.ensure_fresh("production").await;
        assert_eq!(snapshot.version(), "default");
        assert_eq!(snapshot.routes().find("/unknown"), "kitchen-sink");
        assert!(cache.current().is_some());
    }

    #[tokio::test]
    async fn test_backoff_after_failure() {
        let store = Arc::new(CountingStore::default());
        store.failing.store(true, Ordering::SeqCst);
        let cache = ConfigCache::new(store.clone()).with_retry_interval(Duration::from_secs(60));

        cache.ensure_fresh("production").await;
        store.inner.publish("v2", docs_routes());
        cache.ensure_fresh("production").await;
        assert_eq!(store.fetches(), 1);
    }

    #[tokio::test]
    async fn test_max_age_forces_refetch() {
        let store = Arc::new(CountingStore::default());
        let cache = ConfigCache::new(store.clone()).with_max_age(Duration::ZERO);

        cache.ensure_fresh("production").await;
        cache.ensure_fresh("production").await;
        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_single_flight() {
        let store = Arc::new(CountingStore {
            fetch_delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let cache = Arc::new(ConfigCache::new(store.clone()));
        cache.ensure_fresh("production").await;
        assert_eq!(store.fetches(), 1);

        store.inner.publish("v2", docs_routes());
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.ensure_fresh("production").await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().version(), "v2");
        }
        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_reports_errors() {
        let store = Arc::new(CountingStore::default());
        let cache = ConfigCache::new(store.clone());
        let before = cache.ensure_fresh("production").await;

        store.failing.store(true, Ordering::SeqCst);
        assert!(cache.force_refresh("production").await.is_err());
        assert!(Arc::ptr_eq(&cache.current().unwrap(), &before));

        store.failing.store(false, Ordering::SeqCst);
        let refreshed = cache.force_refresh("production").await.unwrap();
        assert!(!Arc::ptr_eq(&refreshed, &before));
    }

    #[tokio::test]
    async fn test_teardown_clears_snapshot() {
        let store = Arc::new(CountingStore::default());
        let cache = ConfigCache::new(store.clone());
        cache.ensure_fresh("production").await;

        cache.teardown();
        assert!(cache.current().is_none());

        let refetched = cache.ensure_fresh("production").await;
        assert_eq!(store.fetches(), 2);
        assert!(!refetched.is_fallback());

        // Defaults only when the store cannot answer.
        cache.teardown();
        store.failing.store(true, Ordering::SeqCst);
        assert!(cache.ensure_fresh("production").await.is_fallback());
    }

    #[tokio::test]
    async fn test_fallback_replaced_once_unversioned_store_recovers() {
        let store = Arc::new(CountingStore {
            unversioned: true,
            ..Default::default()
        });
        store.failing.store(true, Ordering::SeqCst);
        let cache = ConfigCache::new(store.clone()).with_retry_interval(Duration::from_millis(20));

        let snapshot = cache.ensure_fresh("production").await;
        assert!(snapshot.is_fallback());

        store.failing.store(false, Ordering::SeqCst);
        store.inner.publish("v2", docs_routes());

        // Still backing off.
        assert!(cache.ensure_fresh("production").await.is_fallback());
        assert_eq!(store.fetches(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let snapshot = cache.ensure_fresh("production").await;
        assert!(!snapshot.is_fallback());
        assert_eq!(snapshot.version(), "v2");
        assert_eq!(snapshot.routes().find("/docs/a"), "docs");
        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn test_fetched_snapshot_reused_by_unversioned_store() {
        let store = Arc::new(CountingStore {
            unversioned: true,
            ..Default::default()
        });
        let cache = ConfigCache::new(store.clone());

        let first = cache.ensure_fresh("production").await;
        let second = cache.ensure_fresh("production").await;
        assert!(!first.is_fallback());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetches(), 1);
    }
}
