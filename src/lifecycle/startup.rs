//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the config store selected by the settings file
//! - Wire the snapshot cache, preview resolver and origin client together
//! - Warm the cache before listeners accept traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - A store that is unreachable at startup is not fatal; the first
//!   snapshot is the built-in default until the store recovers

use notify::RecommendedWatcher;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::admin::AdminState;
use crate::cache::ConfigCache;
use crate::config::{RouterConfig, StoreKind};
use crate::http::{AppState, OriginClient};
use crate::preview::{HttpPreviewRegistry, PreviewRegistry, PreviewResolver, StaticPreviewRegistry};
use crate::routing::EdgeRouter;
use crate::store::watcher::ConfigWatcher;
use crate::store::{ConfigStore, FileConfigStore, HttpConfigStore, MemoryConfigStore};

/// Slack added to the upstream timeout for the outer request deadline.
const REQUEST_DEADLINE_SLACK: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("store: {0}")]
    Store(String),

    #[error("origin client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("config watcher: {0}")]
    Watcher(#[from] notify::Error),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a running router owns.
pub struct AppContext {
    pub config: RouterConfig,
    pub cache: Arc<ConfigCache>,
    pub preview: Option<Arc<PreviewResolver>>,
    pub router: Arc<EdgeRouter>,
    pub upstream: Arc<OriginClient>,
    /// Kept alive for the lifetime of the process; dropping it stops watching.
    _watcher: Option<RecommendedWatcher>,
}

impl AppContext {
    /// Assemble all subsystems from validated settings.
    pub fn build(config: RouterConfig) -> Result<Self, StartupError> {
        let (store, watcher) = build_store(&config)?;
        let cache = Arc::new(ConfigCache::from_config(store, &config.store));

        let preview = config.preview.enabled.then(|| {
            let registry: Arc<dyn PreviewRegistry> = match config.preview.registry_url {
                Some(_) => Arc::new(HttpPreviewRegistry::from_config(&config.preview)),
                None => {
                    tracing::warn!("Preview enabled without a registry URL, using an empty registry");
                    Arc::new(StaticPreviewRegistry::new())
                }
            };
            Arc::new(PreviewResolver::from_config(registry, &config.preview))
        });

        let router = Arc::new(EdgeRouter::new(
            cache.clone(),
            preview.clone(),
            config.store.environment.clone(),
        ));
        let upstream = Arc::new(OriginClient::from_config(&config.upstream)?);

        tracing::info!(
            store = ?config.store.kind,
            environment = %config.store.environment,
            preview = preview.is_some(),
            "Subsystems initialized"
        );

        Ok(Self {
            config,
            cache,
            preview,
            router,
            upstream,
            _watcher: watcher,
        })
    }

    /// Load the first snapshot so the first request does not pay for it.
    pub async fn warm(&self) {
        let snapshot = self.cache.ensure_fresh(&self.config.store.environment).await;
        tracing::info!(
            version = snapshot.version(),
            routes = snapshot.routes().len(),
            redirects = snapshot.redirects().len(),
            "Config cache warmed"
        );
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            router: self.router.clone(),
            upstream: self.upstream.clone(),
        }
    }

    pub fn admin_state(&self) -> AdminState {
        AdminState {
            router: self.router.clone(),
            api_key: Arc::from(self.config.admin.api_key.as_str()),
        }
    }

    /// Outer deadline for a whole request, above the upstream timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.upstream.request_timeout_secs) + REQUEST_DEADLINE_SLACK
    }

    /// Release cached state. Listeners must already be stopped.
    pub fn shutdown(self) {
        self.cache.teardown();
        if let Some(preview) = &self.preview {
            preview.purge();
        }
        tracing::info!("Router state released");
    }
}

fn build_store(
    config: &RouterConfig,
) -> Result<(Arc<dyn ConfigStore>, Option<RecommendedWatcher>), StartupError> {
    match config.store.kind {
        StoreKind::Http => {
            if config.store.base_url.is_none() {
                return Err(StartupError::Store("http store needs store.base_url".to_string()));
            }
            Ok((Arc::new(HttpConfigStore::from_config(&config.store)), None))
        }
        StoreKind::File => {
            let directory = config
                .store
                .directory
                .as_deref()
                .ok_or_else(|| StartupError::Store("file store needs store.directory".to_string()))?;
            let store = FileConfigStore::new(directory);
            let watcher = if config.store.watch {
                Some(ConfigWatcher::new(&store).run()?)
            } else {
                None
            };
            Ok((Arc::new(store), watcher))
        }
        StoreKind::Memory => Ok((Arc::new(MemoryConfigStore::new()), None)),
    }
}
