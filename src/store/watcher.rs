//! Filesystem watcher for the local config store.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::store::FileConfigStore;

/// Marks a [`FileConfigStore`] dirty whenever its directory changes.
pub struct ConfigWatcher {
    path: PathBuf,
    changed: Arc<AtomicBool>,
}

impl ConfigWatcher {
    /// Create a watcher bound to `store`.
    pub fn new(store: &FileConfigStore) -> Self {
        Self {
            path: store.root().to_path_buf(),
            changed: store.change_flag(),
        }
    }

    /// Start watching in the background. Dropping the returned handle stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let changed = self.changed.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        tracing::debug!(paths = ?event.paths, "Config documents changed");
                        changed.store(true, Ordering::Release);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::Recursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
