//! Process-local configuration cache.
//!
//! # Data Flow
//! ```text
//! request
//!     → ConfigCache::ensure_fresh(env)
//!         → ConfigStore::fetch_version      (every call, tens of ms budget)
//!         → cached version matches and snapshot within max age?
//!             yes → Arc<ConfigSnapshot> (no further I/O)
//!             no  → refresh gate (single flight)
//!                 → ConfigStore::fetch_snapshot
//!                 → ArcSwap store, or keep previous / fallback on error
//! ```
//!
//! # Design Decisions
//! - Readers never block: the snapshot lives in an `ArcSwapOption`
//! - Only one refresh is in flight; waiters re-check after the gate opens
//! - A failed refresh backs off for `retry_interval` before trying again
//! - The built-in fallback is never reused once the backoff has passed

pub mod config_cache;

pub use config_cache::ConfigCache;
