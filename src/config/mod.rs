//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → lifecycle::startup builds the store, cache, resolver and client
//! ```
//!
//! Routing rules are not process settings: they are versioned documents
//! fetched at runtime through `crate::store`.
//!
//! # Design Decisions
//! - Settings are immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_config_or_default, ConfigError};
pub use schema::{
    AdminConfig, ListenerConfig, ObservabilityConfig, PreviewConfig, RouterConfig, StoreConfig,
    StoreKind, UpstreamConfig,
};
