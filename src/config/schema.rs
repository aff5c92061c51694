//! Configuration schema definitions.
//!
//! Process settings for the router. Routing rules themselves are not here:
//! they arrive as versioned documents through the config store.
//! All types derive Serde traits for deserialization from the settings file.

use serde::{Deserialize, Serialize};

/// Root settings for the edge router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where configuration snapshots come from and how long they are kept.
    pub store: StoreConfig,

    /// Preview branch resolution.
    pub preview: PreviewConfig,

    /// Forwarding to application origins.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Config store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Remote object store plus key-value version endpoint.
    Http,
    /// Local directory in the published layout.
    File,
    /// Built-in documents held in memory.
    #[default]
    Memory,
}

/// Config store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,

    /// Base URL of the document store (`http` kind).
    pub base_url: Option<String>,

    /// Base URL of the version endpoint (`http` kind). Without it every
    /// fetch uses the unversioned layout.
    pub version_url: Option<String>,

    /// Root directory (`file` kind).
    pub directory: Option<String>,

    /// Watch `directory` for changes instead of re-hashing on every probe.
    pub watch: bool,

    /// Environment segment of document paths (e.g., "production").
    pub environment: String,

    /// Version probe timeout in milliseconds.
    pub probe_timeout_ms: u64,

    /// Per-document fetch timeout in milliseconds.
    pub fetch_timeout_ms: u64,

    /// Maximum snapshot age before a re-fetch is forced, in seconds.
    pub max_age_secs: u64,

    /// Pause after a failed refresh, in seconds.
    pub retry_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            base_url: None,
            version_url: None,
            directory: None,
            watch: true,
            environment: "production".to_string(),
            probe_timeout_ms: 50,
            fetch_timeout_ms: 500,
            max_age_secs: 300,
            retry_interval_secs: 10,
        }
    }
}

/// Preview branch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub enabled: bool,

    /// Hosts must end with this domain to be considered previews.
    pub beta_domain: String,

    /// First segment of registry keys (`/{prefix}/preview/{branchId}/{app}`).
    pub project_prefix: String,

    /// Registry base URL. Without it an empty in-memory registry is used.
    pub registry_url: Option<String>,

    /// Preview cache entry lifetime in seconds.
    pub ttl_secs: u64,

    /// Registry lookup timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            beta_domain: String::new(),
            project_prefix: "mk-www".to_string(),
            registry_url: None,
            ttl_secs: 300,
            timeout_ms: 100,
        }
    }
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Total time allowed for an origin response, in seconds.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Origin used when the routed application has no entry
    /// (e.g., "https://fallback.example.com").
    pub default_origin: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
            default_origin: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
