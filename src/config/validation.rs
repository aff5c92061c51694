//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that each store kind has the settings it needs
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{RouterConfig, StoreKind};

/// A single semantic problem in the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., "store.base_url").
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate `config`, collecting every error.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    let store = &config.store;
    if store.environment.trim().is_empty() || store.environment.contains('/') {
        errors.push(ValidationError::new(
            "store.environment",
            "must be a non-empty path segment",
        ));
    }
    match store.kind {
        StoreKind::Http => {
            match store.base_url.as_deref() {
                Some(url) => check_url(&mut errors, "store.base_url", url),
                None => errors.push(ValidationError::new("store.base_url", "required for the http store")),
            }
            if let Some(url) = store.version_url.as_deref() {
                check_url(&mut errors, "store.version_url", url);
            }
        }
        StoreKind::File => {
            if store.directory.as_deref().map_or(true, |d| d.trim().is_empty()) {
                errors.push(ValidationError::new("store.directory", "required for the file store"));
            }
        }
        StoreKind::Memory => {}
    }
    if store.probe_timeout_ms == 0 {
        errors.push(ValidationError::new("store.probe_timeout_ms", "must be greater than 0"));
    }
    if store.fetch_timeout_ms == 0 {
        errors.push(ValidationError::new("store.fetch_timeout_ms", "must be greater than 0"));
    }

    let preview = &config.preview;
    if preview.enabled {
        if preview.beta_domain.trim().is_empty() {
            errors.push(ValidationError::new(
                "preview.beta_domain",
                "required when previews are enabled",
            ));
        }
        if preview.project_prefix.trim_matches('/').is_empty() {
            errors.push(ValidationError::new("preview.project_prefix", "must not be empty"));
        }
        if let Some(url) = preview.registry_url.as_deref() {
            check_url(&mut errors, "preview.registry_url", url);
        }
        if preview.timeout_ms == 0 {
            errors.push(ValidationError::new("preview.timeout_ms", "must be greater than 0"));
        }
    }

    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "upstream.request_timeout_secs",
            "must be greater than 0",
        ));
    }
    if let Some(url) = config.upstream.default_origin.as_deref() {
        check_url(&mut errors, "upstream.default_origin", url);
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.trim().is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("invalid socket address `{}`", value)));
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(_) => errors.push(ValidationError::new(field, format!("`{}` is not an http(s) URL", value))),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL `{}`: {}", value, e))),
    }
}
