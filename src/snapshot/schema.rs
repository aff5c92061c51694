//! Configuration document schemas.
//!
//! These types mirror the JSON documents published to the config backend
//! (`routes.json`, `redirects.json`, `config.json`, `csp-domains.json`,
//! `cors-config.json`, `cache-rules.json`). Field names follow the camelCase
//! convention of the published documents.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::TryFrom;

/// A single entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    /// Path or path prefix. A trailing `*` marks an explicit prefix.
    pub path: String,

    /// Application key the path belongs to.
    pub app: String,

    /// Only match when the request path equals `path`.
    #[serde(default)]
    pub exact: bool,

    /// Marks `app` as the catch-all application.
    #[serde(default)]
    pub catch_all: bool,
}

impl RouteRule {
    pub fn new(path: impl Into<String>, app: impl Into<String>, exact: bool) -> Self {
        Self {
            path: path.into(),
            app: app.into(),
            exact,
            catch_all: false,
        }
    }
}

/// How a redirect rule compares the request path with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectType {
    OneToOne,
    Pattern,
    Mirror,
}

/// A redirect rule as published in `redirects.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRule {
    pub source_path: String,
    pub target_path: String,
    pub redirect_type: RedirectType,

    #[serde(default)]
    pub preserve_query: bool,

    /// Absent or null means permanent.
    #[serde(default)]
    pub permanent: Option<bool>,
}

impl RedirectRule {
    /// 301 unless the rule explicitly opts out.
    pub fn is_permanent(&self) -> bool {
        self.permanent != Some(false)
    }
}

/// Upstream target for one application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", try_from = "RawOriginConfig")]
pub struct OriginConfig {
    pub domain_name: String,
    pub port: u16,
    pub protocol: String,
}

impl OriginConfig {
    /// An HTTPS origin on port 443.
    pub fn https(domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            port: 443,
            protocol: "https".to_string(),
        }
    }

    /// `scheme://host[:port]` to an origin; the port defaults per scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = url::Url::parse(url).ok()?;
        Some(Self {
            domain_name: parsed.host_str()?.to_string(),
            port: parsed.port_or_known_default()?,
            protocol: parsed.scheme().to_string(),
        })
    }

    /// Base URL (`scheme://host:port`) used when forwarding.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.domain_name, self.port)
    }
}

/// Accepts both the current origin shape and the older `appRunnerUrl` form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOriginConfig {
    domain_name: Option<String>,
    app_runner_url: Option<String>,
    port: Option<u16>,
    protocol: Option<String>,
}

impl TryFrom<RawOriginConfig> for OriginConfig {
    type Error = String;

    fn try_from(raw: RawOriginConfig) -> Result<Self, Self::Error> {
        let domain = raw
            .domain_name
            .or(raw.app_runner_url)
            .ok_or_else(|| "origin requires `domainName` or `appRunnerUrl`".to_string())?;

        Ok(Self {
            domain_name: strip_scheme(&domain).to_string(),
            port: raw.port.unwrap_or(443),
            protocol: raw.protocol.unwrap_or_else(|| "https".to_string()),
        })
    }
}

/// Strips a leading `http://` or `https://` and any trailing slash.
pub fn strip_scheme(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    rest.trim_end_matches('/')
}

/// The `config.json` document. Only the origin map is read.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OriginsDocument {
    #[serde(default)]
    pub origins: HashMap<String, OriginConfig>,
}

/// A third-party domain allowed by the content security policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CspDomain {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

/// CORS settings from `cors-config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CorsPolicy {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age: Option<u64>,
}

impl CorsPolicy {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// One path pattern and the `Cache-Control` value it selects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRule {
    pub pattern: String,
    pub cache_control: String,
}

/// The `cache-rules.json` document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheRules {
    #[serde(default)]
    pub rules: Vec<CacheRule>,

    #[serde(rename = "default")]
    pub default_directive: String,
}
