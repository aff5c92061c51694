//! Document naming and snapshot assembly shared by all stores.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::snapshot::defaults::default_csp_domains;
use crate::snapshot::schema::OriginsDocument;
use crate::snapshot::{
    CacheRules, ConfigSnapshot, CorsPolicy, CspDomain, RedirectRule, RouteRule, SnapshotDocuments,
};
use crate::store::{StoreError, StoreResult, VersionToken, LEGACY_VERSION};

/// The named documents that make up a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Routes,
    Redirects,
    Origins,
    CspDomains,
    CorsConfig,
    CacheRules,
}

impl Document {
    pub const ALL: [Document; 6] = [
        Document::Routes,
        Document::Redirects,
        Document::Origins,
        Document::CspDomains,
        Document::CorsConfig,
        Document::CacheRules,
    ];

    /// File stem in the published layout.
    pub fn name(self) -> &'static str {
        match self {
            Document::Routes => "routes",
            Document::Redirects => "redirects",
            Document::Origins => "config",
            Document::CspDomains => "csp-domains",
            Document::CorsConfig => "cors-config",
            Document::CacheRules => "cache-rules",
        }
    }

    /// Load-bearing documents fail the whole snapshot.
    pub fn is_critical(self) -> bool {
        matches!(self, Document::Routes | Document::Origins)
    }
}

/// `{env}/{version}/{name}.json`, or `{env}/www/{name}.json` without a version.
pub fn document_path(environment: &str, version: Option<&VersionToken>, document: Document) -> String {
    let segment = version.map(VersionToken::as_str).unwrap_or("www");
    format!("{}/{}/{}.json", environment, segment, document.name())
}

/// Raw access to one document; implemented by each backend.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn read_document(
        &self,
        environment: &str,
        version: Option<&VersionToken>,
        document: Document,
    ) -> StoreResult<Vec<u8>>;
}

async fn load<T: DeserializeOwned>(
    source: &(impl DocumentSource + ?Sized),
    environment: &str,
    version: Option<&VersionToken>,
    document: Document,
) -> StoreResult<T> {
    let bytes = source.read_document(environment, version, document).await?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
        path: document_path(environment, version, document),
        source,
    })
}

/// Falls back to `default` when a non-critical document cannot be loaded.
fn or_default<T>(result: StoreResult<T>, document: Document, default: impl FnOnce() -> T) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(document = document.name(), error = %e, "Using built-in default");
        default()
    })
}

/// Fetch all documents concurrently and compile them into a snapshot.
pub async fn assemble_snapshot(
    source: &(impl DocumentSource + ?Sized),
    environment: &str,
    version: Option<&VersionToken>,
) -> StoreResult<ConfigSnapshot> {
    let critical = futures_util::future::try_join(
        load::<Vec<RouteRule>>(source, environment, version, Document::Routes),
        load::<OriginsDocument>(source, environment, version, Document::Origins),
    );
    let (critical, redirects, csp_domains, cors, cache_rules) = tokio::join!(
        critical,
        load::<Vec<RedirectRule>>(source, environment, version, Document::Redirects),
        load::<Vec<CspDomain>>(source, environment, version, Document::CspDomains),
        load::<CorsPolicy>(source, environment, version, Document::CorsConfig),
        load::<CacheRules>(source, environment, version, Document::CacheRules),
    );
    let (routes, origins) = critical?;

    let documents = SnapshotDocuments {
        routes,
        redirects: or_default(redirects, Document::Redirects, Vec::new),
        origins: origins.origins,
        csp_domains: or_default(csp_domains, Document::CspDomains, default_csp_domains),
        cors: or_default(cors, Document::CorsConfig, CorsPolicy::default),
        cache_rules: or_default(cache_rules, Document::CacheRules, CacheRules::default),
    };

    let label = version.map(VersionToken::as_str).unwrap_or(LEGACY_VERSION);
    Ok(ConfigSnapshot::compile(label, documents))
}
