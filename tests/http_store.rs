//! Remote config store and preview registry against mock HTTP backends.

use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use edge_router::preview::{branch_id, HttpPreviewRegistry, PreviewError, PreviewRegistry, PreviewResolver};
use edge_router::store::{ConfigStore, HttpConfigStore, StoreError, VersionToken};

const ROUTES: &str = r#"[
    {"path": "/", "app": "core", "exact": true},
    {"path": "/docs*", "app": "docs"},
    {"path": "/", "app": "kitchen-sink", "catchAll": true}
]"#;

const ORIGINS: &str = r#"{"origins": {
    "core": {"domainName": "core.internal.example.com"},
    "docs": {"appRunnerUrl": "https://docs.awsapprunner.com/"}
}}"#;

async fn mount_document(server: &MockServer, document_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(document_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn store(documents: &MockServer, versions: Option<&MockServer>) -> HttpConfigStore {
    HttpConfigStore::new(
        documents.uri(),
        versions.map(MockServer::uri),
        Duration::from_millis(200),
        Duration::from_millis(500),
    )
}

#[tokio::test]
async fn test_fetches_versioned_documents() {
    let documents = MockServer::start().await;
    let versions = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/production_version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("abc123\n"))
        .mount(&versions)
        .await;
    mount_document(&documents, "/production/abc123/routes.json", ROUTES).await;
    mount_document(&documents, "/production/abc123/config.json", ORIGINS).await;

    let store = store(&documents, Some(&versions));
    let version = store.fetch_version("production").await;
    assert_eq!(version, Some(VersionToken::new("abc123")));

    let snapshot = store.fetch_snapshot("production", version.as_ref()).await.unwrap();
    assert_eq!(snapshot.version(), "abc123");
    assert_eq!(snapshot.routes().find("/docs/a/"), "docs");
    assert_eq!(snapshot.routes().catch_all(), "kitchen-sink");
    assert_eq!(snapshot.origin("docs").unwrap().domain_name, "docs.awsapprunner.com");
    // Optional documents were 404 and fall back to built-ins.
    assert!(snapshot.redirects().is_empty());
    assert!(snapshot.cors().allows_any_origin());
}

#[tokio::test]
async fn test_unversioned_layout_without_version_endpoint() {
    let documents = MockServer::start().await;
    mount_document(&documents, "/staging/www/routes.json", ROUTES).await;
    mount_document(&documents, "/staging/www/config.json", ORIGINS).await;
    mount_document(
        &documents,
        "/staging/www/redirects.json",
        r#"[{"sourcePath": "/old/", "targetPath": "/new/", "redirectType": "one-to-one"}]"#,
    )
    .await;

    let store = store(&documents, None);
    assert_eq!(store.fetch_version("staging").await, None);

    let snapshot = store.fetch_snapshot("staging", None).await.unwrap();
    assert_eq!(snapshot.version(), "legacy");
    assert_eq!(snapshot.redirects().len(), 1);
}

#[tokio::test]
async fn test_critical_document_failure_is_an_error() {
    let documents = MockServer::start().await;
    mount_document(&documents, "/production/v9/routes.json", ROUTES).await;
    Mock::given(method("GET"))
        .and(path("/production/v9/config.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&documents)
        .await;

    let result = store(&documents, None)
        .fetch_snapshot("production", Some(&VersionToken::new("v9")))
        .await;
    assert!(matches!(result, Err(StoreError::RemoteFetch { .. })));
}

#[tokio::test]
async fn test_slow_version_probe_yields_no_version() {
    let documents = MockServer::start().await;
    let versions = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/production_version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(1)),
        )
        .mount(&versions)
        .await;

    let store = store(&documents, Some(&versions));
    assert_eq!(store.fetch_version("production").await, None);
}

#[tokio::test]
async fn test_preview_registry_lookup() {
    let server = MockServer::start().await;
    let id = branch_id("feature-x");
    Mock::given(method("GET"))
        .and(path(format!("/mk-www/preview/{}/core", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string("https://feature-x-core.awsapprunner.com\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/mk-www/preview/{}/docs", id)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = Arc::new(HttpPreviewRegistry::new(server.uri(), Duration::from_millis(500)));

    let missing = registry.lookup("/mk-www/preview/unknown/core").await.unwrap();
    assert_eq!(missing, None);

    let failed = registry.lookup(&format!("/mk-www/preview/{}/docs", id)).await;
    assert!(matches!(failed, Err(PreviewError::Registry { .. })));

    let resolver = PreviewResolver::new(registry, "example-beta.com", "mk-www");
    let target = resolver
        .resolve("feature-x.www.example-beta.com", "core")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(target.domain, "feature-x-core.awsapprunner.com");
    assert_eq!(target.origin().base_url(), "https://feature-x-core.awsapprunner.com:443");
    assert_eq!(resolver.len(), 1);
}
