//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::http::{HeaderMap, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use edge_router::cache::ConfigCache;
use edge_router::http::{AppState, HttpServer, OriginClient};
use edge_router::preview::{PreviewRegistry, PreviewResolver};
use edge_router::routing::EdgeRouter;
use edge_router::snapshot::{OriginConfig, RouteRule, SnapshotDocuments};
use edge_router::store::ConfigStore;

pub const BETA_DOMAIN: &str = "example-beta.com";

/// Start a mock origin on an ephemeral port. Every request is answered with
/// a JSON echo of the path, query and the headers the router sets.
pub async fn start_echo_origin() -> SocketAddr {
    let app = Router::new().fallback(|uri: Uri, headers: HeaderMap| async move {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Json(json!({
            "path": uri.path(),
            "query": uri.query(),
            "host": header("host"),
            "routed_app": header("x-routed-app"),
            "preview_branch": header("x-preview-branch"),
            "request_id": header("x-request-id"),
        }))
    });
    serve(app).await
}

/// Start a mock origin that always answers with `status`.
pub async fn start_status_origin(status: StatusCode) -> SocketAddr {
    let app = Router::new().fallback(move || async move { (status, "origin says no") });
    serve(app).await
}

/// Start a mock origin that takes `delay` before answering.
pub async fn start_slow_origin(delay: Duration) -> SocketAddr {
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    });
    serve(app).await
}

/// A loopback address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

pub fn http_origin(addr: SocketAddr) -> OriginConfig {
    OriginConfig {
        domain_name: addr.ip().to_string(),
        port: addr.port(),
        protocol: "http".to_string(),
    }
}

/// Routes for `core` (root and /pricing), `docs` (prefix) and the catch-all.
pub fn documents(origins: HashMap<String, OriginConfig>) -> SnapshotDocuments {
    let mut catch_all = RouteRule::new("/", "kitchen-sink", false);
    catch_all.catch_all = true;

    SnapshotDocuments {
        routes: vec![
            RouteRule::new("/", "core", true),
            RouteRule::new("/pricing", "core", false),
            RouteRule::new("/docs*", "docs", false),
            catch_all,
        ],
        origins,
        ..SnapshotDocuments::default()
    }
}

/// A running router plus the handles tests poke at.
pub struct TestRouter {
    pub addr: SocketAddr,
    pub router: Arc<EdgeRouter>,
    shutdown: broadcast::Sender<()>,
}

impl TestRouter {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestRouter {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// Serve the full HTTP stack on an ephemeral port.
pub async fn spawn_router(
    store: Arc<dyn ConfigStore>,
    registry: Option<Arc<dyn PreviewRegistry>>,
    upstream_timeout: Duration,
) -> TestRouter {
    let cache = Arc::new(ConfigCache::new(store));
    let preview = registry.map(|registry| Arc::new(PreviewResolver::new(registry, BETA_DOMAIN, "mk-www")));
    let router = Arc::new(EdgeRouter::new(cache, preview, "production"));

    let upstream = OriginClient::new(upstream_timeout, Duration::from_secs(1), None).unwrap();
    let state = AppState {
        router: router.clone(),
        upstream: Arc::new(upstream),
    };
    let server = HttpServer::new(state, upstream_timeout + Duration::from_secs(5));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, rx) = broadcast::channel(1);
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestRouter {
        addr,
        router,
        shutdown,
    }
}

/// Client that neither follows redirects nor uses system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

pub async fn json_body(response: reqwest::Response) -> Value {
    response.json().await.unwrap()
}
