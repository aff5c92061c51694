//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all edge handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener with graceful shutdown
//! - Run the routing decision and act on it (redirect, 404, forward)
//! - Apply the response policy to everything that leaves the router
//! - Observability (metrics, correlation IDs)

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::http::request::RequestInfo;
use crate::http::response;
use crate::http::upstream::{OriginClient, ProxyError};
use crate::observability::metrics;
use crate::policy;
use crate::routing::{EdgeRouter, RoutingDecision};
use crate::snapshot::OriginConfig;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<EdgeRouter>,
    pub upstream: Arc<OriginClient>,
}

/// HTTP front door of the edge router.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server; `request_timeout` bounds the whole request.
    pub fn new(state: AppState, request_timeout: Duration) -> Self {
        Self {
            router: Self::build_router(state, request_timeout),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/", any(edge_handler))
            .route("/{*path}", any(edge_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for embedding or tests.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main edge handler.
/// Routes the request, then redirects, rejects or forwards it.
async fn edge_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let info = RequestInfo::from_request(&request);

    let (snapshot, decision) = state
        .router
        .route(&info.host, &info.path, info.query.as_deref())
        .await;

    tracing::debug!(
        request_id = info.request_id.as_deref().unwrap_or("unknown"),
        method = %info.method,
        host = %info.host,
        path = %info.path,
        decision = decision.label(),
        version = snapshot.version(),
        "Routing decision"
    );

    let mut response = match &decision {
        RoutingDecision::Preview { target } => {
            let origin = target.origin();
            forward(&state, request, &origin, &target.app, Some(&target.branch)).await
        }
        RoutingDecision::PreviewNotFound { branch } => response::preview_not_found(branch),
        RoutingDecision::SlashRedirect { redirect } | RoutingDecision::Redirect { redirect } => {
            response::redirect(redirect)
        }
        RoutingDecision::Origin { app, origin } => {
            match origin.as_ref().or(state.upstream.default_origin()) {
                Some(origin) => forward(&state, request, origin, app, None).await,
                None => {
                    tracing::warn!(app = %app, path = %info.path, "No origin configured for application");
                    ProxyError::OriginUnreachable {
                        app: app.clone(),
                        reason: "no origin configured".to_string(),
                    }
                    .into_response()
                }
            }
        }
    };

    let forwarded = matches!(
        decision,
        RoutingDecision::Preview { .. } | RoutingDecision::Origin { .. }
    ) && !response.status().is_server_error();
    if forwarded {
        policy::apply_cache_control(&info.path, &snapshot, response.headers_mut());
    }
    policy::apply(info.origin.as_deref(), &snapshot, response.headers_mut());

    metrics::record_request(
        info.method.as_str(),
        decision.label(),
        response.status().as_u16(),
        start,
    );
    response
}

async fn forward(
    state: &AppState,
    request: Request<Body>,
    origin: &OriginConfig,
    app: &str,
    preview_branch: Option<&str>,
) -> Response {
    match state.upstream.forward(request, origin, app, preview_branch).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, app, origin = %origin.domain_name, "Upstream error");
            e.into_response()
        }
    }
}
