//! Per-request routing decision.
//!
//! # Responsibilities
//! - Refresh the config snapshot (cheap when unchanged)
//! - Short-circuit preview hosts to their registered deployment
//! - Canonicalize trailing slashes, then apply redirect rules
//! - Pick the application and its origin
//!
//! # Design Decisions
//! - The decision is a plain value; forwarding and headers live in `http`
//! - The snapshot used for the decision is returned with it, so the response
//!   policy reads the same version the route came from

use serde::Serialize;
use std::sync::Arc;

use crate::cache::ConfigCache;
use crate::preview::{PreviewResolver, PreviewTarget};
use crate::routing::normalize::{slash_redirect_location, trailing_slash_target};
use crate::routing::redirect::Redirect;
use crate::snapshot::{ConfigSnapshot, OriginConfig};

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RoutingDecision {
    /// Forward to a preview deployment.
    Preview { target: PreviewTarget },
    /// Preview host with no registered deployment.
    PreviewNotFound { branch: String },
    /// Canonical trailing-slash redirect.
    SlashRedirect { redirect: Redirect },
    /// Configured redirect rule.
    Redirect { redirect: Redirect },
    /// Forward to the application's origin. `origin` is `None` when the
    /// snapshot has no entry for `app`.
    Origin {
        app: String,
        origin: Option<OriginConfig>,
    },
}

impl RoutingDecision {
    /// Stable label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RoutingDecision::Preview { .. } => "preview",
            RoutingDecision::PreviewNotFound { .. } => "preview_not_found",
            RoutingDecision::SlashRedirect { .. } => "slash_redirect",
            RoutingDecision::Redirect { .. } => "redirect",
            RoutingDecision::Origin { .. } => "origin",
        }
    }
}

/// The routing core: one instance per process, shared by all requests.
#[derive(Debug)]
pub struct EdgeRouter {
    cache: Arc<ConfigCache>,
    preview: Option<Arc<PreviewResolver>>,
    environment: String,
}

impl EdgeRouter {
    pub fn new(
        cache: Arc<ConfigCache>,
        preview: Option<Arc<PreviewResolver>>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            preview,
            environment: environment.into(),
        }
    }

    pub fn cache(&self) -> &Arc<ConfigCache> {
        &self.cache
    }

    pub fn preview(&self) -> Option<&Arc<PreviewResolver>> {
        self.preview.as_ref()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Decide how to answer a request for `host` + `path` + `query`.
    pub async fn route(
        &self,
        host: &str,
        path: &str,
        query: Option<&str>,
    ) -> (Arc<ConfigSnapshot>, RoutingDecision) {
        let snapshot = self.cache.ensure_fresh(&self.environment).await;
        let decision = self.decide(&snapshot, host, path, query).await;
        (snapshot, decision)
    }

    async fn decide(
        &self,
        snapshot: &ConfigSnapshot,
        host: &str,
        path: &str,
        query: Option<&str>,
    ) -> RoutingDecision {
        if let Some(resolver) = &self.preview {
            if let Some(branch) = resolver.extract_branch(host) {
                let app = snapshot.routes().find(path);
                return match resolver.lookup(&branch, app).await {
                    Ok(Some(target)) => RoutingDecision::Preview { target },
                    Ok(None) => RoutingDecision::PreviewNotFound { branch },
                    Err(e) => {
                        tracing::warn!(error = %e, branch = %branch, app, "Preview lookup failed");
                        RoutingDecision::PreviewNotFound { branch }
                    }
                };
            }
        }

        if let Some(canonical) = trailing_slash_target(path) {
            return RoutingDecision::SlashRedirect {
                redirect: Redirect {
                    location: slash_redirect_location(&canonical, query),
                    permanent: true,
                },
            };
        }

        if let Some(redirect) = snapshot.redirects().find(path, query) {
            return RoutingDecision::Redirect { redirect };
        }

        let app = snapshot.routes().find(path);
        RoutingDecision::Origin {
            app: app.to_string(),
            origin: snapshot.origin(app).cloned(),
        }
    }
}
