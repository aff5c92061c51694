use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::admin::AdminState;
use crate::routing::RoutingDecision;
use crate::snapshot::ConfigSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub environment: String,
    /// Version of the live snapshot, if one is cached.
    pub config_version: Option<String>,
    pub preview_enabled: bool,
}

#[derive(Serialize)]
pub struct ConfigSummary {
    pub version: String,
    pub age_secs: u64,
    pub routes: usize,
    pub redirects: usize,
    pub cache_rules: usize,
    pub catch_all: String,
    /// Application key to `scheme://host:port`.
    pub origins: BTreeMap<String, String>,
}

impl ConfigSummary {
    fn from_snapshot(snapshot: &ConfigSnapshot) -> Self {
        Self {
            version: snapshot.version().to_string(),
            age_secs: snapshot.age().as_secs(),
            routes: snapshot.routes().len(),
            redirects: snapshot.redirects().len(),
            cache_rules: snapshot.cache_control().len(),
            catch_all: snapshot.routes().catch_all().to_string(),
            origins: snapshot
                .documents()
                .origins
                .iter()
                .map(|(app, origin)| (app.clone(), origin.base_url()))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    pub host: Option<String>,
    pub path: String,
    pub query: Option<String>,
}

#[derive(Serialize)]
pub struct ResolveResult {
    pub config_version: String,
    #[serde(flatten)]
    pub decision: RoutingDecision,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        environment: state.router.environment().to_string(),
        config_version: state
            .router
            .cache()
            .current()
            .map(|snapshot| snapshot.version().to_string()),
        preview_enabled: state.router.preview().is_some(),
    })
}

pub async fn get_config(State(state): State<AdminState>) -> Json<ConfigSummary> {
    let snapshot = state
        .router
        .cache()
        .ensure_fresh(state.router.environment())
        .await;
    Json(ConfigSummary::from_snapshot(&snapshot))
}

pub async fn refresh_config(
    State(state): State<AdminState>,
) -> Result<Json<ConfigSummary>, (StatusCode, Json<serde_json::Value>)> {
    match state
        .router
        .cache()
        .force_refresh(state.router.environment())
        .await
    {
        Ok(snapshot) => {
            tracing::info!(version = snapshot.version(), "Config refreshed via admin API");
            Ok(Json(ConfigSummary::from_snapshot(&snapshot)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Admin config refresh failed");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": e.to_string() })),
            ))
        }
    }
}

/// Dry run of the routing decision, without forwarding.
pub async fn resolve(
    State(state): State<AdminState>,
    Query(params): Query<ResolveParams>,
) -> Json<ResolveResult> {
    let host = params.host.unwrap_or_default();
    let (snapshot, decision) = state
        .router
        .route(&host, &params.path, params.query.as_deref())
        .await;

    Json(ResolveResult {
        config_version: snapshot.version().to_string(),
        decision,
    })
}

pub async fn purge_preview_cache(State(state): State<AdminState>) -> Json<serde_json::Value> {
    let purged = state
        .router
        .preview()
        .map(|resolver| resolver.purge())
        .unwrap_or(0);
    tracing::info!(purged, "Preview cache purged via admin API");
    Json(serde_json::json!({ "purged": purged }))
}
