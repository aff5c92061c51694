//! Operator API.
//!
//! Every route sits behind the bearer-token middleware in `auth.rs`.
//!
//! - `GET /admin/status`: build and snapshot version
//! - `GET /admin/config`: live snapshot summary
//! - `POST /admin/refresh`: re-fetch the snapshot now
//! - `GET /admin/resolve?host=&path=&query=`: dry-run routing decision
//! - `DELETE /admin/preview-cache`: drop cached preview origins

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::routing::EdgeRouter;

#[derive(Clone)]
pub struct AdminState {
    pub router: Arc<EdgeRouter>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/config", get(get_config))
        .route("/admin/refresh", post(refresh_config))
        .route("/admin/resolve", get(resolve))
        .route("/admin/preview-cache", delete(purge_preview_cache))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
