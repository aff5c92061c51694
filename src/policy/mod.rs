//! Response header policy.
//!
//! # Data Flow
//! ```text
//! Response from origin (or generated locally)
//!     → headers.rs (fixed security headers, HSTS)
//!     → csp.rs (report-only policy, pre-rendered per snapshot)
//!     → cors.rs (wildcard or echoed origin)
//!     → cache_control.rs (first matching path rule, else default)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - CSP is emitted as `Content-Security-Policy-Report-Only` so policy
//!   changes can be observed before they are enforced
//! - Everything here is a pure function of (path, origin, snapshot)

pub mod cache_control;
pub mod cors;
pub mod csp;
pub mod headers;

use axum::http::header::{CACHE_CONTROL, CONTENT_SECURITY_POLICY_REPORT_ONLY};
use axum::http::{HeaderMap, HeaderValue};

use crate::snapshot::ConfigSnapshot;

/// Adds security, CSP and CORS headers.
pub fn apply(request_origin: Option<&str>, snapshot: &ConfigSnapshot, headers: &mut HeaderMap) {
    headers::apply_security_headers(headers);
    headers.insert(CONTENT_SECURITY_POLICY_REPORT_ONLY, snapshot.csp_header().clone());
    cors::apply_cors(snapshot.cors(), request_origin, headers);
}

/// Sets `Cache-Control` from the snapshot's path rules.
pub fn apply_cache_control(path: &str, snapshot: &ConfigSnapshot, headers: &mut HeaderMap) {
    let directive = snapshot.cache_control().directive_for(path);
    match HeaderValue::from_str(directive) {
        Ok(value) => {
            headers.insert(CACHE_CONTROL, value);
        }
        Err(_) => tracing::warn!(directive = %directive, "Invalid Cache-Control directive"),
    }
}
