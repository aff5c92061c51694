//! CORS response headers.
//!
//! A wildcard allow-list answers `*`. Otherwise the request `Origin` is echoed
//! back only when it is on the allow-list, together with `Vary: Origin` so
//! shared caches key on it.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, VARY,
};
use axum::http::{HeaderMap, HeaderValue};

use crate::snapshot::CorsPolicy;

/// Adds CORS headers for a response to a request carrying `request_origin`.
pub fn apply_cors(policy: &CorsPolicy, request_origin: Option<&str>, headers: &mut HeaderMap) {
    if policy.allows_any_origin() {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    } else {
        if let Some(origin) = request_origin.filter(|o| origin_allowed(policy, o)) {
            if let Ok(value) = HeaderValue::from_str(origin) {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
        }
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }

    insert_list(headers, ACCESS_CONTROL_ALLOW_METHODS, &policy.allowed_methods);
    insert_list(headers, ACCESS_CONTROL_ALLOW_HEADERS, &policy.allowed_headers);
    insert_list(headers, ACCESS_CONTROL_EXPOSE_HEADERS, &policy.expose_headers);

    if let Some(max_age) = policy.max_age {
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
    }
}

/// Exact match; scheme and host compare case-insensitively.
pub fn origin_allowed(policy: &CorsPolicy, origin: &str) -> bool {
    let origin = origin.trim_end_matches('/');
    policy
        .allowed_origins
        .iter()
        .any(|allowed| allowed.trim_end_matches('/').eq_ignore_ascii_case(origin))
}

fn insert_list(headers: &mut HeaderMap, name: axum::http::HeaderName, values: &[String]) {
    if values.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&values.join(", ")) {
        headers.insert(name, value);
    }
}
