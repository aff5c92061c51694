//! Trailing-slash normalization.
//!
//! Page paths are canonicalized with a trailing slash. Asset paths (anything
//! containing a dot) and the `/api/` and `/_next/` trees are left untouched.

/// Path prefixes served verbatim.
const PASSTHROUGH_PREFIXES: &[&str] = &["/api/", "/_next/"];

/// Returns the canonical path when `path` needs a slash redirect.
pub fn trailing_slash_target(path: &str) -> Option<String> {
    if PASSTHROUGH_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return None;
    }

    // Extensions (static files) and already-canonical paths pass through.
    if path.ends_with('/') || path.contains('.') {
        return None;
    }

    Some(format!("{}/", path))
}

/// Location header for a slash redirect, keeping the original query.
pub fn slash_redirect_location(canonical: &str, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{}?{}", canonical, query),
        None => canonical.to_string(),
    }
}
