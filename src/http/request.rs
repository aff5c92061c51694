//! Request handling.
//!
//! # Responsibilities
//! - Extract routing-relevant information (host, path, query, origin)
//! - Name the request id header shared by the tower layers
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `Host` header wins over the URI authority (HTTP/1.1 clients)

use axum::body::Body;
use axum::http::header::{HOST, ORIGIN};
use axum::http::{Method, Request};

/// Header carrying the correlation id, set by `SetRequestIdLayer`.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The parts of an inbound request the router looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: Method,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
    /// `Origin` header, for CORS.
    pub origin: Option<String>,
    pub request_id: Option<String>,
}

impl RequestInfo {
    pub fn from_request(request: &Request<Body>) -> Self {
        let headers = request.headers();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let host = header(HOST.as_str())
            .or_else(|| request.uri().authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Self {
            method: request.method().clone(),
            host,
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            origin: header(ORIGIN.as_str()),
            request_id: header(X_REQUEST_ID),
        }
    }
}
