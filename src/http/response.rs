//! Locally generated responses.
//!
//! # Responsibilities
//! - Build redirect and diagnostic responses the router answers itself
//! - Keep them out of shared caches (`Cache-Control: no-store`)

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::routing::Redirect;

const NO_STORE: &str = "no-store";

/// 301/302 with `Location`.
pub fn redirect(redirect: &Redirect) -> Response {
    let location = match HeaderValue::from_str(&redirect.location) {
        Ok(location) => location,
        Err(_) => {
            tracing::warn!(location = %redirect.location, "Redirect target is not a valid header value");
            return text(StatusCode::INTERNAL_SERVER_ERROR, "Invalid redirect target".to_string());
        }
    };

    let mut response = Response::new(Body::empty());
    *response.status_mut() = redirect.status();
    response.headers_mut().insert(LOCATION, location);
    response.headers_mut().insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    response
}

/// 404 for a preview host with nothing registered.
pub fn preview_not_found(branch: &str) -> Response {
    text(
        StatusCode::NOT_FOUND,
        format!("Preview not found for branch: {}", branch),
    )
}

/// Plain-text response that is never cached.
pub fn text(status: StatusCode, body: String) -> Response {
    let mut response = (status, body).into_response();
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response.headers_mut().insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    response
}
