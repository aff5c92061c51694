//! Forwarding to application origins.
//!
//! # Responsibilities
//! - Rewrite the request for the chosen origin (URL, `Host`, `X-Routed-App`)
//! - Stream request and response bodies without buffering
//! - Map origin failures to 502 / 504
//!
//! # Design Decisions
//! - No retries at this layer; the caller owns retry policy
//! - Origin redirects are passed through to the client, not followed
//! - Hop-by-hop headers are stripped in both directions

use axum::body::{Body, HttpBody};
use axum::http::header::HOST;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::config::UpstreamConfig;
use crate::http::response;
use crate::policy::headers::strip_hop_by_hop;
use crate::snapshot::OriginConfig;

/// Diagnostic header naming the application that served the request.
pub const X_ROUTED_APP: &str = "x-routed-app";

/// Branch name on requests forwarded to a preview deployment.
pub const X_PREVIEW_BRANCH: &str = "x-preview-branch";

/// Errors forwarding to an origin.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("origin for {app} unreachable: {reason}")]
    OriginUnreachable { app: String, reason: String },

    #[error("origin for {app} did not respond within {timeout_secs}s")]
    OriginTimeout { app: String, timeout_secs: u64 },

    #[error("invalid origin for {app}: {reason}")]
    InvalidOrigin { app: String, reason: String },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::OriginTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::OriginUnreachable { .. } | ProxyError::InvalidOrigin { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let message = match self.status() {
            StatusCode::GATEWAY_TIMEOUT => "Upstream request timed out",
            _ => "Upstream request failed",
        };
        response::text(self.status(), message.to_string())
    }
}

/// HTTP client for application origins.
#[derive(Debug, Clone)]
pub struct OriginClient {
    client: reqwest::Client,
    request_timeout: Duration,
    default_origin: Option<OriginConfig>,
}

impl OriginClient {
    pub fn new(
        request_timeout: Duration,
        connect_timeout: Duration,
        default_origin: Option<OriginConfig>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            request_timeout,
            default_origin,
        })
    }

    pub fn from_config(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let default_origin = config.default_origin.as_deref().and_then(|url| {
            let origin = parse_origin(url);
            if origin.is_none() {
                tracing::warn!(url, "Ignoring unparsable default origin");
            }
            origin
        });

        Self::new(
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
            default_origin,
        )
    }

    /// Origin for applications missing from the snapshot's origin map.
    pub fn default_origin(&self) -> Option<&OriginConfig> {
        self.default_origin.as_ref()
    }

    /// Forward `request` to `origin` on behalf of `app`.
    pub async fn forward(
        &self,
        request: Request<Body>,
        origin: &OriginConfig,
        app: &str,
        preview_branch: Option<&str>,
    ) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{}", origin.base_url(), path_and_query);

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        set_header(&mut headers, HOST, &origin.domain_name, app)?;
        set_header(&mut headers, HeaderName::from_static(X_ROUTED_APP), app, app)?;
        if let Some(branch) = preview_branch {
            set_header(&mut headers, HeaderName::from_static(X_PREVIEW_BRANCH), branch, app)?;
        }

        tracing::debug!(app, url = %url, "Forwarding to origin");

        let mut outbound = self.client.request(parts.method, &url).headers(headers);
        // Bodiless requests must not turn into chunked uploads.
        if body.size_hint().exact() != Some(0) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }
        let send = outbound.send();

        let upstream = match timeout(self.request_timeout, send).await {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(e)) if e.is_timeout() => {
                return Err(ProxyError::OriginTimeout {
                    app: app.to_string(),
                    timeout_secs: self.request_timeout.as_secs(),
                })
            }
            Ok(Err(e)) => {
                return Err(ProxyError::OriginUnreachable {
                    app: app.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(ProxyError::OriginTimeout {
                    app: app.to_string(),
                    timeout_secs: self.request_timeout.as_secs(),
                })
            }
        };

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

fn set_header(headers: &mut HeaderMap, name: HeaderName, value: &str, app: &str) -> Result<(), ProxyError> {
    let value = HeaderValue::from_str(value).map_err(|_| ProxyError::InvalidOrigin {
        app: app.to_string(),
        reason: format!("`{}` is not a valid {} header", value, name),
    })?;
    headers.insert(name, value);
    Ok(())
}

/// `https://host[:port]` to an [`OriginConfig`].
pub fn parse_origin(url: &str) -> Option<OriginConfig> {
    OriginConfig::from_url(url)
}
