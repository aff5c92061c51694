//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, trace, timeout)
//!     → request.rs (host, path, query, origin)
//!     → routing::EdgeRouter (decision)
//!     → response.rs (redirects, preview 404)  |  upstream.rs (forward to origin)
//!     → policy (security, CSP, CORS, Cache-Control)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::{RequestInfo, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
pub use upstream::{OriginClient, ProxyError};
