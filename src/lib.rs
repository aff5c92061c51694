//! Edge Request Router
//!
//! Per-request routing at the edge: each request is matched against a
//! versioned configuration snapshot and either redirected, rejected or
//! forwarded to an application origin with response policy applied.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing::EdgeRouter
//!                                          │
//!                       ┌──────────────────┼─────────────────────┐
//!                       ▼                  ▼                     ▼
//!                preview resolver    cache::ConfigCache    routing tables
//!                (registry lookup)   (store::ConfigStore)  (routes, redirects)
//!                                          │
//!                                          ▼
//!     Client Response                 http::upstream ──────▶ Origin
//!     ◀────────────── policy (CORS, CSP, Cache-Control) ◀────┘
//! ```

// Configuration data
pub mod config;
pub mod snapshot;
pub mod store;
pub mod cache;

// Request path
pub mod http;
pub mod policy;
pub mod preview;
pub mod routing;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use cache::ConfigCache;
pub use config::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{EdgeRouter, RoutingDecision};
pub use snapshot::ConfigSnapshot;
