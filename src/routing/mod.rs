//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, query)
//!     → router.rs (EdgeRouter: snapshot refresh, preview check)
//!     → normalize.rs (trailing-slash redirect)
//!     → redirect.rs (configured redirects)
//!     → matcher.rs (path → application key)
//!     → Return: RoutingDecision
//!
//! Rule Compilation (per snapshot):
//!     RouteRule[] / RedirectRule[]
//!     → Exact tier + length-sorted prefixes
//!     → One-to-one / pattern / mirror redirects
//!     → Frozen inside the immutable ConfigSnapshot
//! ```
//!
//! # Design Decisions
//! - Rules compiled once per snapshot, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Every path resolves to an application (catch-all)

pub mod matcher;
pub mod normalize;
pub mod redirect;
pub mod router;

pub use matcher::RouteTable;
pub use redirect::{Redirect, RedirectTable};
pub use router::{EdgeRouter, RoutingDecision};
