//! Preview branch routing.
//!
//! # Data Flow
//! ```text
//! Host: feature-login.www.example-beta.com
//!     → resolver.rs: extract_branch → "feature-login"
//!     → branch_id = sha256("feature-login")[..12]
//!     → cache hit (5 min TTL)? → PreviewTarget
//!     → registry.rs: lookup "/{project}/preview/{branchId}/{app}"
//!         → URL         → PreviewTarget (https, port 443)
//!         → not found   → None (404 to the client, never production)
//! ```
//!
//! # Design Decisions
//! - Previews fail closed: registry errors with no cached entry yield a 404
//! - The preview cache is independent of the config snapshot and its TTL

pub mod registry;
pub mod resolver;

pub use registry::{HttpPreviewRegistry, PreviewError, PreviewRegistry, StaticPreviewRegistry};
pub use resolver::{branch_id, PreviewResolver, PreviewTarget};
