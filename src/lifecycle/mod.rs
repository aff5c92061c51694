//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Settings → Store → ConfigCache → PreviewResolver → EdgeRouter → warm
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → servers drain → eviction task exits → cache teardown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: settings first, then core, then listeners
//! - Ordered shutdown: stop accept, drain, release cached state

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::spawn_signal_handler;
pub use startup::{AppContext, StartupError};
