//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Choose transport → Bind listener / attach stdio → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Close every session → Stop accepting → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Sessions are closed before the listener stops, so open streams end cleanly
//! - A session that fails to close is logged and skipped

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{close_all_sessions, Shutdown, ShutdownReport};
