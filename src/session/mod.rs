//! Session management subsystem.
//!
//! # Data Flow
//! ```text
//! initialize POST without session ID
//!     → factory.rs (new engine + capabilities + transport)
//!     → transport fires "established"
//!     → registry.rs (insert)
//!
//! DELETE / shutdown
//!     → transport fires "closed"
//!     → registry.rs (remove)
//! ```

pub mod factory;
pub mod registry;

pub use factory::TransportFactory;
pub use registry::SessionRegistry;
