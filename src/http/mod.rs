//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → headers.rs (Accept normalization, session ID resolution)
//!     → router.rs (session lookup / bootstrap)
//!     → transport::streamable (per-session handling)
//!     → JSON body or SSE stream to client
//! ```

pub mod headers;
pub mod router;
pub mod server;

pub use headers::{SessionIdHeader, SESSION_ID_HEADER};
pub use router::AppState;
pub use server::HttpServer;
