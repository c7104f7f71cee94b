//! Fitness & nutrition MCP tool server library.
//!
//! Serves the same set of tools over two transports: newline-delimited
//! JSON-RPC on stdio, or streamable HTTP with one isolated engine per
//! session.

// Protocol core
pub mod capabilities;
pub mod protocol;

// Transports and sessions
pub mod http;
pub mod session;
pub mod transport;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
