//! Protocol subsystem.
//!
//! # Data Flow
//! ```text
//! raw bytes (HTTP body or stdio line)
//!     → jsonrpc.rs (parse, classify request / notification / response)
//!     → engine.rs (dispatch initialize, ping, tools/*, ...)
//!     → JsonRpcResponse values handed back to the transport
//! ```

pub mod engine;
pub mod jsonrpc;

pub use engine::{Engine, ServerInfo, ToolDefinition, ToolError, ToolOutput};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
