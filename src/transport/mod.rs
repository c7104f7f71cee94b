//! Transports carrying JSON-RPC between clients and an engine.
//!
//! # Data Flow
//! ```text
//! stdio mode:
//!     stdin line → stdio.rs → engine → stdout line
//!
//! http mode:
//!     router → streamable.rs (one SessionTransport per session) → engine
//!                                 │
//!                                 └─ JSON body or SSE stream back to the client
//! ```

pub mod stdio;
pub mod streamable;

pub use streamable::{ResponseMode, SessionObserver, SessionTransport};
