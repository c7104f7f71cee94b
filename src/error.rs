//! Error types shared across subsystems.
//!
//! Each error is handled at the boundary nearest its origin:
//! - [`EngineError`] and [`BootstrapError`] stay inside a single handshake
//! - [`SessionError`] and [`TransportError`] stay inside a single session
//! - [`StartupError`] is the only kind allowed to stop the process

use crate::config::loader::ConfigError;

/// Failure while building or mutating a protocol engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("capability '{capability}' failed to register: {reason}")]
    Registration {
        capability: &'static str,
        reason: String,
    },
}

/// Failure while creating a new session for a handshake.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("capability '{capability}' could not be registered")]
    Capability {
        capability: &'static str,
        #[source]
        source: EngineError,
    },
}

/// Failure in the session registry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session '{0}' is already registered")]
    Duplicate(String),

    #[error("server is shutting down")]
    ShuttingDown,
}

/// Failure of a transport (stdio or a single HTTP session).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("session '{0}' is already closed")]
    Closed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Fatal errors raised before the server starts accepting traffic.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
