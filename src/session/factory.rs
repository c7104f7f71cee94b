//! Builds a fresh engine and transport for every handshake.
//!
//! # Responsibilities
//! - Run every capability's `register` against a new engine, in order
//! - Attach a fresh session ID and the configured reply mode
//! - Wire the transport's lifecycle events to the observer (the registry)
//!
//! Nothing is shared between sessions except the capability list itself.

use std::sync::Arc;

use uuid::Uuid;

use crate::capabilities::Capability;
use crate::error::BootstrapError;
use crate::observability::metrics;
use crate::protocol::engine::{Engine, ServerInfo};
use crate::transport::streamable::{ResponseMode, SessionObserver, SessionTransport};

#[derive(Clone)]
pub struct TransportFactory {
    capabilities: Arc<[Arc<dyn Capability>]>,
    server_info: ServerInfo,
    mode: ResponseMode,
    observer: Arc<dyn SessionObserver>,
}

impl TransportFactory {
    pub fn new(
        capabilities: Vec<Arc<dyn Capability>>,
        server_info: ServerInfo,
        mode: ResponseMode,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            capabilities: capabilities.into(),
            server_info,
            mode,
            observer,
        }
    }

    /// A new engine with every capability registered.
    pub async fn build_engine(&self) -> Result<Engine, BootstrapError> {
        build_engine(&self.capabilities, self.server_info.clone()).await
    }

    /// A new, not yet established, session transport.
    pub async fn create(&self) -> Result<Arc<SessionTransport>, BootstrapError> {
        let engine = self.build_engine().await?;
        let session_id = Uuid::new_v4().to_string();
        tracing::debug!(session_id = %session_id, tools = engine.tool_count(), "Session bootstrapped");
        Ok(Arc::new(SessionTransport::new(
            session_id,
            engine,
            self.mode,
            Arc::clone(&self.observer),
        )))
    }
}

/// Register `capabilities` into a new engine, stopping at the first failure.
pub async fn build_engine(
    capabilities: &[Arc<dyn Capability>],
    server_info: ServerInfo,
) -> Result<Engine, BootstrapError> {
    let mut engine = Engine::new(server_info);
    for capability in capabilities {
        if let Err(source) = capability.register(&mut engine).await {
            metrics::record_bootstrap_failure(capability.name());
            tracing::error!(capability = capability.name(), error = %source, "Capability registration failed");
            return Err(BootstrapError::Capability {
                capability: capability.name(),
                source,
            });
        }
    }
    Ok(engine)
}
