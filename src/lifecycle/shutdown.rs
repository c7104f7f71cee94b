//! Shutdown coordination.

use tokio::sync::broadcast;

use crate::session::SessionRegistry;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of [`close_all_sessions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    pub attempted: usize,
    pub failed: usize,
}

/// Close every registered session. Individual failures are logged and skipped.
///
/// The registry stops accepting new sessions first, so a handshake still in
/// flight cannot slip in after the snapshot.
pub fn close_all_sessions(registry: &SessionRegistry) -> ShutdownReport {
    registry.begin_shutdown();
    let ids = registry.ids();
    let mut report = ShutdownReport::default();
    tracing::info!(sessions = ids.len(), "Closing sessions");

    for id in ids {
        let Some(transport) = registry.lookup(&id) else {
            continue;
        };
        report.attempted += 1;
        if let Err(e) = transport.close() {
            report.failed += 1;
            tracing::warn!(session_id = %id, error = %e, "Failed to close session");
        }
        // A transport that was already closed may still be listed.
        registry.remove(&id);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::default_capabilities;
    use crate::error::SessionError;
    use crate::protocol::engine::{Engine, ServerInfo};
    use crate::session::TransportFactory;
    use crate::transport::{ResponseMode, SessionObserver, SessionTransport};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Registry wrapper counting "closed" events per session.
    #[derive(Default)]
    struct CountingRegistry {
        registry: SessionRegistry,
        closes: Mutex<HashMap<String, usize>>,
    }

    impl SessionObserver for CountingRegistry {
        fn session_established(&self, transport: &Arc<SessionTransport>) -> Result<(), SessionError> {
            self.registry.session_established(transport)
        }

        fn session_closed(&self, session_id: &str) {
            *self.closes.lock().unwrap().entry(session_id.to_string()).or_default() += 1;
            self.registry.session_closed(session_id);
        }
    }

    fn info() -> ServerInfo {
        ServerInfo {
            name: "test".into(),
            version: "0".into(),
        }
    }

    #[tokio::test]
    async fn test_each_session_closed_exactly_once() {
        let observer = Arc::new(CountingRegistry::default());
        let factory = TransportFactory::new(default_capabilities(), info(), ResponseMode::Json, observer.clone());

        for _ in 0..5 {
            let transport = factory.create().await.unwrap();
            observer.session_established(&transport).unwrap();
        }
        assert_eq!(observer.registry.len(), 5);

        let report = close_all_sessions(&observer.registry);
        assert_eq!(report, ShutdownReport { attempted: 5, failed: 0 });
        assert!(observer.registry.is_empty());

        let closes = observer.closes.lock().unwrap();
        assert_eq!(closes.len(), 5);
        assert!(closes.values().all(|count| *count == 1));
    }

    #[test]
    fn test_failed_close_is_skipped() {
        let registry = SessionRegistry::new();
        let transport = Arc::new(SessionTransport::new(
            "stale".into(),
            Engine::new(info()),
            ResponseMode::Json,
            Arc::new(SessionRegistry::new()),
        ));
        transport.close().unwrap();
        registry.insert("stale", transport).unwrap();

        let report = close_all_sessions(&registry);
        assert_eq!(report, ShutdownReport { attempted: 1, failed: 1 });
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_handshake_after_close_all_is_refused() {
        let registry = SessionRegistry::new();
        let factory = TransportFactory::new(default_capabilities(), info(), ResponseMode::Json, Arc::new(registry.clone()));
        let pending = factory.create().await.unwrap();

        let report = close_all_sessions(&registry);
        assert_eq!(report, ShutdownReport::default());

        let mut headers = axum::http::HeaderMap::new();
        headers.insert(axum::http::header::ACCEPT, "application/json, text/event-stream".parse().unwrap());
        headers.insert(axum::http::header::CONTENT_TYPE, "application/json".parse().unwrap());
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "late", "version": "1"}
            },
            "id": 0
        });
        let response = pending.handle_post(&headers, body.to_string().into()).await;

        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        shutdown.trigger();
        assert!(rx.recv().await.is_ok());
    }
}
