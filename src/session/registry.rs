//! Concurrent map of live sessions.
//!
//! # Responsibilities
//! - Store one transport per session ID
//! - Serve lookups from concurrent request handlers
//! - Enroll sessions on "established" and drop them on "closed"
//!
//! Lookups return a cloned `Arc` so no shard lock is held across an await.
//! Once shutdown begins no further session can be enrolled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};

use crate::error::SessionError;
use crate::observability::metrics;
use crate::transport::streamable::{SessionObserver, SessionTransport};

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, Arc<SessionTransport>>>,
    closing: Arc<AtomicBool>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a transport. Fails if the ID is already present.
    pub fn insert(&self, session_id: &str, transport: Arc<SessionTransport>) -> Result<(), SessionError> {
        match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(_) => Err(SessionError::Duplicate(session_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(transport);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, session_id: &str) -> Option<Arc<SessionTransport>> {
        self.sessions.get(session_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a session. Removing an absent ID is a no-op.
    pub fn remove(&self, session_id: &str) -> Option<Arc<SessionTransport>> {
        self.sessions.remove(session_id).map(|(_, transport)| transport)
    }

    /// Snapshot of the IDs registered right now.
    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Refuse new enrollments from now on. Call before snapshotting [`ids`](Self::ids).
    pub fn begin_shutdown(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

impl SessionObserver for SessionRegistry {
    fn session_established(&self, transport: &Arc<SessionTransport>) -> Result<(), SessionError> {
        if self.is_closing() {
            return Err(SessionError::ShuttingDown);
        }
        self.insert(transport.session_id(), Arc::clone(transport))?;
        // Shutdown may have snapshotted the map between the check and the insert.
        if self.is_closing() {
            self.remove(transport.session_id());
            return Err(SessionError::ShuttingDown);
        }
        metrics::record_session_created();
        metrics::set_active_sessions(self.len());
        tracing::debug!(session_id = %transport.session_id(), active = self.len(), "Session registered");
        Ok(())
    }

    fn session_closed(&self, session_id: &str) {
        if self.remove(session_id).is_some() {
            metrics::record_session_closed();
            metrics::set_active_sessions(self.len());
            tracing::debug!(session_id = %session_id, active = self.len(), "Session unregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::engine::{Engine, ServerInfo};
    use crate::transport::streamable::ResponseMode;

    fn transport(id: &str, registry: &SessionRegistry) -> Arc<SessionTransport> {
        let engine = Engine::new(ServerInfo {
            name: "test".into(),
            version: "0".into(),
        });
        Arc::new(SessionTransport::new(
            id.to_string(),
            engine,
            ResponseMode::Json,
            Arc::new(registry.clone()),
        ))
    }

    #[test]
    fn test_insert_lookup_remove() {
        let registry = SessionRegistry::new();
        let t = transport("a", &registry);

        registry.insert("a", t.clone()).unwrap();
        assert!(Arc::ptr_eq(&registry.lookup("a").unwrap(), &t));
        assert!(registry.lookup("b").is_none());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let registry = SessionRegistry::new();
        registry.insert("a", transport("a", &registry)).unwrap();

        let err = registry.insert("a", transport("a", &registry)).unwrap_err();
        assert!(matches!(err, SessionError::Duplicate(id) if id == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_observer_events_drive_membership() {
        let registry = SessionRegistry::new();
        let t = transport("s1", &registry);

        registry.session_established(&t).unwrap();
        assert_eq!(registry.ids(), vec!["s1".to_string()]);

        t.close().unwrap();
        assert!(registry.lookup("s1").is_none());

        registry.session_closed("s1");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_no_enrollment_after_shutdown_begins() {
        let registry = SessionRegistry::new();
        registry.begin_shutdown();
        assert!(registry.is_closing());

        let t = transport("late", &registry);
        let err = registry.session_established(&t).unwrap_err();
        assert!(matches!(err, SessionError::ShuttingDown));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_inserts() {
        let registry = SessionRegistry::new();
        std::thread::scope(|scope| {
            for n in 0..8 {
                let registry = registry.clone();
                scope.spawn(move || {
                    for i in 0..50 {
                        let id = format!("{n}-{i}");
                        let t = transport(&id, &registry);
                        registry.insert(&id, t).unwrap();
                    }
                });
            }
        });
        assert_eq!(registry.len(), 400);
    }
}
