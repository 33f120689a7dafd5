//! SessionRegistry: the shared map of connected sessions
//!
//! Every read and write goes through one lock, so "who is connected" and "who
//! is talking to whom" are always observed consistently. Callers never hold a
//! session across an await; they get clones or ask the registry to mutate.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::RoutingError;
use crate::protocol::Message;

use super::state::{Session, SessionId, Transport};

struct Inner {
    sessions: BTreeMap<SessionId, Session>,
    next_id: u64,
}

/// Tracks connected sessions
///
/// SessionRegistry provides:
/// - Sequential ID assignment starting at 1, never reused
/// - Lookup, listing in ID order, and removal
/// - Registry-mediated updates of activity and pairing state
/// - Bulk eviction of idle sessions
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                sessions: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Register a new session for `transport`
    ///
    /// Returns the assigned ID.
    pub async fn register(&self, transport: Transport) -> SessionId {
        let mut inner = self.inner.write().await;
        let id = SessionId::new(inner.next_id);
        inner.next_id += 1;
        inner.sessions.insert(id, Session::new(id, transport));
        id
    }

    /// Register a new session and queue its ID assignment notice
    ///
    /// The notice is queued before the session becomes visible to other
    /// callers, so it is always the first message in the outbox.
    pub async fn admit(&self, transport: Transport) -> SessionId {
        let mut inner = self.inner.write().await;
        let id = SessionId::new(inner.next_id);
        inner.next_id += 1;
        if let Err(e) = transport.deliver(Message::id_assignment(id)) {
            warn!(session_id = %id, error = %e, "Failed to queue ID assignment");
        }
        inner.sessions.insert(id, Session::new(id, transport));
        id
    }

    /// Remove a session and close its transport
    ///
    /// Returns the removed session, or None if it was already gone. Only the
    /// first caller for a given ID observes Some.
    pub async fn remove(&self, id: SessionId) -> Option<Session> {
        let removed = self.inner.write().await.sessions.remove(&id);
        if let Some(session) = &removed {
            session.transport().close();
        }
        removed
    }

    /// Get a snapshot of a session by ID
    pub async fn find(&self, id: SessionId) -> Option<Session> {
        self.inner.read().await.sessions.get(&id).cloned()
    }

    /// Whether a session with this ID is registered
    pub async fn contains(&self, id: SessionId) -> bool {
        self.inner.read().await.sessions.contains_key(&id)
    }

    /// Get the transport of a session
    pub async fn transport(&self, id: SessionId) -> Option<Transport> {
        self.inner
            .read()
            .await
            .sessions
            .get(&id)
            .map(|s| s.transport().clone())
    }

    /// All sessions, ordered by ID
    pub async fn snapshot(&self) -> Vec<Session> {
        self.inner.read().await.sessions.values().cloned().collect()
    }

    /// Record activity for a session
    ///
    /// Returns false if the session is no longer registered.
    pub async fn touch(&self, id: SessionId) -> bool {
        let now = Instant::now();
        match self.inner.write().await.sessions.get_mut(&id) {
            Some(session) => {
                session.touch(now);
                true
            }
            None => false,
        }
    }

    /// Current peer of a session
    pub async fn peer_of(&self, id: SessionId) -> Option<SessionId> {
        self.inner
            .read()
            .await
            .sessions
            .get(&id)
            .and_then(|s| s.peer())
    }

    /// Set or clear a session's peer without checking the target
    ///
    /// Returns false if the session is no longer registered.
    pub async fn set_peer(&self, id: SessionId, peer: Option<SessionId>) -> bool {
        match self.inner.write().await.sessions.get_mut(&id) {
            Some(session) => {
                session.set_peer(peer);
                true
            }
            None => false,
        }
    }

    /// Pair `id` with `target` if the target is registered
    ///
    /// The existence check and the update happen under the same lock. Pairing
    /// is one-directional: the target's own peer is left untouched.
    pub async fn connect(&self, id: SessionId, target: SessionId) -> Result<(), RoutingError> {
        let mut inner = self.inner.write().await;
        if !inner.sessions.contains_key(&target) {
            return Err(RoutingError::SessionNotFound(target));
        }
        let session = inner
            .sessions
            .get_mut(&id)
            .ok_or(RoutingError::SessionNotFound(id))?;
        session.set_peer(Some(target));
        Ok(())
    }

    /// Set a session's display name
    ///
    /// Returns false if the session is no longer registered.
    pub async fn set_display_name(&self, id: SessionId, name: Option<String>) -> bool {
        match self.inner.write().await.sessions.get_mut(&id) {
            Some(session) => {
                session.set_display_name(name);
                true
            }
            None => false,
        }
    }

    /// Remove and close every session with no activity for longer than `timeout`
    ///
    /// Returns the evicted sessions.
    pub async fn evict_idle(&self, now: Instant, timeout: Duration) -> Vec<Session> {
        let mut inner = self.inner.write().await;
        let expired: Vec<SessionId> = inner
            .sessions
            .values()
            .filter(|s| s.is_idle_beyond(now, timeout))
            .map(|s| s.id())
            .collect();

        let mut evicted = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(session) = inner.sessions.remove(&id) {
                session.transport().close();
                debug!(session_id = %id, "Evicted idle session");
                evicted.push(session);
            }
        }
        evicted
    }

    /// Get the number of registered sessions
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
