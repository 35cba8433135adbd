//! Session storage.
//!
//! Sessions live behind a per-session async mutex. Holding a
//! [`SessionHandle`]'s lock is the exclusion that serializes placements,
//! viewer attach/detach and reaper eviction for that session.

use crate::session::{GameSession, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Shared, lockable session.
pub type SessionHandle = Arc<Mutex<GameSession>>;

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum StoreError {
    /// A session with this id already exists.
    #[display("Session {} already exists", _0)]
    DuplicateId(SessionId),
}

impl std::error::Error for StoreError {}

/// Keyed session storage.
pub trait SessionStore: Send + Sync {
    /// Looks up a session.
    fn get(&self, id: &str) -> Option<SessionHandle>;

    /// Inserts a new session and returns its handle.
    ///
    /// # Errors
    ///
    /// Fails if the id is taken.
    fn put(&self, session: GameSession) -> Result<SessionHandle, StoreError>;

    /// Removes a session, returning its handle if it was present.
    fn delete(&self, id: &str) -> Option<SessionHandle>;

    /// Ids of every stored session at the moment of the call.
    fn list_ids(&self) -> Vec<SessionId>;

    /// Number of stored sessions.
    fn len(&self) -> usize {
        self.list_ids().len()
    }

    /// Returns true if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating session store");
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    #[instrument(skip(self))]
    fn get(&self, id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get(id).cloned();
        if session.is_none() {
            debug!(session_id = id, "Session not found");
        }
        session
    }

    #[instrument(skip(self, session), fields(session_id = %session.id))]
    fn put(&self, session: GameSession) -> Result<SessionHandle, StoreError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(&session.id) {
            warn!("Session already exists");
            return Err(StoreError::DuplicateId(session.id));
        }
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(id, Arc::clone(&handle));
        debug!("Session stored");
        Ok(handle)
    }

    #[instrument(skip(self))]
    fn delete(&self, id: &str) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let removed = sessions.remove(id);
        if removed.is_some() {
            debug!(session_id = id, "Session removed");
        }
        removed
    }

    #[instrument(skip(self))]
    fn list_ids(&self) -> Vec<SessionId> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let ids: Vec<_> = sessions.keys().cloned().collect();
        debug!(count = ids.len(), "Listed sessions");
        ids
    }

    fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::cathedral::{Board, TerritoryStart};
    use chrono::Utc;

    fn session(id: &str) -> GameSession {
        GameSession::with_board(id.into(), Board::new(), TerritoryStart::ThirdMove, Utc::now())
    }

    #[test]
    fn test_put_get_delete() {
        let store = MemorySessionStore::new();
        store.put(session("ABC123")).unwrap();

        assert!(store.get("ABC123").is_some());
        assert_eq!(store.list_ids(), vec!["ABC123".to_string()]);
        assert!(store.delete("ABC123").is_some());
        assert!(store.get("ABC123").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = MemorySessionStore::new();
        store.put(session("DUP")).unwrap();
        assert_eq!(
            store.put(session("DUP")).unwrap_err(),
            StoreError::DuplicateId("DUP".into())
        );
        assert_eq!(store.len(), 1);
    }
}
