//! Session orchestration: ties the store, the game rules and the broadcast
//! hub together. Every mutation runs under the session's lock and publishes
//! the resulting snapshot before the lock is released, so viewers see
//! snapshots in mutation order.

use crate::broadcast::{BroadcastHub, ConnectionToken, ViewerSink};
use crate::games::cathedral::{MoveRejection, MoveSummary, Placement, PlayerId, TerritoryStart};
use crate::ids::{new_player_id, new_session_id};
use crate::reaper::{ReaperPolicy, SessionReaper};
use crate::session::{
    GameSession, SessionError, SessionId, SessionSnapshot, SessionSummary, ViewerRole,
};
use crate::store::{SessionHandle, SessionStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};

const MAX_ID_ATTEMPTS: usize = 16;

/// Errors surfaced to callers of the service.
#[derive(Debug, derive_more::Display, derive_more::From)]
pub enum ServiceError {
    /// No session with this id.
    #[display("Session {} not found", _0)]
    SessionNotFound(SessionId),

    /// The placement broke a rule.
    #[display("Invalid move: {}", _0)]
    #[from]
    InvalidMove(MoveRejection),

    /// The lifecycle transition is not allowed now.
    #[display("{}", _0)]
    #[from]
    Lifecycle(SessionError),

    /// The store refused the operation.
    #[display("{}", _0)]
    #[from]
    Store(StoreError),
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::SessionNotFound(_) => None,
            ServiceError::InvalidMove(e) => Some(e),
            ServiceError::Lifecycle(e) => Some(e),
            ServiceError::Store(e) => Some(e),
        }
    }
}

/// A registered viewer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// How the viewer was attached.
    pub role: ViewerRole,
    /// Token to pass back on disconnect.
    pub token: ConnectionToken,
}

/// Server health summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Sessions currently stored.
    pub active_games: usize,
    /// Seconds since the service was created.
    pub uptime_secs: i64,
}

/// Game sessions behind a store, with snapshots fanned out to viewers.
#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn SessionStore>,
    hub: Arc<BroadcastHub>,
    territory_start: TerritoryStart,
    started_at: DateTime<Utc>,
}

impl GameService {
    /// Creates a service over `store` and `hub`.
    #[instrument(skip(store, hub))]
    pub fn new(
        store: Arc<dyn SessionStore>,
        hub: Arc<BroadcastHub>,
        territory_start: TerritoryStart,
    ) -> Self {
        info!("Creating game service");
        Self {
            store,
            hub,
            territory_start,
            started_at: Utc::now(),
        }
    }

    /// A reaper sharing this service's store and hub.
    pub fn reaper(&self, policy: ReaperPolicy, period: Duration) -> SessionReaper {
        SessionReaper::new(Arc::clone(&self.store), Arc::clone(&self.hub), policy, period)
    }

    /// Issues a fresh opaque player id.
    pub fn new_player_id(&self) -> PlayerId {
        new_player_id(&mut rand::thread_rng())
    }

    fn handle(&self, session_id: &str) -> Result<SessionHandle, ServiceError> {
        self.store
            .get(session_id)
            .ok_or_else(|| ServiceError::SessionNotFound(session_id.to_string()))
    }

    /// Locks a session, failing if it was evicted while the lock was awaited.
    async fn lock(&self, session_id: &str) -> Result<OwnedMutexGuard<GameSession>, ServiceError> {
        let handle = self.handle(session_id)?;
        let session = Arc::clone(&handle).lock_owned().await;
        match self.store.get(session_id) {
            Some(current) if Arc::ptr_eq(&current, &handle) => Ok(session),
            _ => {
                debug!(session_id, "Session evicted while waiting for its lock");
                Err(ServiceError::SessionNotFound(session_id.to_string()))
            }
        }
    }

    fn publish(&self, session: &GameSession) {
        if let Err(e) = self.hub.publish(&session.snapshot()) {
            warn!(session_id = %session.id, error = %e, "Failed to publish snapshot");
        }
    }

    /// Creates a session with a randomly placed cathedral.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if no free id was found.
    #[instrument(skip(self, now))]
    pub fn create_session(
        &self,
        creator_id: Option<PlayerId>,
        now: DateTime<Utc>,
    ) -> Result<SessionId, ServiceError> {
        let mut rng = rand::thread_rng();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let id = new_session_id(&mut rng);
            let session = GameSession::new(
                id.clone(),
                creator_id.clone(),
                self.territory_start,
                &mut rng,
                now,
            );
            match self.store.put(session) {
                Ok(_) => {
                    info!(session_id = %id, "Game created");
                    return Ok(id);
                }
                Err(e) if attempt < MAX_ID_ATTEMPTS => {
                    debug!(error = %e, "Session id collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Attaches a viewer to a session and pushes the updated snapshot to
    /// everyone watching it, the new viewer included.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SessionNotFound`] for unknown sessions.
    #[instrument(skip(self, sink, now))]
    pub async fn connect(
        &self,
        session_id: &str,
        viewer_id: &str,
        display_name: &str,
        sink: Arc<dyn ViewerSink>,
        now: DateTime<Utc>,
    ) -> Result<Connection, ServiceError> {
        let mut session = self.lock(session_id).await?;

        let role = session.attach_viewer(viewer_id, display_name, now);
        let token = self.hub.attach(session_id, viewer_id, sink);
        self.publish(&session);

        Ok(Connection { role, token })
    }

    /// Detaches a viewer connection. Players keep their seat but are marked
    /// disconnected. Stale tokens and evicted sessions are ignored.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, session_id: &str, viewer_id: &str, token: ConnectionToken) {
        let Ok(mut session) = self.lock(session_id).await else {
            self.hub.detach(session_id, viewer_id, token);
            return;
        };
        if !self.hub.detach(session_id, viewer_id, token) {
            return;
        }
        if session.detach_viewer(viewer_id) {
            self.publish(&session);
        }
    }

    /// Starts a session's game.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SessionNotFound`] or the lifecycle error.
    #[instrument(skip(self, now))]
    pub async fn start_game(&self, session_id: &str, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let mut session = self.lock(session_id).await?;
        session.start(now)?;
        self.publish(&session);
        Ok(())
    }

    /// Places a piece and publishes the result.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SessionNotFound`] for unknown sessions and
    /// [`ServiceError::InvalidMove`] for rule violations.
    #[instrument(skip(self, now))]
    pub async fn place_piece(
        &self,
        session_id: &str,
        player_id: &str,
        placement: Placement,
        now: DateTime<Utc>,
    ) -> Result<MoveSummary, ServiceError> {
        let mut session = self.lock(session_id).await?;
        let summary = session.try_place_piece(player_id, placement, now).map_err(|rejection| {
            warn!(player_id, %rejection, "Invalid move");
            rejection
        })?;
        self.publish(&session);
        Ok(summary)
    }

    /// Current snapshot of a session.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::SessionNotFound`] for unknown sessions.
    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, ServiceError> {
        Ok(self.lock(session_id).await?.snapshot())
    }

    /// Summaries of every stored session.
    #[instrument(skip(self))]
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries = Vec::new();
        for id in self.store.list_ids() {
            if let Some(handle) = self.store.get(&id) {
                summaries.push(handle.lock().await.summary());
            }
        }
        summaries.sort_by(|a, b| a.created_at().cmp(b.created_at()));
        summaries
    }

    /// Health summary.
    pub fn status(&self, now: DateTime<Utc>) -> ServerStatus {
        ServerStatus {
            active_games: self.store.len(),
            uptime_secs: (now - self.started_at).num_seconds(),
        }
    }
}
