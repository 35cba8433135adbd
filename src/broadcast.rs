//! Fan-out of session snapshots to viewer connections.
//!
//! Each snapshot is serialized once into a [`Frame`] and handed whole to
//! every registered [`ViewerSink`]. Sinks never block: the channel sink
//! queues the frame for the connection's own writer task, so a frame is
//! either delivered in one piece or not at all.

use crate::session::{SessionId, SessionSnapshot};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Viewer identity; the player id for players, any opaque id for spectators.
pub type ViewerId = String;

/// Errors raised while publishing.
#[derive(Debug, derive_more::Display)]
pub enum BroadcastError {
    /// The snapshot could not be serialized.
    #[display("Failed to serialize snapshot: {}", _0)]
    Serialize(serde_json::Error),
    /// The receiving side of a sink is gone.
    #[display("Viewer connection closed")]
    SinkClosed,
}

impl std::error::Error for BroadcastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BroadcastError::Serialize(e) => Some(e),
            BroadcastError::SinkClosed => None,
        }
    }
}

/// One serialized snapshot, shared by every viewer of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    version: u64,
    payload: Arc<str>,
}

impl Frame {
    /// Serializes `snapshot` into a frame.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Serialize`] if JSON encoding fails.
    pub fn encode(snapshot: &SessionSnapshot) -> Result<Self, BroadcastError> {
        let payload = serde_json::to_string(snapshot).map_err(BroadcastError::Serialize)?;
        Ok(Self {
            version: *snapshot.version(),
            payload: payload.into(),
        })
    }

    /// Snapshot version carried by this frame.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// JSON payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Decodes the payload back into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Serialize`] if the payload is not a snapshot.
    pub fn decode(&self) -> Result<SessionSnapshot, BroadcastError> {
        serde_json::from_str(&self.payload).map_err(BroadcastError::Serialize)
    }
}

/// Events delivered to a connection's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// A complete frame to write.
    Frame(Frame),
    /// The session is gone; the writer should end the stream.
    Close,
}

/// Push-only connection to one viewer.
pub trait ViewerSink: Send + Sync + fmt::Debug {
    /// Queues a frame. Must not block.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::SinkClosed`] if the viewer is gone.
    fn push(&self, frame: Frame) -> Result<(), BroadcastError>;

    /// Tells the viewer no further frames will follow.
    fn close(&self);
}

/// Sink backed by an unbounded channel drained by the connection's writer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its writer task drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ViewerSink for ChannelSink {
    fn push(&self, frame: Frame) -> Result<(), BroadcastError> {
        self.tx
            .send(SinkEvent::Frame(frame))
            .map_err(|_| BroadcastError::SinkClosed)
    }

    fn close(&self) {
        // The writer may already be gone.
        let _ = self.tx.send(SinkEvent::Close);
    }
}

/// Identifies one attachment of a viewer, so a stale connection closing
/// cannot detach its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionToken(u64);

#[derive(Debug)]
struct Registration {
    token: ConnectionToken,
    sink: Arc<dyn ViewerSink>,
}

/// Registry of viewer connections per session.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    registry: Mutex<HashMap<SessionId, HashMap<ViewerId, Registration>>>,
    next_token: AtomicU64,
}

impl BroadcastHub {
    /// Creates an empty hub.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating broadcast hub");
        Self::default()
    }

    /// Registers `sink` for `viewer_id`, closing any connection it replaces.
    #[instrument(skip(self, sink))]
    pub fn attach(
        &self,
        session_id: &str,
        viewer_id: &str,
        sink: Arc<dyn ViewerSink>,
    ) -> ConnectionToken {
        let token = ConnectionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = registry
            .entry(session_id.to_string())
            .or_default()
            .insert(viewer_id.to_string(), Registration { token, sink });
        if let Some(previous) = previous {
            debug!("Replacing existing viewer connection");
            previous.sink.close();
        }
        token
    }

    /// Unregisters `viewer_id` if `token` is still its current connection.
    ///
    /// Returns true if a registration was removed.
    #[instrument(skip(self))]
    pub fn detach(&self, session_id: &str, viewer_id: &str, token: ConnectionToken) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(viewers) = registry.get_mut(session_id) else {
            return false;
        };
        if viewers.get(viewer_id).is_none_or(|r| r.token != token) {
            debug!("Stale connection, nothing to detach");
            return false;
        }
        viewers.remove(viewer_id);
        if viewers.is_empty() {
            registry.remove(session_id);
        }
        true
    }

    /// Pushes `snapshot` to every viewer of its session.
    ///
    /// Viewers whose sink rejects the frame are dropped from the registry.
    /// Returns the number of viewers that received it.
    ///
    /// # Errors
    ///
    /// Fails only if the snapshot cannot be serialized.
    #[instrument(skip(self, snapshot), fields(session_id = %snapshot.id(), version = *snapshot.version()))]
    pub fn publish(&self, snapshot: &SessionSnapshot) -> Result<usize, BroadcastError> {
        let frame = Frame::encode(snapshot)?;
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(viewers) = registry.get_mut(snapshot.id().as_str()) else {
            debug!("No viewers to publish to");
            return Ok(0);
        };

        viewers.retain(|viewer_id, registration| match registration.sink.push(frame.clone()) {
            Ok(()) => true,
            Err(e) => {
                warn!(viewer_id = %viewer_id, error = %e, "Dropping dead viewer");
                false
            }
        });
        let delivered = viewers.len();
        if viewers.is_empty() {
            registry.remove(snapshot.id().as_str());
        }
        debug!(delivered, "Snapshot published");
        Ok(delivered)
    }

    /// Closes and forgets every connection of a session.
    #[instrument(skip(self))]
    pub fn close_session(&self, session_id: &str) -> usize {
        let removed = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .unwrap_or_default();
        for registration in removed.values() {
            registration.sink.close();
        }
        removed.len()
    }

    /// Number of viewers registered for a session.
    pub fn viewer_count(&self, session_id: &str) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::cathedral::{Board, TerritoryStart};
    use crate::session::GameSession;
    use chrono::Utc;

    fn snapshot(id: &str) -> SessionSnapshot {
        GameSession::with_board(id.into(), Board::new(), TerritoryStart::ThirdMove, Utc::now())
            .snapshot()
    }

    #[tokio::test]
    async fn test_publish_reaches_every_viewer() {
        let hub = BroadcastHub::new();
        let (a, mut rx_a) = ChannelSink::channel();
        let (b, mut rx_b) = ChannelSink::channel();
        hub.attach("S1", "a", Arc::new(a));
        hub.attach("S1", "b", Arc::new(b));

        assert_eq!(hub.publish(&snapshot("S1")).unwrap(), 2);

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.recv().await {
                Some(SinkEvent::Frame(frame)) => assert_eq!(frame.decode().unwrap().id(), "S1"),
                other => panic!("expected frame, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_dead_viewer_dropped() {
        let hub = BroadcastHub::new();
        let (sink, rx) = ChannelSink::channel();
        hub.attach("S1", "a", Arc::new(sink));
        drop(rx);

        assert_eq!(hub.publish(&snapshot("S1")).unwrap(), 0);
        assert_eq!(hub.viewer_count("S1"), 0);
    }

    #[tokio::test]
    async fn test_stale_token_does_not_detach_replacement() {
        let hub = BroadcastHub::new();
        let (first, mut first_rx) = ChannelSink::channel();
        let (second, _second_rx) = ChannelSink::channel();
        let old = hub.attach("S1", "a", Arc::new(first));
        let new = hub.attach("S1", "a", Arc::new(second));

        assert_eq!(first_rx.recv().await, Some(SinkEvent::Close));
        assert!(!hub.detach("S1", "a", old));
        assert_eq!(hub.viewer_count("S1"), 1);
        assert!(hub.detach("S1", "a", new));
        assert_eq!(hub.viewer_count("S1"), 0);
    }

    #[tokio::test]
    async fn test_close_session_closes_sinks() {
        let hub = BroadcastHub::new();
        let (sink, mut rx) = ChannelSink::channel();
        hub.attach("S1", "a", Arc::new(sink));

        assert_eq!(hub.close_session("S1"), 1);
        assert_eq!(rx.recv().await, Some(SinkEvent::Close));
        assert_eq!(hub.viewer_count("S1"), 0);
    }
}
