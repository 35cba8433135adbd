//! Cathedral library - board game rules and a live multiplayer server
//!
//! # Architecture
//!
//! - **Games**: Cathedral rules (pieces, placement, territory capture, winner)
//! - **Session**: One game plus lifecycle timestamps and versioned snapshots
//! - **Store**: Per-session locking over keyed storage
//! - **Broadcast**: Fan-out of serialized snapshots to viewer connections
//! - **Reaper**: Periodic eviction of idle, abandoned and finished sessions
//! - **Server**: axum routes and Server-Sent Events streams
//!
//! # Example
//!
//! ```no_run
//! use cathedral::{BroadcastHub, GameService, MemorySessionStore, TerritoryStart, router};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let service = Arc::new(GameService::new(
//!     Arc::new(MemorySessionStore::new()),
//!     Arc::new(BroadcastHub::new()),
//!     TerritoryStart::default(),
//! ));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
//! axum::serve(listener, router(service)).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod broadcast;
mod config;
mod games;
mod ids;
mod reaper;
mod server;
mod service;
mod session;
mod store;

// Crate-level exports - Game rules
pub use games::cathedral::{
    BOARD_SIZE, Board, Capture, Field, Game, MAX_PLAYERS, MoveRejection, MoveSummary, Orientation,
    PIECE_COUNT, PLAYER_COLORS, PieceShape, PieceTypeId, Placement, Player, PlayerId, Position,
    TerritoryStart, catalog, footprint_cells, has_legal_placement, is_valid_placement,
    resolve_territories, rotate_clockwise, select_winner, shape_of,
};

// Crate-level exports - Sessions and storage
pub use session::{
    GameSession, SessionError, SessionId, SessionSnapshot, SessionSummary, ViewerRole,
};
pub use store::{MemorySessionStore, SessionHandle, SessionStore, StoreError};

// Crate-level exports - Broadcast
pub use broadcast::{
    BroadcastError, BroadcastHub, ChannelSink, ConnectionToken, Frame, SinkEvent, ViewerId,
    ViewerSink,
};

// Crate-level exports - Lifecycle
pub use reaper::{EvictionReason, ReaperPolicy, SessionReaper, SweepReport};

// Crate-level exports - Service and server
pub use config::{ConfigError, ServerConfig};
pub use ids::{SESSION_ID_ALPHABET, SESSION_ID_LEN, new_player_id, new_session_id};
pub use server::{CreateQuery, PlayerQuery, StreamQuery, router};
pub use service::{Connection, GameService, ServerStatus, ServiceError};
