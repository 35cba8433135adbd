//! Game sessions: a Cathedral game plus lifecycle timestamps, viewer
//! attachment and versioned snapshots.

use crate::games::cathedral::{
    Board, Game, MoveRejection, MoveSummary, Placement, Player, PlayerId, TerritoryStart,
};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Short, human-typeable session identifier.
pub type SessionId = String;

/// How a connecting viewer was attached to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerRole {
    /// Took a free seat as a new player.
    Joined,
    /// Already seated; marked connected again.
    Reconnected,
    /// Watching only.
    Spectator,
}

/// Lifecycle transition refused by a session.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SessionError {
    /// The game was already started.
    #[display("Game already started")]
    AlreadyStarted,
    /// Nobody is seated yet.
    #[display("No players have joined")]
    NoPlayers,
    /// The game is over.
    #[display("Game is finished")]
    Finished,
}

impl std::error::Error for SessionError {}

/// A game session shared by two players and any number of spectators.
///
/// Every mutation bumps [`GameSession::version`], so snapshots taken after
/// different mutations are always distinguishable and ordered.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Session ID.
    pub id: SessionId,
    /// The game state.
    pub game: Game,
    /// Player who asked for the session, if known.
    pub creator_id: Option<PlayerId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last accepted placement, or of start/creation.
    pub last_move_time: DateTime<Utc>,
    /// Time a viewer last connected.
    pub last_player_activity_time: DateTime<Utc>,
    version: u64,
}

impl GameSession {
    /// Creates a session with a freshly dropped cathedral.
    #[instrument(skip(rng, now))]
    pub fn new(
        id: SessionId,
        creator_id: Option<PlayerId>,
        territory_start: TerritoryStart,
        rng: &mut impl Rng,
        now: DateTime<Utc>,
    ) -> Self {
        info!(session_id = %id, "Creating new game session");
        let mut session = Self::with_game(id, Game::new(territory_start, rng), now);
        session.creator_id = creator_id;
        session
    }

    /// Creates a session around an existing game.
    pub fn with_game(id: SessionId, game: Game, now: DateTime<Utc>) -> Self {
        Self {
            id,
            game,
            creator_id: None,
            created_at: now,
            last_move_time: now,
            last_player_activity_time: now,
            version: 0,
        }
    }

    /// Creates a session on a prepared board.
    pub fn with_board(
        id: SessionId,
        board: Board,
        territory_start: TerritoryStart,
        now: DateTime<Utc>,
    ) -> Self {
        Self::with_game(id, Game::with_board(board, territory_start), now)
    }

    /// Monotonic mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if the game is over.
    pub fn is_finished(&self) -> bool {
        self.game.finished
    }

    /// Returns true if any seated player has an open connection.
    pub fn has_connected_players(&self) -> bool {
        self.game.players.iter().any(|p| p.connected)
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    /// Attaches a viewer: seated players reconnect, newcomers take a free
    /// seat, everyone else spectates.
    #[instrument(skip(self, now), fields(session_id = %self.id))]
    pub fn attach_viewer(
        &mut self,
        viewer_id: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> ViewerRole {
        self.last_player_activity_time = now;
        self.touch();

        if let Some(player) = self.game.player_mut(viewer_id) {
            player.connected = true;
            info!(player_id = viewer_id, name = %player.display_name, "Player reconnected");
            return ViewerRole::Reconnected;
        }

        if self
            .game
            .seat_player(viewer_id.to_string(), display_name.to_string())
        {
            info!(player_id = viewer_id, name = display_name, "Player joined");
            ViewerRole::Joined
        } else {
            info!(viewer_id, "Spectator connected");
            ViewerRole::Spectator
        }
    }

    /// Detaches a viewer. Returns true if it was a seated player, who is
    /// then marked disconnected but keeps the seat.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn detach_viewer(&mut self, viewer_id: &str) -> bool {
        let Some(player) = self.game.player_mut(viewer_id) else {
            debug!(viewer_id, "Spectator disconnected");
            return false;
        };
        player.connected = false;
        info!(player_id = viewer_id, name = %player.display_name, "Player disconnected");
        self.touch();
        true
    }

    /// Starts the game, giving the first seated player the turn.
    ///
    /// # Errors
    ///
    /// Fails if the game is already started or finished, or nobody is seated.
    #[instrument(skip(self, now), fields(session_id = %self.id))]
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.game.finished {
            return Err(SessionError::Finished);
        }
        if self.game.started {
            return Err(SessionError::AlreadyStarted);
        }
        if !self.game.start() {
            warn!("Start requested with no players");
            return Err(SessionError::NoPlayers);
        }
        self.last_move_time = now;
        self.touch();
        Ok(())
    }

    /// Places a piece for `player_id`.
    ///
    /// # Errors
    ///
    /// Returns the [`MoveRejection`] from the game; the session is left
    /// untouched.
    #[instrument(skip(self, now), fields(session_id = %self.id))]
    pub fn try_place_piece(
        &mut self,
        player_id: &str,
        placement: Placement,
        now: DateTime<Utc>,
    ) -> Result<MoveSummary, MoveRejection> {
        let summary = self.game.try_place_piece(player_id, placement)?;
        self.last_move_time = now;
        self.touch();
        info!(
            player_id,
            %placement,
            move_count = self.game.move_count,
            captures = summary.captures.len(),
            finished = summary.finished,
            "Move completed successfully"
        );
        Ok(summary)
    }

    /// Boolean form of [`GameSession::try_place_piece`].
    pub fn place_piece(&mut self, player_id: &str, placement: Placement, now: DateTime<Utc>) -> bool {
        match self.try_place_piece(player_id, placement, now) {
            Ok(_) => true,
            Err(rejection) => {
                warn!(session_id = %self.id, player_id, %rejection, "Invalid move");
                false
            }
        }
    }

    /// Marks the game finished without a winner change.
    pub fn finish(&mut self) {
        if !self.game.finished {
            self.game.finished = true;
            self.touch();
        }
    }

    /// Immutable copy of everything viewers see.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: self.version,
            id: self.id.clone(),
            board: self.game.board.clone(),
            players: self.game.players.clone(),
            started: self.game.started,
            finished: self.game.finished,
            winner: self.game.winner.clone(),
            move_count: self.game.move_count,
            creator_id: self.creator_id.clone(),
            created_at: self.created_at,
            last_move_time: self.last_move_time,
            last_player_activity_time: self.last_player_activity_time,
        }
    }

    /// Short listing entry.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            creator_id: self.creator_id.clone(),
            player_count: self.game.players.len(),
            created_at: self.created_at,
            last_move_time: self.last_move_time,
            last_player_activity_time: self.last_player_activity_time,
            started: self.game.started,
            finished: self.game.finished,
        }
    }
}

/// Versioned, immutable view of a session as pushed to viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SessionSnapshot {
    version: u64,
    id: SessionId,
    board: Board,
    players: Vec<Player>,
    started: bool,
    finished: bool,
    winner: Option<PlayerId>,
    move_count: u32,
    creator_id: Option<PlayerId>,
    created_at: DateTime<Utc>,
    last_move_time: DateTime<Utc>,
    last_player_activity_time: DateTime<Utc>,
}

/// Session listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SessionSummary {
    id: SessionId,
    creator_id: Option<PlayerId>,
    player_count: usize,
    created_at: DateTime<Utc>,
    last_move_time: DateTime<Utc>,
    last_player_activity_time: DateTime<Utc>,
    started: bool,
    finished: bool,
}
