//! Board, players and turn order for a single Cathedral game.

use super::action::{MoveRejection, MoveSummary, Placement};
use super::pieces::{Orientation, PieceTypeId, shape_of};
use super::placement::{footprint_cells, is_valid_placement};
use super::player::{PLAYER_COLORS, Player};
use super::rules::{Capture, TerritoryStart, has_legal_placement, resolve_territories, select_winner};
use super::types::{Board, PlayerId, Position};
use rand::Rng;
use tracing::{debug, info, instrument, warn};

/// Maximum number of seated players.
pub const MAX_PLAYERS: usize = 2;

/// Game state: board, seated players in turn order, and progress flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// The board.
    pub board: Board,
    /// Seated players; index order is turn order.
    pub players: Vec<Player>,
    /// Whether the first turn has been handed out.
    pub started: bool,
    /// Whether the game is over.
    pub finished: bool,
    /// Winner once finished.
    pub winner: Option<PlayerId>,
    /// Accepted placements so far.
    pub move_count: u32,
    /// When territory resolution begins.
    pub territory_start: TerritoryStart,
}

impl Game {
    /// Creates a game with the cathedral dropped at a random offset in
    /// `[2, 4] x [2, 4]` and a random orientation.
    #[instrument(skip(rng))]
    pub fn new(territory_start: TerritoryStart, rng: &mut impl Rng) -> Self {
        let offset_x = rng.gen_range(2..=4);
        let offset_y = rng.gen_range(2..=4);
        let orientation =
            Orientation::from_quarter_turns(rng.gen_range(0..=3)).unwrap_or_default();

        let mut board = Board::new();
        for (cx, cy) in shape_of(PieceTypeId::CATHEDRAL, orientation).cells() {
            if let Some(field) = board.get_mut(Position::new(offset_x + cx, offset_y + cy)) {
                field.piece = Some(PieceTypeId::CATHEDRAL);
            }
        }
        debug!(offset_x, offset_y, ?orientation, "Cathedral placed");

        Self::with_board(board, territory_start)
    }

    /// Creates a game on a prepared board with no players.
    pub fn with_board(board: Board, territory_start: TerritoryStart) -> Self {
        Self {
            board,
            players: Vec::new(),
            started: false,
            finished: false,
            winner: None,
            move_count: 0,
            territory_start,
        }
    }

    /// Looks up a seated player.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Looks up a seated player mutably.
    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Player holding the turn, if any.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_turn)
    }

    /// Returns true if another player can be seated.
    pub fn has_free_seat(&self) -> bool {
        self.players.len() < MAX_PLAYERS
    }

    /// Seats a new player with the next colour. Returns false when full.
    #[instrument(skip(self))]
    pub fn seat_player(&mut self, id: PlayerId, display_name: String) -> bool {
        if !self.has_free_seat() {
            return false;
        }
        let color = PLAYER_COLORS[self.players.len() % PLAYER_COLORS.len()].to_string();
        self.players.push(Player::new(id, display_name, color));
        true
    }

    /// Hands the first turn to the first seated player.
    ///
    /// Returns false if nobody is seated.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> bool {
        let Some(first) = self.players.first_mut() else {
            return false;
        };
        first.is_turn = true;
        self.started = true;
        info!(first_player = %first.id, "Game started");
        true
    }

    /// Returns whether `player` could make `placement` on the current board.
    pub fn is_valid_placement(&self, placement: &Placement, player: &str) -> bool {
        is_valid_placement(
            &self.board,
            placement.piece,
            placement.position,
            placement.orientation,
            player,
        )
    }

    /// Places a piece for `player_id`, then resolves territory, checks for
    /// the end of the game and passes the turn.
    ///
    /// # Errors
    ///
    /// Returns a [`MoveRejection`] and leaves the game untouched if the game
    /// is not running, the player is unknown or not on turn, the piece is not
    /// in hand, or the piece does not fit.
    #[instrument(skip(self), fields(move_count = self.move_count))]
    pub fn try_place_piece(
        &mut self,
        player_id: &str,
        placement: Placement,
    ) -> Result<MoveSummary, MoveRejection> {
        if !self.started || self.finished {
            return Err(MoveRejection::GameNotActive);
        }
        let player = self
            .player(player_id)
            .ok_or_else(|| MoveRejection::UnknownPlayer(player_id.to_string()))?;
        if !player.is_turn {
            return Err(MoveRejection::NotYourTurn(player_id.to_string()));
        }
        if !player.holds(placement.piece) {
            return Err(MoveRejection::PieceNotInHand(placement.piece));
        }
        let cells = footprint_cells(placement.piece, placement.position, placement.orientation)
            .filter(|_| self.is_valid_placement(&placement, player_id))
            .ok_or(MoveRejection::IllegalPlacement(placement))?;

        for pos in cells {
            if let Some(field) = self.board.get_mut(pos) {
                field.piece = Some(placement.piece);
                field.owner = Some(player_id.to_string());
            }
        }
        if let Some(player) = self.player_mut(player_id) {
            player.take(placement.piece);
        }
        self.move_count += 1;

        let captures = if self.territory_start.applies_at(self.move_count) {
            let captures = self.resolve_territories();
            self.check_win_condition();
            captures
        } else {
            Vec::new()
        };

        self.next_player();

        debug!(board = %self.board, "Board after placement");
        Ok(MoveSummary {
            captures,
            finished: self.finished,
        })
    }

    /// Boolean form of [`Game::try_place_piece`].
    pub fn place_piece(&mut self, player_id: &str, placement: Placement) -> bool {
        match self.try_place_piece(player_id, placement) {
            Ok(_) => true,
            Err(rejection) => {
                warn!(player_id, %rejection, "Placement rejected");
                false
            }
        }
    }

    /// Runs territory capture for every player in turn order and hands
    /// captured piece types back to their owners.
    #[instrument(skip(self))]
    pub fn resolve_territories(&mut self) -> Vec<Capture> {
        let order: Vec<PlayerId> = self.players.iter().map(|p| p.id.clone()).collect();
        let captures = resolve_territories(&mut self.board, &order);

        for capture in &captures {
            let Some(opponent) = capture.opponent.as_deref() else {
                continue;
            };
            if let Some(player) = self.player_mut(opponent) {
                player.hand.extend(capture.returned.iter().copied());
            }
        }
        captures
    }

    /// Ends the game if the player on turn cannot place anything.
    ///
    /// The winner is the player with the smallest remaining footprint.
    #[instrument(skip(self))]
    pub fn check_win_condition(&mut self) {
        let Some(current) = self.current_player() else {
            return;
        };
        if has_legal_placement(&self.board, &current.hand, &current.id) {
            return;
        }
        debug!(player_id = %current.id, "No legal placement left");

        self.winner = select_winner(&self.players);
        self.finished = true;
        info!(winner = ?self.winner, "Game finished");
    }

    /// Passes the turn to the next player in seat order, wrapping around.
    ///
    /// Does nothing if no player holds the turn.
    pub fn next_player(&mut self) {
        let Some(current) = self.players.iter().position(|p| p.is_turn) else {
            return;
        };
        let next = (current + 1) % self.players.len();
        self.players[current].is_turn = false;
        self.players[next].is_turn = true;
    }
}
