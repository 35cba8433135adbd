//! Cathedral: a two-player territorial tile-placement game.

mod action;
mod game;
mod pieces;
mod placement;
mod player;
mod rules;
mod types;

pub use action::{MoveRejection, MoveSummary, Placement};
pub use game::{Game, MAX_PLAYERS};
pub use pieces::{Orientation, PIECE_COUNT, PieceShape, PieceTypeId, catalog, rotate_clockwise, shape_of};
pub use placement::{footprint_cells, is_valid_placement};
pub use player::{PLAYER_COLORS, Player};
pub use rules::{Capture, TerritoryStart, has_legal_placement, resolve_territories, select_winner};
pub use types::{BOARD_SIZE, Board, Field, PlayerId, Position};
