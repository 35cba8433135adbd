//! Placement requests and their rejections.

use super::pieces::{Orientation, PieceTypeId};
use super::rules::Capture;
use super::types::{PlayerId, Position};
use derive_new::new;
use serde::{Deserialize, Serialize};

/// A request to put a piece on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
pub struct Placement {
    /// Piece type to place.
    #[serde(rename = "piece_id")]
    pub piece: PieceTypeId,
    /// Anchor cell; the shape is centred one cell up and left of its origin.
    pub position: Position,
    /// Quarter turns clockwise.
    #[serde(default)]
    pub orientation: Orientation,
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "piece {} at {} turned {}",
            self.piece,
            self.position,
            self.orientation.quarter_turns()
        )
    }
}

/// Why a placement was refused. A rejected placement never mutates the game.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum MoveRejection {
    /// The game has not started or is already over.
    #[display("Game is not in progress")]
    GameNotActive,

    /// The acting id is not a participant.
    #[display("Player {} is not in this game", _0)]
    UnknownPlayer(PlayerId),

    /// The acting player does not hold the turn.
    #[display("It's not {}'s turn", _0)]
    NotYourTurn(PlayerId),

    /// The piece type is not in the acting player's hand.
    #[display("Piece {} is not in hand", _0)]
    PieceNotInHand(PieceTypeId),

    /// The piece does not fit on the board there.
    #[display("Illegal placement: {}", _0)]
    IllegalPlacement(Placement),
}

impl std::error::Error for MoveRejection {}

/// What an accepted placement did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSummary {
    /// Captures applied after the placement, in resolution order.
    pub captures: Vec<Capture>,
    /// Whether the placement ended the game.
    pub finished: bool,
}
