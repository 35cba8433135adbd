//! Board, field and coordinate types.

use super::pieces::PieceTypeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, externally supplied player identity.
pub type PlayerId = String;

/// Width and height of the board.
pub const BOARD_SIZE: usize = 10;

/// One board cell.
///
/// A cell with a piece is physically covered. A cell with only an owner is
/// empty territory belonging to that player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Piece type covering this cell.
    pub piece: Option<PieceTypeId>,
    /// Player owning this cell.
    pub owner: Option<PlayerId>,
}

impl Field {
    /// Returns true if a tile covers this cell.
    pub fn is_covered(&self) -> bool {
        self.piece.is_some()
    }

    /// Returns true if `player` owns this cell.
    pub fn is_owned_by(&self, player: &str) -> bool {
        self.owner.as_deref() == Some(player)
    }
}

/// Anchor coordinate on the board, `x` is the column and `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

impl Position {
    /// Creates a position without bounds checking.
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Returns true if both coordinates lie on the board.
    pub fn on_board(&self) -> bool {
        self.x < BOARD_SIZE && self.y < BOARD_SIZE
    }

    /// Iterates every board cell in row-major order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE).flat_map(|y| (0..BOARD_SIZE).map(move |x| Position { x, y }))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Fixed 10x10 grid of fields, stored row by row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    fields: [[Field; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// Creates an empty, unowned board.
    pub fn new() -> Self {
        Self {
            fields: std::array::from_fn(|_| std::array::from_fn(|_| Field::default())),
        }
    }

    /// Gets the field at `pos`, or `None` when off the board.
    pub fn get(&self, pos: Position) -> Option<&Field> {
        self.fields.get(pos.y).and_then(|row| row.get(pos.x))
    }

    /// Gets the field at `pos` mutably, or `None` when off the board.
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Field> {
        self.fields.get_mut(pos.y).and_then(|row| row.get_mut(pos.x))
    }

    /// Iterates `(position, field)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Field)> {
        self.fields.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .map(move |(x, field)| (Position { x, y }, field))
        })
    }

    /// Counts cells owned by `player`.
    pub fn owned_count(&self, player: &str) -> usize {
        self.iter().filter(|(_, f)| f.is_owned_by(player)).count()
    }

    /// Returns the positions covered by `piece`.
    pub fn positions_of(&self, piece: PieceTypeId) -> Vec<Position> {
        self.iter()
            .filter(|(_, f)| f.piece == Some(piece))
            .map(|(pos, _)| pos)
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    /// Renders one line per row: piece ids in hex, `+` for owned empty
    /// territory and `.` for free cells.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.fields.iter().enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            for field in row {
                match (field.piece, &field.owner) {
                    (Some(piece), _) => write!(f, "{:x}", piece.get())?,
                    (None, Some(_)) => f.write_str("+")?,
                    (None, None) => f.write_str(".")?,
                }
            }
        }
        Ok(())
    }
}
