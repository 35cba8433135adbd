//! Placement legality.

use super::pieces::{Orientation, PieceTypeId, shape_of};
use super::types::{BOARD_SIZE, Board, Position};
use tracing::instrument;

/// Absolute cells a piece would cover when anchored at `anchor`.
///
/// The shape is centred on the anchor: shape cell `(cx, cy)` lands on
/// `(x + cx - 1, y + cy - 1)`. Returns `None` if the anchor is off the board
/// or any covered cell falls outside it.
pub fn footprint_cells(
    piece: PieceTypeId,
    anchor: Position,
    orientation: Orientation,
) -> Option<Vec<Position>> {
    if !anchor.on_board() {
        return None;
    }
    shape_of(piece, orientation)
        .cells()
        .map(|(cx, cy)| {
            let x = (anchor.x + cx).checked_sub(1)?;
            let y = (anchor.y + cy).checked_sub(1)?;
            (x < BOARD_SIZE && y < BOARD_SIZE).then_some(Position { x, y })
        })
        .collect()
}

/// Returns whether `player` may place `piece` at `anchor` in `orientation`.
///
/// Every covered cell must be on the board, free of tiles, and either
/// unowned or owned by `player`.
#[instrument(level = "trace", skip(board))]
pub fn is_valid_placement(
    board: &Board,
    piece: PieceTypeId,
    anchor: Position,
    orientation: Orientation,
    player: &str,
) -> bool {
    let Some(cells) = footprint_cells(piece, anchor, orientation) else {
        return false;
    };
    cells.into_iter().all(|pos| match board.get(pos) {
        Some(field) => {
            !field.is_covered() && field.owner.as_deref().is_none_or(|owner| owner == player)
        }
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::cathedral::types::Field;

    fn piece(id: u8) -> PieceTypeId {
        PieceTypeId::new(id).unwrap()
    }

    #[test]
    fn test_single_cell_piece_centred_on_anchor() {
        let cells = footprint_cells(piece(1), Position::new(0, 0), Orientation::Up).unwrap();
        assert_eq!(cells, vec![Position::new(0, 0)]);
    }

    #[test]
    fn test_shape_needing_left_column_rejected_at_corner() {
        // Piece 2 covers (0,0) of its matrix, so the anchor needs x-1 and y-1.
        let board = Board::new();
        assert!(!is_valid_placement(&board, piece(2), Position::new(0, 0), Orientation::Up, "a"));
        assert!(is_valid_placement(&board, piece(2), Position::new(1, 1), Orientation::Up, "a"));
    }

    #[test]
    fn test_anchor_off_board_rejected() {
        let board = Board::new();
        assert!(!is_valid_placement(&board, piece(1), Position::new(10, 3), Orientation::Up, "a"));
    }

    #[test]
    fn test_occupied_cell_rejected() {
        let mut board = Board::new();
        *board.get_mut(Position::new(5, 5)).unwrap() = Field {
            piece: Some(piece(4)),
            owner: Some("a".into()),
        };
        assert!(!is_valid_placement(&board, piece(1), Position::new(5, 5), Orientation::Up, "a"));
    }

    #[test]
    fn test_own_territory_allowed_opponent_territory_rejected() {
        let mut board = Board::new();
        board.get_mut(Position::new(5, 5)).unwrap().owner = Some("a".into());
        assert!(is_valid_placement(&board, piece(1), Position::new(5, 5), Orientation::Up, "a"));
        assert!(!is_valid_placement(&board, piece(1), Position::new(5, 5), Orientation::Up, "b"));
    }
}
