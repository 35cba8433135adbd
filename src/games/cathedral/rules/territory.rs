//! Territory capture.
//!
//! For each player in turn order, every maximal 8-connected region of cells
//! the player does not own is classified by how many board edges it touches.
//! Regions touching three or more edges are open; the rest are enclosed and
//! become the player's territory, returning any captured piece types to the
//! opponent. If the enclosed cells hold two or more distinct piece types the
//! capture is void for that pass.

use super::super::pieces::PieceTypeId;
use super::super::types::{BOARD_SIZE, Board, PlayerId, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

/// A capture applied to the board during one player's pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    /// Player who gained the territory.
    pub captor: PlayerId,
    /// Player who receives the captured piece types, if any.
    pub opponent: Option<PlayerId>,
    /// Cells that changed owner.
    pub cells: Vec<Position>,
    /// Piece types to hand back to the opponent.
    pub returned: Vec<PieceTypeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Owned,
    Unvisited,
    Enclosed,
    Open,
}

type Marks = [[Mark; BOARD_SIZE]; BOARD_SIZE];

/// Resolves territory for every player in `players`, in order.
///
/// Each pass sees the board as left by the previous one. Hand returns are
/// reported, not applied; the caller owns the players.
#[instrument(skip_all, fields(players = players.len()))]
pub fn resolve_territories(board: &mut Board, players: &[PlayerId]) -> Vec<Capture> {
    players
        .iter()
        .filter_map(|captor| {
            let opponent = players.iter().find(|p| *p != captor).cloned();
            resolve_for(board, captor, opponent)
        })
        .collect()
}

fn resolve_for(board: &mut Board, captor: &PlayerId, opponent: Option<PlayerId>) -> Option<Capture> {
    let marks = classify(board, captor);

    let enclosed: Vec<Position> = Position::all()
        .filter(|pos| marks[pos.y][pos.x] == Mark::Enclosed)
        .collect();
    if enclosed.is_empty() {
        return None;
    }

    let captured_types: BTreeSet<PieceTypeId> = enclosed
        .iter()
        .filter_map(|pos| board.get(*pos).and_then(|field| field.piece))
        .collect();

    if captured_types.len() >= 2 {
        debug!(
            captor = %captor,
            types = ?captured_types,
            "Enclosed area holds several piece types, capture void"
        );
        return None;
    }

    for pos in &enclosed {
        if let Some(field) = board.get_mut(*pos) {
            field.piece = None;
            field.owner = Some(captor.clone());
        }
    }

    let returned: Vec<PieceTypeId> = captured_types.into_iter().collect();

    info!(
        captor = %captor,
        cells = enclosed.len(),
        returned = ?returned,
        "Territory captured"
    );

    Some(Capture {
        captor: captor.clone(),
        opponent,
        cells: enclosed,
        returned,
    })
}

fn classify(board: &Board, captor: &str) -> Marks {
    let mut marks = [[Mark::Unvisited; BOARD_SIZE]; BOARD_SIZE];
    for (pos, field) in board.iter() {
        if field.is_owned_by(captor) {
            marks[pos.y][pos.x] = Mark::Owned;
        }
    }

    for seed in Position::all() {
        if marks[seed.y][seed.x] != Mark::Unvisited {
            continue;
        }
        let region = flood_region(&marks, seed);
        let mark = if touched_edges(&region) >= 3 {
            Mark::Open
        } else {
            Mark::Enclosed
        };
        for pos in region {
            marks[pos.y][pos.x] = mark;
        }
    }
    marks
}

/// Collects the 8-connected region of unvisited cells containing `seed`.
fn flood_region(marks: &Marks, seed: Position) -> Vec<Position> {
    let mut seen = [[false; BOARD_SIZE]; BOARD_SIZE];
    let mut stack = vec![seed];
    let mut region = Vec::new();
    seen[seed.y][seed.x] = true;

    while let Some(pos) = stack.pop() {
        region.push(pos);
        for (dx, dy) in NEIGHBOURS {
            let (Some(x), Some(y)) = (pos.x.checked_add_signed(dx), pos.y.checked_add_signed(dy))
            else {
                continue;
            };
            if x >= BOARD_SIZE || y >= BOARD_SIZE || seen[y][x] {
                continue;
            }
            if marks[y][x] == Mark::Unvisited {
                seen[y][x] = true;
                stack.push(Position { x, y });
            }
        }
    }
    region
}

const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Number of distinct board edges the region touches.
fn touched_edges(region: &[Position]) -> usize {
    let last = BOARD_SIZE - 1;
    [
        region.iter().any(|p| p.x == 0),
        region.iter().any(|p| p.x == last),
        region.iter().any(|p| p.y == 0),
        region.iter().any(|p| p.y == last),
    ]
    .into_iter()
    .filter(|touched| *touched)
    .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::cathedral::types::Field;

    fn wall(board: &mut Board, owner: &str, cells: &[(usize, usize)]) {
        for &(x, y) in cells {
            *board.get_mut(Position::new(x, y)).unwrap() = Field {
                piece: PieceTypeId::new(4),
                owner: Some(owner.to_string()),
            };
        }
    }

    fn players() -> Vec<PlayerId> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_touched_edges_counts_distinct_edges() {
        let column: Vec<Position> = (0..BOARD_SIZE).map(|y| Position::new(4, y)).collect();
        assert_eq!(touched_edges(&column), 2);
        assert_eq!(touched_edges(&[Position::new(0, 0)]), 2);
        assert_eq!(touched_edges(&[Position::new(5, 5)]), 0);
    }

    #[test]
    fn test_empty_board_has_no_territory() {
        let mut board = Board::new();
        assert!(resolve_territories(&mut board, &players()).is_empty());
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_corner_region_is_captured() {
        let mut board = Board::new();
        wall(&mut board, "a", &[(2, 0), (2, 1), (2, 2), (1, 2), (0, 2)]);

        let captures = resolve_territories(&mut board, &players());

        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].captor, "a");
        assert_eq!(captures[0].cells.len(), 4);
        assert!(board.get(Position::new(1, 1)).unwrap().is_owned_by("a"));
    }

    #[test]
    fn test_diagonal_gap_leaks_region() {
        let mut board = Board::new();
        // Missing (2, 2) lets the corner region reach the rest diagonally.
        wall(&mut board, "a", &[(2, 0), (2, 1), (1, 2), (0, 2)]);

        assert!(resolve_territories(&mut board, &players()).is_empty());
    }

    #[test]
    fn test_region_touching_three_edges_is_open() {
        let mut board = Board::new();
        // A full-width wall on row 5 leaves two halves touching three edges each.
        let row: Vec<(usize, usize)> = (0..BOARD_SIZE).map(|x| (x, 5)).collect();
        wall(&mut board, "a", &row);
        let before = board.clone();

        assert!(resolve_territories(&mut board, &players()).is_empty());
        assert_eq!(board, before);
    }

    #[test]
    fn test_two_piece_types_void_capture() {
        let mut board = Board::new();
        wall(&mut board, "a", &[(3, 0), (3, 1), (3, 2), (2, 2), (1, 2), (0, 2)]);
        board.get_mut(Position::new(0, 0)).unwrap().piece = PieceTypeId::new(1);
        board.get_mut(Position::new(0, 0)).unwrap().owner = Some("b".into());
        board.get_mut(Position::new(2, 0)).unwrap().piece = PieceTypeId::new(10);
        board.get_mut(Position::new(2, 0)).unwrap().owner = Some("b".into());
        let before = board.clone();

        let captures = resolve_territories(&mut board, &players());

        assert!(captures.iter().all(|c| c.captor != "a"));
        assert_eq!(board.get(Position::new(1, 1)), before.get(Position::new(1, 1)));
        assert!(board.get(Position::new(0, 0)).unwrap().is_owned_by("b"));
    }

    #[test]
    fn test_captured_cathedral_is_returned() {
        let mut board = Board::new();
        wall(&mut board, "a", &[(2, 0), (2, 1), (2, 2), (1, 2), (0, 2)]);
        board.get_mut(Position::new(0, 0)).unwrap().piece = Some(PieceTypeId::CATHEDRAL);

        let captures = resolve_territories(&mut board, &players());

        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].returned, vec![PieceTypeId::CATHEDRAL]);
        assert_eq!(captures[0].opponent.as_deref(), Some("b"));
        assert_eq!(board.get(Position::new(0, 0)).unwrap().piece, None);
    }

    #[test]
    fn test_second_run_changes_nothing() {
        let mut board = Board::new();
        wall(&mut board, "a", &[(2, 0), (2, 1), (2, 2), (1, 2), (0, 2)]);
        resolve_territories(&mut board, &players());
        let after_first = board.clone();

        let captures = resolve_territories(&mut board, &players());

        assert!(captures.is_empty());
        assert_eq!(board, after_first);
    }
}
