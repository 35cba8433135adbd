//! End-of-game detection.

use super::super::pieces::{Orientation, PieceTypeId};
use super::super::placement::is_valid_placement;
use super::super::player::Player;
use super::super::types::{Board, PlayerId, Position};
use strum::IntoEnumIterator;
use tracing::instrument;

/// Returns whether `player` can place any piece of `hand` anywhere.
///
/// Every board cell is tried as an anchor in every orientation.
#[instrument(skip_all, fields(player = %player, hand = hand.len()))]
pub fn has_legal_placement(board: &Board, hand: &[PieceTypeId], player: &str) -> bool {
    let mut distinct = hand.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    distinct.into_iter().any(|piece| {
        Position::all().any(|anchor| {
            Orientation::iter()
                .any(|orientation| is_valid_placement(board, piece, anchor, orientation, player))
        })
    })
}

/// Player with the smallest remaining-hand footprint.
///
/// Ties go to the player earliest in turn order.
#[instrument(skip(players))]
pub fn select_winner(players: &[Player]) -> Option<PlayerId> {
    players
        .iter()
        .min_by_key(|p| p.footprint())
        .map(|p| p.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::cathedral::types::Field;

    fn fill_board(owner: &str) -> Board {
        let mut board = Board::new();
        for pos in Position::all() {
            *board.get_mut(pos).unwrap() = Field {
                piece: PieceTypeId::new(1),
                owner: Some(owner.to_string()),
            };
        }
        board
    }

    #[test]
    fn test_empty_board_always_has_a_move() {
        let board = Board::new();
        let hand: Vec<PieceTypeId> = PieceTypeId::regular().collect();
        assert!(has_legal_placement(&board, &hand, "a"));
    }

    #[test]
    fn test_full_board_has_no_move() {
        let board = fill_board("b");
        let hand: Vec<PieceTypeId> = PieceTypeId::regular().collect();
        assert!(!has_legal_placement(&board, &hand, "a"));
    }

    #[test]
    fn test_empty_hand_has_no_move() {
        assert!(!has_legal_placement(&Board::new(), &[], "a"));
    }

    #[test]
    fn test_corner_cell_found_by_full_scan() {
        let mut board = fill_board("b");
        *board.get_mut(Position::new(9, 9)).unwrap() = Field::default();
        let hand = vec![PieceTypeId::new(1).unwrap()];
        assert!(has_legal_placement(&board, &hand, "a"));
    }

    #[test]
    fn test_winner_has_smallest_footprint() {
        let mut a = Player::new("a".into(), "A".into(), "#ffa502".into());
        let b = Player::new("b".into(), "B".into(), "#3742fa".into());
        a.hand.truncate(2);
        assert_eq!(select_winner(&[a, b]), Some("a".to_string()));
    }

    #[test]
    fn test_winner_tie_goes_to_first_player() {
        let a = Player::new("a".into(), "A".into(), "#ffa502".into());
        let b = Player::new("b".into(), "B".into(), "#3742fa".into());
        assert_eq!(select_winner(&[a, b]), Some("a".to_string()));
    }
}
