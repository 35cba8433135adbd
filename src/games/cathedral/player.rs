//! Session participants.

use super::pieces::PieceTypeId;
use super::types::PlayerId;
use serde::{Deserialize, Serialize};

/// Colours handed out to players in join order.
pub const PLAYER_COLORS: [&str; 4] = ["#ffa502", "#3742fa", "#ff4757", "#2ed573"];

/// A participant holding pieces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Opaque external id.
    pub id: PlayerId,
    /// Name shown to other viewers.
    pub display_name: String,
    /// Display colour.
    pub color: String,
    /// Piece types not yet placed. May hold duplicates after captures.
    pub hand: Vec<PieceTypeId>,
    /// Whether this player moves next.
    pub is_turn: bool,
    /// Whether the player's viewer connection is open.
    pub connected: bool,
}

impl Player {
    /// Creates a connected player holding one of each regular piece.
    pub fn new(id: PlayerId, display_name: String, color: String) -> Self {
        Self {
            id,
            display_name,
            color,
            hand: PieceTypeId::regular().collect(),
            is_turn: false,
            connected: true,
        }
    }

    /// Returns true if at least one instance of `piece` is in hand.
    pub fn holds(&self, piece: PieceTypeId) -> bool {
        self.hand.contains(&piece)
    }

    /// Removes one instance of `piece`. Returns false if none was held.
    pub fn take(&mut self, piece: PieceTypeId) -> bool {
        match self.hand.iter().position(|p| *p == piece) {
            Some(index) => {
                self.hand.remove(index);
                true
            }
            None => false,
        }
    }

    /// Total covered cells across every shape still in hand.
    pub fn footprint(&self) -> usize {
        self.hand.iter().map(|p| p.shape().footprint()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_holds_thirteen_pieces() {
        let player = Player::new("p".into(), "P".into(), PLAYER_COLORS[0].into());
        assert_eq!(player.hand.len(), 13);
        assert!(!player.holds(PieceTypeId::CATHEDRAL));
        assert_eq!(player.footprint(), 47);
    }

    #[test]
    fn test_take_removes_single_instance() {
        let mut player = Player::new("p".into(), "P".into(), PLAYER_COLORS[0].into());
        let piece = PieceTypeId::new(3).unwrap();
        player.hand.push(piece);

        assert!(player.take(piece));
        assert!(player.holds(piece));
        assert!(player.take(piece));
        assert!(!player.take(piece));
    }
}
