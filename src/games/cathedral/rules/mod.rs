//! Game rules: territory capture and end-of-game detection.

mod territory;
mod win;

pub use territory::{Capture, resolve_territories};
pub use win::{has_legal_placement, select_winner};

use serde::{Deserialize, Serialize};

/// When territory capture and end-of-game checks begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerritoryStart {
    /// From the very first placement.
    FirstMove,
    /// From the third placement onward.
    #[default]
    ThirdMove,
}

impl TerritoryStart {
    /// Move count at which resolution first runs.
    pub fn threshold(self) -> u32 {
        match self {
            TerritoryStart::FirstMove => 1,
            TerritoryStart::ThirdMove => 3,
        }
    }

    /// Returns whether a game with `move_count` completed placements resolves
    /// territory.
    pub fn applies_at(self, move_count: u32) -> bool {
        move_count >= self.threshold()
    }
}
