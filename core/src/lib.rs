use serde::{Deserialize, Serialize};

pub use board::*;
pub use cell::*;
pub use error::*;
pub use events::*;
pub use game::*;
pub use types::*;

mod board;
mod cell;
mod error;
mod events;
mod game;
mod types;

/// Board shape and requested mine count for a game.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub size: Coord,
    pub mines: CellCount,
}

impl GameConfig {
    pub const BEGINNER: GameConfig = GameConfig::new_unchecked(9, 10);
    pub const INTERMEDIATE: GameConfig = GameConfig::new_unchecked(16, 40);
    pub const EXPERT: GameConfig = GameConfig::new_unchecked(22, 99);

    pub const fn new_unchecked(size: Coord, mines: CellCount) -> Self {
        Self { size, mines }
    }

    /// A board needs at least one cell; mine counts above the remaining
    /// capacity are accepted here and clamped at placement time.
    pub fn new(size: Coord, mines: CellCount) -> Result<Self> {
        if size == 0 {
            return Err(GameError::InvalidConfig);
        }
        Ok(Self::new_unchecked(size, mines))
    }

    pub const fn total_cells(&self) -> CellCount {
        square(self.size)
    }

    /// Revealed-cell count that wins the game. Uses the configured mine
    /// count even when placement clamped the real count lower.
    pub const fn safe_cell_target(&self) -> CellCount {
        self.total_cells().saturating_sub(self.mines)
    }
}
