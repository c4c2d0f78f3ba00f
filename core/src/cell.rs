use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a single cell in the minefield grid.
///
/// The timestamps record when the cell is scheduled to become visible, which
/// for cascaded reveals lies slightly in the future of the triggering click.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub is_mine: bool,
    pub is_revealed: bool,
    pub is_flagged: bool,
    pub adjacent_mines: u8,
    pub reveal_time: Option<DateTime<Utc>>,
    pub flag_time: Option<DateTime<Utc>>,
}

impl Cell {
    /// Neither revealed nor flagged, so a reveal would change it.
    pub const fn is_unrevealed(&self) -> bool {
        !self.is_revealed && !self.is_flagged
    }

    pub const fn view(&self) -> CellView {
        CellView {
            is_revealed: self.is_revealed,
            is_flagged: self.is_flagged,
            is_mine: self.is_mine,
            adjacent_mines: self.adjacent_mines,
        }
    }
}

/// Render snapshot of a cell, without the scheduling timestamps.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellView {
    pub is_revealed: bool,
    pub is_flagged: bool,
    pub is_mine: bool,
    pub adjacent_mines: u8,
}
