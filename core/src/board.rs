use crate::*;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Square minefield grid together with its reveal and flag bookkeeping.
///
/// The board starts empty; mines only exist after [`Board::place_mines`],
/// which the reveal engine triggers on the first reveal so that the first
/// click can never hit one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    config: GameConfig,
    grid: Array2<Cell>,
    mines_placed: bool,
    actual_mines: CellCount,
    revealed_count: CellCount,
    flags_active: CellCount,
    flags_placed_total: CellCount,
}

impl Board {
    pub fn new(config: GameConfig) -> Result<Board> {
        if config.size == 0 {
            return Err(GameError::InvalidConfig);
        }
        Ok(Self {
            config,
            grid: Array2::default((config.size, config.size).to_nd_index()),
            mines_placed: false,
            actual_mines: 0,
            revealed_count: 0,
            flags_active: 0,
            flags_placed_total: 0,
        })
    }

    /// Builds a board with an explicit mine layout, skipping random placement.
    /// The configured mine count is taken from the distinct coordinates given.
    pub fn with_mines(size: Coord, mine_coords: &[Coord2]) -> Result<Board> {
        let mut board = Board::new(GameConfig::new_unchecked(size, 0))?;
        for &coords in mine_coords {
            if !board.contains(coords) {
                return Err(GameError::InvalidConfig);
            }
            board.grid[coords.to_nd_index()].is_mine = true;
        }
        board.finish_placement();
        board.config.mines = board.actual_mines;
        Ok(board)
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn size(&self) -> Coord {
        self.config.size
    }

    pub fn contains(&self, coords: Coord2) -> bool {
        coords.0 < self.config.size && coords.1 < self.config.size
    }

    pub fn cell(&self, coords: Coord2) -> Option<&Cell> {
        self.contains(coords)
            .then(|| &self.grid[coords.to_nd_index()])
    }

    pub(crate) fn cell_at(&self, coords: Coord2) -> Cell {
        self.grid[coords.to_nd_index()]
    }

    pub fn neighbors(&self, coords: Coord2) -> NeighborIter {
        self.grid.iter_neighbors(coords)
    }

    pub fn mines_placed(&self) -> bool {
        self.mines_placed
    }

    /// Mines actually on the board, which can fall short of the configured
    /// count when the exclusion zone leaves too few candidate cells.
    pub fn actual_mines(&self) -> CellCount {
        self.actual_mines
    }

    pub fn revealed_count(&self) -> CellCount {
        self.revealed_count
    }

    pub fn flags_active(&self) -> CellCount {
        self.flags_active
    }

    /// How many times a flag has been placed over the whole game; unflagging
    /// does not take these back.
    pub fn flags_placed_total(&self) -> CellCount {
        self.flags_placed_total
    }

    /// True when the flags coincide exactly with the mines.
    pub fn flags_match_mines(&self) -> bool {
        self.grid
            .iter()
            .all(|cell| cell.is_flagged == cell.is_mine)
    }

    pub fn adjacent_mine_count(&self, coords: Coord2) -> u8 {
        self.neighbors(coords)
            .filter(|&pos| self.grid[pos.to_nd_index()].is_mine)
            .count()
            .try_into()
            .unwrap()
    }

    /// Randomly places the configured mines, keeping the 3x3 neighborhood
    /// around `exclude` clear. Requests beyond the remaining capacity are
    /// clamped to what fits. Not idempotent; callers guard with
    /// [`Board::mines_placed`].
    pub fn place_mines(&mut self, exclude: Coord2, seed: u64) {
        use rand::prelude::*;

        let mut candidates: Vec<Coord2> = Vec::new();
        for x in 0..self.config.size {
            for y in 0..self.config.size {
                if !near_exclusion((x, y), exclude) {
                    candidates.push((x, y));
                }
            }
        }

        let requested = usize::from(self.config.mines);
        let actual = requested.min(candidates.len());
        if actual < requested {
            log::warn!(
                "Requested {} mines but only {} cells are available outside the safe zone",
                requested,
                candidates.len()
            );
        }

        let mut rng = SmallRng::seed_from_u64(seed);
        // partial Fisher-Yates: the first `actual` slots end up a uniform
        // sample without replacement
        for i in 0..actual {
            let j = rng.random_range(i..candidates.len());
            candidates.swap(i, j);
        }
        for &coords in &candidates[..actual] {
            self.grid[coords.to_nd_index()].is_mine = true;
        }

        self.finish_placement();
    }

    fn finish_placement(&mut self) {
        self.actual_mines = self
            .grid
            .iter()
            .filter(|cell| cell.is_mine)
            .count()
            .try_into()
            .unwrap();
        for x in 0..self.config.size {
            for y in 0..self.config.size {
                if self.grid[(x, y).to_nd_index()].is_mine {
                    continue;
                }
                let count = self.adjacent_mine_count((x, y));
                self.grid[(x, y).to_nd_index()].adjacent_mines = count;
            }
        }
        self.mines_placed = true;
    }

    /// Flips the flag on an unrevealed cell. Out-of-bounds coordinates and
    /// revealed cells are left untouched.
    pub fn toggle_flag(&mut self, coords: Coord2, now: DateTime<Utc>) -> FlagOutcome {
        use FlagOutcome::*;

        match self.cell(coords) {
            None => return NoChange,
            Some(cell) if cell.is_revealed => return NoChange,
            Some(_) => {}
        }

        let cell = &mut self.grid[coords.to_nd_index()];
        cell.is_flagged = !cell.is_flagged;
        cell.flag_time = Some(now);
        if cell.is_flagged {
            self.flags_active += 1;
            self.flags_placed_total += 1;
            Placed
        } else {
            self.flags_active -= 1;
            Removed
        }
    }

    pub(crate) fn reveal_cell(&mut self, coords: Coord2, at: DateTime<Utc>) {
        let cell = &mut self.grid[coords.to_nd_index()];
        cell.is_revealed = true;
        cell.reveal_time = Some(at);
        self.revealed_count += 1;
    }

    /// Marks a mine revealed during the loss sweep. Swept mines never count
    /// toward the win threshold.
    pub(crate) fn expose_mine(&mut self, coords: Coord2, at: DateTime<Utc>) {
        let cell = &mut self.grid[coords.to_nd_index()];
        cell.is_revealed = true;
        cell.reveal_time = Some(at);
    }
}

/// Chebyshev distance of at most one, the 3x3 zone kept clear of mines.
fn near_exclusion(coords: Coord2, exclude: Coord2) -> bool {
    coords.0.abs_diff(exclude.0) <= 1 && coords.1.abs_diff(exclude.1) <= 1
}
