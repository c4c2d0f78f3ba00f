use crate::*;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Valid transitions:
/// - Playing -> Won
/// - Playing -> Lost
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

impl GameState {
    /// Indicates the game has ended and no moves can be made anymore.
    pub const fn is_final(self) -> bool {
        use GameState::*;
        match self {
            Playing => false,
            Won => true,
            Lost => true,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::Playing
    }
}

/// Outcome of revealing a cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    Exploded,
    Won,
}

impl RevealOutcome {
    /// Whether this outcome could have caused an update to the game.
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Revealed => true,
            Exploded => true,
            Won => true,
        }
    }
}

/// Outcome of toggling a flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    NoChange,
    Placed,
    Removed,
}

impl FlagOutcome {
    /// Whether this outcome could have caused an update to the game.
    pub const fn has_update(self) -> bool {
        use FlagOutcome::*;
        match self {
            NoChange => false,
            Placed => true,
            Removed => true,
        }
    }
}

/// Represents a game from the first click to a terminal state.
///
/// Mines are placed lazily on the first reveal, which also starts the clock.
/// Every mutation schedules its animation event; the schedule is purely
/// observational and never read back by the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Game {
    board: Board,
    seed: u64,
    state: GameState,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    schedule: EventSchedule,
}

impl Game {
    pub fn new(config: GameConfig, seed: u64) -> Result<Game> {
        Ok(Self {
            board: Board::new(config)?,
            seed,
            state: Default::default(),
            started_at: None,
            ended_at: None,
            schedule: Default::default(),
        })
    }

    /// Builds a game over an explicit mine layout, mostly useful for replays
    /// and puzzle setups. The first-reveal placement step is skipped.
    pub fn with_mines(size: Coord, mine_coords: &[Coord2]) -> Result<Game> {
        Ok(Self {
            board: Board::with_mines(size, mine_coords)?,
            seed: 0,
            state: Default::default(),
            started_at: None,
            ended_at: None,
            schedule: Default::default(),
        })
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_final()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> GameConfig {
        self.board.config()
    }

    /// How many mines have not been flagged yet. Goes negative when the
    /// player has placed more flags than there are mines.
    pub fn mines_left(&self) -> isize {
        (self.config().mines as isize) - (self.board.flags_active() as isize)
    }

    /// Seconds since the first reveal, 0 before it, frozen once the game
    /// reaches a terminal state.
    pub fn elapsed_secs(&self) -> f64 {
        if let Some(started_at) = self.started_at {
            let elapsed = self.ended_at.unwrap_or_else(Utc::now) - started_at;
            elapsed.num_milliseconds().max(0) as f64 / 1000.0
        } else {
            0.0
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &RevealEvent> {
        self.schedule.iter()
    }

    pub fn schedule(&self) -> &EventSchedule {
        &self.schedule
    }

    pub fn prune_events(&mut self, now: DateTime<Utc>) {
        self.schedule.prune_finished(now);
    }

    /// Reveals a cell, placing mines first if this is the first reveal.
    ///
    /// Out-of-bounds coordinates, flagged cells and already-revealed cells
    /// are silent no-ops. Revealing a mine loses the game and sweeps the
    /// remaining mines open; revealing a zero-adjacency cell cascades.
    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        self.check_not_finished()?;
        self.reveal_at(coords, Utc::now())
    }

    fn reveal_at(&mut self, coords: Coord2, now: DateTime<Utc>) -> Result<RevealOutcome> {
        use RevealOutcome::*;

        if !self.board.contains(coords) {
            return Ok(NoChange);
        }

        if !self.board.mines_placed() {
            self.board.place_mines(coords, self.seed);
            log::debug!("First reveal at {:?} placed the mines", coords);
        }

        let cell = self.board.cell_at(coords);
        if cell.is_revealed || cell.is_flagged {
            return Ok(NoChange);
        }

        self.mark_started(now);
        self.board.reveal_cell(coords, now);

        if cell.is_mine {
            self.schedule
                .push(RevealEvent::new(coords, EventKind::Explode, now, REVEAL_DURATION_MS));
            self.state = GameState::Lost;
            self.ended_at = Some(now);
            log::debug!("Mine hit at {:?}", coords);
            self.sweep_mines(now);
            return Ok(Exploded);
        }

        self.schedule
            .push(RevealEvent::new(coords, EventKind::Reveal, now, REVEAL_DURATION_MS));

        if self.check_win(now) {
            return Ok(Won);
        }

        if cell.adjacent_mines == 0 && self.cascade(coords, now) {
            return Ok(Won);
        }

        Ok(Revealed)
    }

    /// Breadth-first cascade out of a zero-adjacency cell, delaying each
    /// depth level a little more. Returns true when the win threshold is
    /// crossed mid-cascade, in which case the rest of the worklist is
    /// dropped.
    fn cascade(&mut self, origin: Coord2, now: DateTime<Utc>) -> bool {
        let mut to_visit: VecDeque<(Coord2, u32)> =
            self.board.neighbors(origin).map(|pos| (pos, 1)).collect();

        while let Some((coords, depth)) = to_visit.pop_front() {
            let cell = self.board.cell_at(coords);
            if cell.is_revealed || cell.is_flagged {
                continue;
            }

            // cells queued here border a zero-adjacency cell, so none of
            // them can be a mine
            let at = now + TimeDelta::milliseconds(i64::from(depth) * CASCADE_STEP_MS);
            self.board.reveal_cell(coords, at);
            self.schedule
                .push(RevealEvent::new(coords, EventKind::Reveal, at, REVEAL_DURATION_MS));
            log::trace!("Cascade revealed {:?} at depth {}", coords, depth);

            if self.check_win(now) {
                return true;
            }

            if cell.adjacent_mines == 0 {
                to_visit.extend(self.board.neighbors(coords).map(|pos| (pos, depth + 1)));
            }
        }

        false
    }

    fn check_win(&mut self, now: DateTime<Utc>) -> bool {
        if self.board.revealed_count() >= self.config().safe_cell_target() {
            self.state = GameState::Won;
            self.ended_at = Some(now);
            log::debug!("All safe cells revealed, game won");
            true
        } else {
            false
        }
    }

    /// Opens every remaining mine in row-major order with a growing stagger,
    /// leaving the win-threshold counter untouched.
    fn sweep_mines(&mut self, now: DateTime<Utc>) {
        let mut step: i64 = 0;
        for y in 0..self.board.size() {
            for x in 0..self.board.size() {
                let cell = self.board.cell_at((x, y));
                if cell.is_mine && !cell.is_revealed {
                    let at = now + TimeDelta::milliseconds(step * SWEEP_STEP_MS);
                    self.board.expose_mine((x, y), at);
                    self.schedule.push(RevealEvent::new(
                        (x, y),
                        EventKind::Explode,
                        at,
                        SWEEP_EXPLODE_DURATION_MS,
                    ));
                    step += 1;
                }
            }
        }
    }

    /// Toggles a flag. Flags before the first reveal are ignored, as are
    /// out-of-bounds coordinates and revealed cells.
    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<FlagOutcome> {
        self.check_not_finished()?;
        if !self.board.mines_placed() {
            return Ok(FlagOutcome::NoChange);
        }
        self.toggle_flag_at(coords, Utc::now())
    }

    fn toggle_flag_at(&mut self, coords: Coord2, now: DateTime<Utc>) -> Result<FlagOutcome> {
        let outcome = self.board.toggle_flag(coords, now);
        match outcome {
            FlagOutcome::Placed => {
                self.schedule
                    .push(RevealEvent::new(coords, EventKind::Flag, now, FLAG_DURATION_MS));
                log::debug!("Flag placed at {:?}", coords);
            }
            FlagOutcome::Removed => {
                self.schedule
                    .push(RevealEvent::new(coords, EventKind::Unflag, now, FLAG_DURATION_MS));
                log::debug!("Flag removed from {:?}", coords);
            }
            FlagOutcome::NoChange => {}
        }
        Ok(outcome)
    }

    fn mark_started(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.state.is_final() {
            Err(GameError::AlreadyEnded)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn ms(millis: i64) -> TimeDelta {
        TimeDelta::milliseconds(millis)
    }

    #[test]
    fn first_reveal_is_always_safe() {
        for seed in 0..20 {
            let mut game = Game::new(GameConfig::new_unchecked(9, 10), seed).unwrap();
            let outcome = game.reveal((4, 4)).unwrap();

            assert_ne!(outcome, RevealOutcome::Exploded);
            assert_eq!(game.board().actual_mines(), 10);
            assert!(!game.board().cell((4, 4)).unwrap().is_mine);
        }
    }

    #[test]
    fn reveal_out_of_bounds_is_a_silent_noop() {
        let mut game = Game::new(GameConfig::new_unchecked(9, 10), 3).unwrap();

        assert_eq!(game.reveal((200, 0)).unwrap(), RevealOutcome::NoChange);
        assert!(!game.board().mines_placed());
        assert_eq!(game.elapsed_secs(), 0.0);
    }

    #[test]
    fn cascade_opens_the_zero_region_and_wins() {
        let mut game = Game::with_mines(3, &[(2, 2)]).unwrap();

        let outcome = game.reveal_at((0, 0), now()).unwrap();

        assert_eq!(outcome, RevealOutcome::Won);
        assert_eq!(game.state(), GameState::Won);
        assert_eq!(game.board().revealed_count(), 8);
        assert!(!game.board().cell((2, 2)).unwrap().is_revealed);
    }

    #[test]
    fn cascade_delays_grow_with_depth() {
        let mut game = Game::with_mines(4, &[(3, 3)]).unwrap();

        game.reveal_at((0, 0), now()).unwrap();

        let start_of = |coords| game.schedule().get(coords).unwrap().starts_at;
        assert_eq!(start_of((0, 0)), now());
        assert_eq!(start_of((1, 1)), now() + ms(CASCADE_STEP_MS));
        assert_eq!(start_of((2, 2)), now() + ms(2 * CASCADE_STEP_MS));
        assert_eq!(start_of((3, 0)), now() + ms(3 * CASCADE_STEP_MS));
        assert_eq!(
            game.board().cell((2, 2)).unwrap().reveal_time,
            Some(now() + ms(2 * CASCADE_STEP_MS))
        );
    }

    #[test]
    fn cascade_never_crosses_flags() {
        let mut game = Game::with_mines(5, &[(4, 4)]).unwrap();
        game.toggle_flag_at((2, 2), now()).unwrap();

        let outcome = game.reveal_at((0, 0), now()).unwrap();

        assert_eq!(outcome, RevealOutcome::Revealed);
        assert!(!game.board().cell((2, 2)).unwrap().is_revealed);
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.board().revealed_count(), 23);
    }

    #[test]
    fn mine_hit_loses_counts_the_click_and_sweeps_the_rest() {
        let mut game = Game::with_mines(3, &[(0, 0), (2, 2)]).unwrap();

        let outcome = game.reveal_at((2, 2), now()).unwrap();

        assert_eq!(outcome, RevealOutcome::Exploded);
        assert_eq!(game.state(), GameState::Lost);
        // the clicked mine counts, the swept one does not
        assert_eq!(game.board().revealed_count(), 1);
        assert!(game.board().cell((0, 0)).unwrap().is_revealed);

        let clicked = game.schedule().get((2, 2)).unwrap();
        assert_eq!(clicked.kind, EventKind::Explode);
        assert_eq!(clicked.duration, ms(REVEAL_DURATION_MS));

        let swept = game.schedule().get((0, 0)).unwrap();
        assert_eq!(swept.kind, EventKind::Explode);
        assert_eq!(swept.duration, ms(SWEEP_EXPLODE_DURATION_MS));
        assert_eq!(swept.starts_at, now());
    }

    #[test]
    fn sweep_staggers_mines_in_row_major_order() {
        let mines = &[(0, 0), (2, 0), (1, 2)];
        let mut game = Game::with_mines(3, mines).unwrap();

        game.reveal_at((0, 0), now()).unwrap();

        // remaining mines open scanning rows top to bottom
        let swept = |coords| game.schedule().get(coords).unwrap().starts_at;
        assert_eq!(swept((2, 0)), now());
        assert_eq!(swept((1, 2)), now() + ms(SWEEP_STEP_MS));
    }

    #[test]
    fn win_uses_the_configured_mine_count_when_placement_is_clamped() {
        // 3x3 with 15 requested mines: the corner exclusion leaves 5
        // candidates, so the safe-cell target is already met at one reveal
        let mut game = Game::new(GameConfig::new_unchecked(3, 15), 11).unwrap();

        let outcome = game.reveal((0, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::Won);
        assert_eq!(game.board().actual_mines(), 5);
        assert_eq!(game.board().revealed_count(), 1);
    }

    #[test]
    fn flags_do_not_count_toward_the_win() {
        let mut game = Game::with_mines(2, &[(0, 0)]).unwrap();
        game.toggle_flag_at((1, 1), now()).unwrap();

        assert_eq!(game.reveal_at((0, 1), now()).unwrap(), RevealOutcome::Revealed);
        assert_eq!(game.reveal_at((1, 0), now()).unwrap(), RevealOutcome::Revealed);
        assert_eq!(game.state(), GameState::Playing);

        game.toggle_flag_at((1, 1), now()).unwrap();
        assert_eq!(game.reveal_at((1, 1), now()).unwrap(), RevealOutcome::Won);
    }

    #[test]
    fn flag_before_first_reveal_is_ignored() {
        let mut game = Game::new(GameConfig::new_unchecked(9, 10), 5).unwrap();

        assert_eq!(game.toggle_flag((4, 4)).unwrap(), FlagOutcome::NoChange);
        assert_eq!(game.board().flags_active(), 0);
        assert!(game.schedule().is_empty());
    }

    #[test]
    fn flag_toggle_schedules_flag_then_unflag_events() {
        let mut game = Game::with_mines(3, &[(0, 0)]).unwrap();

        game.toggle_flag_at((1, 1), now()).unwrap();
        assert_eq!(game.schedule().get((1, 1)).unwrap().kind, EventKind::Flag);

        game.toggle_flag_at((1, 1), now() + ms(500)).unwrap();
        let event = game.schedule().get((1, 1)).unwrap();
        assert_eq!(event.kind, EventKind::Unflag);
        assert_eq!(event.duration, ms(FLAG_DURATION_MS));
        assert_eq!(game.schedule().len(), 1);
    }

    #[test]
    fn finished_games_reject_further_moves() {
        let mut game = Game::with_mines(2, &[(0, 0)]).unwrap();
        game.reveal_at((0, 0), now()).unwrap();

        assert_eq!(game.state(), GameState::Lost);
        assert_eq!(game.reveal((1, 1)).unwrap_err(), GameError::AlreadyEnded);
        assert_eq!(game.toggle_flag((1, 1)).unwrap_err(), GameError::AlreadyEnded);
    }

    #[test]
    fn revealing_a_flagged_cell_changes_nothing() {
        let mut game = Game::with_mines(3, &[(0, 0)]).unwrap();
        game.toggle_flag_at((0, 0), now()).unwrap();

        assert_eq!(game.reveal_at((0, 0), now()).unwrap(), RevealOutcome::NoChange);
        assert!(!game.board().cell((0, 0)).unwrap().is_revealed);
        assert_eq!(game.state(), GameState::Playing);
    }

    #[test]
    fn elapsed_time_freezes_at_the_loss() {
        let mut game = Game::with_mines(2, &[(0, 0)]).unwrap();
        game.reveal_at((1, 1), now()).unwrap();
        game.reveal_at((0, 0), now() + ms(2_000)).unwrap();

        assert_eq!(game.state(), GameState::Lost);
        assert_eq!(game.elapsed_secs(), 2.0);
    }

    #[test]
    fn mines_left_tracks_active_flags() {
        let mut game = Game::with_mines(3, &[(0, 0), (1, 0)]).unwrap();
        assert_eq!(game.mines_left(), 2);

        game.toggle_flag_at((2, 2), now()).unwrap();
        game.toggle_flag_at((2, 1), now()).unwrap();
        game.toggle_flag_at((2, 0), now()).unwrap();
        assert_eq!(game.mines_left(), -1);
    }
}
