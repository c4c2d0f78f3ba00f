use chrono::Utc;
use minado_core::{
    CellCount, CellView, Coord, Coord2, FlagOutcome, Game, GameConfig, GameError, GameState,
    RevealEvent, RevealOutcome,
};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::{
    Achievement, GameOutcome, LeaderboardEntry, LeaderboardStore, PlayStats, StatsTracker,
    MAX_NAME_LEN, STATS_FILE,
};

/// Directory holding the per-configuration leaderboard files, relative to
/// the session data directory.
const LEADERBOARD_DIR: &str = "leaderboards";

const DEFAULT_PLAYER_NAME: &str = "Player";

/// Where the player is in the application flow. `Playing` is the only state
/// that accepts board actions; `Won` and `Lost` are terminal until a new
/// game or a restart.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Menu,
    Playing,
    Won,
    Lost,
}

/// Everything a player can ask the session to do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    NewGame,
    Reveal,
    ToggleFlag,
    Restart,
    ToMenu,
}

/// The state an action leads to, or `None` when the combination is illegal.
///
/// This is the whole state machine in one match; the engine's own
/// [`GameError::AlreadyEnded`] guard backs it up for terminal boards.
pub fn transition(state: SessionState, action: SessionAction) -> Option<SessionState> {
    use SessionAction::*;
    use SessionState::*;

    match (state, action) {
        (_, ToMenu) => Some(Menu),
        (_, NewGame) => Some(Playing),
        (Playing | Won | Lost, Restart) => Some(Playing),
        (Menu, Restart) => None,
        (Playing, Reveal | ToggleFlag) => Some(Playing),
        (Menu | Won | Lost, Reveal | ToggleFlag) => None,
    }
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("{action:?} is not allowed while {state:?}")]
    IllegalAction {
        state: SessionState,
        action: SessionAction,
    },
    #[error(transparent)]
    Game(#[from] GameError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Facade tying the engine to the leaderboard and stats stores.
///
/// Owns the current game, gates every action through the transition table,
/// and records the outcome of each finished game. Persistence failures are
/// logged and dropped so a broken disk never interrupts play.
#[derive(Debug)]
pub struct GameSession {
    state: SessionState,
    game: Option<Game>,
    player_name: String,
    leaderboards: LeaderboardStore,
    stats: StatsTracker,
}

impl GameSession {
    /// Opens a session rooted at `data_dir`, loading whatever stats snapshot
    /// and leaderboards are already there.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            state: SessionState::Menu,
            game: None,
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            leaderboards: LeaderboardStore::new(data_dir.join(LEADERBOARD_DIR)),
            stats: StatsTracker::load_or_default(data_dir.join(STATS_FILE)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    /// Sets the name used for leaderboard entries, capped at
    /// [`MAX_NAME_LEN`] characters.
    pub fn set_player_name(&mut self, name: &str) {
        self.player_name = name.chars().take(MAX_NAME_LEN).collect();
    }

    /// Starts a fresh game. Legal from any state; an in-progress game is
    /// abandoned without being recorded.
    pub fn new_game(&mut self, size: Coord, mines: CellCount) -> SessionResult<()> {
        let next = self.gate(SessionAction::NewGame)?;
        let config = GameConfig::new(size, mines)?;
        self.game = Some(Game::new(config, clock_seed())?);
        self.state = next;
        log::debug!("New {}x{} game with {} mines", size, size, mines);
        Ok(())
    }

    /// Replays the current configuration on a fresh board and seed.
    pub fn restart(&mut self) -> SessionResult<()> {
        let next = self.gate(SessionAction::Restart)?;
        // the table only allows Restart in states that hold a game
        let config = self.game.as_ref().map(Game::config).unwrap();
        self.game = Some(Game::new(config, clock_seed())?);
        self.state = next;
        Ok(())
    }

    /// Back to the menu; the board is kept around for read access.
    pub fn to_menu(&mut self) {
        self.state = SessionState::Menu;
    }

    /// Reveals a cell and, when that ends the game, records the outcome.
    pub fn reveal(&mut self, coords: Coord2) -> SessionResult<RevealOutcome> {
        self.gate(SessionAction::Reveal)?;
        // the table only allows Reveal while a game is on the table
        let game = self.game.as_mut().unwrap();
        let outcome = game.reveal(coords)?;

        match game.state() {
            GameState::Playing => {}
            GameState::Won => {
                self.state = SessionState::Won;
                self.record_finished(true);
            }
            GameState::Lost => {
                self.state = SessionState::Lost;
                self.record_finished(false);
            }
        }
        Ok(outcome)
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> SessionResult<FlagOutcome> {
        self.gate(SessionAction::ToggleFlag)?;
        Ok(self.game.as_mut().unwrap().toggle_flag(coords)?)
    }

    fn gate(&self, action: SessionAction) -> SessionResult<SessionState> {
        transition(self.state, action).ok_or(SessionError::IllegalAction {
            state: self.state,
            action,
        })
    }

    /// Folds the finished game into the stats snapshot and, on a win, the
    /// leaderboard. Store failures are logged, never surfaced.
    fn record_finished(&mut self, won: bool) {
        let game = self.game.as_ref().unwrap();
        let board = game.board();
        let config = game.config();
        let time_secs = game.elapsed_secs();

        let outcome = GameOutcome {
            size: config.size,
            mines: config.mines,
            time_secs,
            won,
            flags_placed: board.flags_placed_total(),
            cells_revealed: board.revealed_count(),
            flags_all_correct: board.flags_match_mines(),
            no_flags_used: board.flags_placed_total() == 0,
        };
        if let Err(err) = self.stats.record_game(&outcome) {
            log::warn!("Dropping stats update: {}", err);
        }

        if won {
            let entry =
                LeaderboardEntry::new(&self.player_name, time_secs, config.size, config.mines);
            if let Err(err) = self.leaderboards.record(entry) {
                log::warn!("Dropping leaderboard entry: {}", err);
            }
        }
    }

    pub fn cell_view(&self, coords: Coord2) -> Option<CellView> {
        self.game
            .as_ref()?
            .board()
            .cell(coords)
            .map(|cell| cell.view())
    }

    /// Seconds on the game clock; 0 with no game on the table.
    pub fn elapsed_secs(&self) -> f64 {
        self.game.as_ref().map_or(0.0, Game::elapsed_secs)
    }

    pub fn mines_left(&self) -> isize {
        self.game.as_ref().map_or(0, Game::mines_left)
    }

    /// Events still animating, for the renderer to poll each frame.
    /// Finished events are pruned on the way out.
    pub fn pending_events(&mut self) -> Vec<RevealEvent> {
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        game.prune_events(Utc::now());
        game.events().copied().collect()
    }

    pub fn leaderboard(&self, size: Coord, mines: CellCount) -> Vec<LeaderboardEntry> {
        self.leaderboards.load(size, mines)
    }

    /// Every configuration ever played, plus the current one.
    pub fn configurations(&self) -> Vec<(Coord, CellCount)> {
        let current = self
            .game
            .as_ref()
            .map(|game| (game.config().size, game.config().mines));
        self.leaderboards.configurations(current)
    }

    pub fn clear_leaderboard(&self, size: Coord, mines: CellCount) {
        if let Err(err) = self.leaderboards.clear(size, mines) {
            log::warn!("Failed to clear {}x{} leaderboard: {}", size, size, err);
        }
    }

    pub fn stats(&self) -> &PlayStats {
        self.stats.stats()
    }

    pub fn achievements(&self) -> Vec<Achievement> {
        self.stats.achievements()
    }
}

/// Seed for a fresh board, taken from the wall clock.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64)
}
