use chrono::Utc;
use minado_core::{CellCount, Coord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::StoreError;

/// File name of the stats snapshot inside the data directory.
pub const STATS_FILE: &str = "game_stats.json";

/// Lifetime counters across every recorded game.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayStats {
    pub total_games: u32,
    pub total_wins: u32,
    pub total_losses: u32,
    pub total_time_played: f64,
    /// Best win time per configuration, keyed like `9x9_10mines`.
    pub best_times: BTreeMap<String, f64>,
    pub games_by_difficulty: DifficultyTally,
    pub total_flags_placed: u64,
    pub total_cells_revealed: u64,
}

/// Games played on the preset board sizes; other sizes are not tallied.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTally {
    pub beginner: u32,
    pub intermediate: u32,
    pub expert: u32,
}

/// What the session reports about a finished game.
#[derive(Clone, Debug, PartialEq)]
pub struct GameOutcome {
    pub size: Coord,
    pub mines: CellCount,
    pub time_secs: f64,
    pub won: bool,
    pub flags_placed: CellCount,
    pub cells_revealed: CellCount,
    pub flags_all_correct: bool,
    pub no_flags_used: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AchievementId {
    FirstGame,
    TenWins,
    FastBeginner,
    PerfectFlag,
    WinExpert,
    HundredGames,
    NoFlags,
    SpeedDemon,
}

impl AchievementId {
    pub const ALL: [AchievementId; 8] = [
        AchievementId::FirstGame,
        AchievementId::TenWins,
        AchievementId::FastBeginner,
        AchievementId::PerfectFlag,
        AchievementId::WinExpert,
        AchievementId::HundredGames,
        AchievementId::NoFlags,
        AchievementId::SpeedDemon,
    ];

    /// Stable key used in the stats snapshot.
    pub const fn key(self) -> &'static str {
        use AchievementId::*;
        match self {
            FirstGame => "first_game",
            TenWins => "ten_wins",
            FastBeginner => "fast_beginner",
            PerfectFlag => "perfect_flag",
            WinExpert => "win_expert",
            HundredGames => "hundred_games",
            NoFlags => "no_flags",
            SpeedDemon => "speed_demon",
        }
    }

    pub const fn title(self) -> &'static str {
        use AchievementId::*;
        match self {
            FirstGame => "First Game",
            TenWins => "Victory Streak",
            FastBeginner => "Speed Runner",
            PerfectFlag => "Flag Master",
            WinExpert => "Expert Solver",
            HundredGames => "Veteran",
            NoFlags => "Memory Master",
            SpeedDemon => "Blitz Master",
        }
    }

    pub const fn description(self) -> &'static str {
        use AchievementId::*;
        match self {
            FirstGame => "Complete your first game",
            TenWins => "Win 10 games",
            FastBeginner => "Win a beginner game in under 30 seconds",
            PerfectFlag => "Flag all mines perfectly in a game",
            WinExpert => "Win an expert game",
            HundredGames => "Play 100 games",
            NoFlags => "Win without using any flags",
            SpeedDemon => "Win any game in under 10 seconds",
        }
    }

    fn from_key(key: &str) -> Option<AchievementId> {
        AchievementId::ALL.into_iter().find(|id| id.key() == key)
    }
}

/// Catalogue entry with its unlock state.
#[derive(Clone, Debug, PartialEq)]
pub struct Achievement {
    pub id: AchievementId,
    pub unlocked: bool,
    pub unlock_date: Option<String>,
}

impl Achievement {
    pub fn title(&self) -> &'static str {
        self.id.title()
    }

    pub fn description(&self) -> &'static str {
        self.id.description()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct AchievementRecord {
    unlocked: bool,
    unlock_date: Option<String>,
}

/// On-disk shape of the snapshot: two sections, both optional so partial
/// or old files still load.
#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
struct StatsFile {
    stats: PlayStats,
    achievements: BTreeMap<String, AchievementRecord>,
}

/// Cumulative statistics and achievements, persisted as one JSON snapshot
/// after every recorded game.
#[derive(Debug)]
pub struct StatsTracker {
    path: PathBuf,
    stats: PlayStats,
    unlocks: BTreeMap<AchievementId, AchievementRecord>,
}

impl StatsTracker {
    /// Loads the snapshot at `path`, falling back to defaults when the file
    /// is missing, unreadable or malformed. Unknown achievement keys are
    /// dropped; missing ones stay locked.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(contents) => match serde_json::from_str::<StatsFile>(&contents) {
                    Ok(file) => file,
                    Err(err) => {
                        log::warn!("Malformed stats file {}: {}", path.display(), err);
                        StatsFile::default()
                    }
                },
                Err(err) => {
                    log::warn!("Failed to read stats file {}: {}", path.display(), err);
                    StatsFile::default()
                }
            }
        } else {
            StatsFile::default()
        };

        let mut unlocks = BTreeMap::new();
        for (key, record) in file.achievements {
            if let Some(id) = AchievementId::from_key(&key) {
                unlocks.insert(id, record);
            }
        }
        Self {
            path,
            stats: file.stats,
            unlocks,
        }
    }

    pub fn stats(&self) -> &PlayStats {
        &self.stats
    }

    /// The full catalogue in a fixed order, locked entries included.
    pub fn achievements(&self) -> Vec<Achievement> {
        AchievementId::ALL
            .into_iter()
            .map(|id| {
                let record = self.unlocks.get(&id);
                Achievement {
                    id,
                    unlocked: record.is_some_and(|r| r.unlocked),
                    unlock_date: record.and_then(|r| r.unlock_date.clone()),
                }
            })
            .collect()
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocks.values().filter(|r| r.unlocked).count()
    }

    /// Share of recorded games won, as a percentage.
    pub fn win_rate(&self) -> f64 {
        if self.stats.total_games == 0 {
            0.0
        } else {
            f64::from(self.stats.total_wins) / f64::from(self.stats.total_games) * 100.0
        }
    }

    /// Folds one finished game into the counters, evaluates the achievement
    /// triggers, and persists the snapshot.
    pub fn record_game(&mut self, outcome: &GameOutcome) -> Result<(), StoreError> {
        self.stats.total_games += 1;
        self.stats.total_time_played += outcome.time_secs;

        if outcome.won {
            self.stats.total_wins += 1;
            let key = config_key(outcome.size, outcome.mines);
            match self.stats.best_times.get(&key) {
                Some(&best) if best <= outcome.time_secs => {}
                _ => {
                    self.stats.best_times.insert(key, outcome.time_secs);
                }
            }
        } else {
            self.stats.total_losses += 1;
        }

        match outcome.size {
            9 => self.stats.games_by_difficulty.beginner += 1,
            16 => self.stats.games_by_difficulty.intermediate += 1,
            22 => self.stats.games_by_difficulty.expert += 1,
            _ => {}
        }
        self.stats.total_flags_placed += u64::from(outcome.flags_placed);
        self.stats.total_cells_revealed += u64::from(outcome.cells_revealed);

        self.check_achievements(outcome);
        self.save()
    }

    fn check_achievements(&mut self, outcome: &GameOutcome) {
        use AchievementId::*;

        let wins = self.stats.total_wins;
        let games = self.stats.total_games;

        if outcome.won {
            if wins == 1 {
                self.unlock(FirstGame);
            }
            if wins >= 10 {
                self.unlock(TenWins);
            }
            if outcome.size == 9 && outcome.time_secs < 30.0 {
                self.unlock(FastBeginner);
            }
            if outcome.flags_all_correct && outcome.flags_placed > 0 {
                self.unlock(PerfectFlag);
            }
            if outcome.size == 22 {
                self.unlock(WinExpert);
            }
            if outcome.no_flags_used {
                self.unlock(NoFlags);
            }
            if outcome.time_secs < 10.0 {
                self.unlock(SpeedDemon);
            }
        }
        if games >= 100 {
            self.unlock(HundredGames);
        }
    }

    /// Unlocks are monotonic; an achievement keeps its first unlock date.
    fn unlock(&mut self, id: AchievementId) {
        let record = self.unlocks.entry(id).or_default();
        if record.unlocked {
            return;
        }
        record.unlocked = true;
        record.unlock_date = Some(Utc::now().to_rfc3339());
        log::debug!("Achievement unlocked: {}", id.title());
    }

    fn save(&self) -> Result<(), StoreError> {
        let file = StatsFile {
            stats: self.stats.clone(),
            achievements: self
                .unlocks
                .iter()
                .map(|(id, record)| (id.key().to_string(), record.clone()))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Key used for best times and leaderboard file names alike.
pub fn config_key(size: Coord, mines: CellCount) -> String {
    format!("{size}x{size}_{mines}mines")
}
