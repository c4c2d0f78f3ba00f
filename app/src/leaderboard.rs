use chrono::Local;
use minado_core::{CellCount, Coord};
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::StoreError;

/// Entries kept per configuration.
pub const MAX_ENTRIES: usize = 10;
/// Longest player name accepted for an entry.
pub const MAX_NAME_LEN: usize = 12;

/// One finished game on a leaderboard. `time_secs` is what the board is
/// ranked by; `date` is display text in local time.
#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub time_secs: f64,
    pub date: String,
    pub size: Coord,
    pub mines: CellCount,
}

impl LeaderboardEntry {
    /// Stamps an entry with the current local date. The name is truncated
    /// to [`MAX_NAME_LEN`] and stripped of the field separator.
    pub fn new(name: &str, time_secs: f64, size: Coord, mines: CellCount) -> Self {
        let name = name
            .chars()
            .filter(|&c| c != '|')
            .take(MAX_NAME_LEN)
            .collect();
        Self {
            name,
            time_secs,
            date: Local::now().format("%Y-%m-%d %H:%M").to_string(),
            size,
            mines,
        }
    }

    fn to_line(&self) -> String {
        format!(
            "{}|{:.2}|{}|{}|{}",
            self.name, self.time_secs, self.date, self.size, self.mines
        )
    }

    fn parse(line: &str) -> Option<LeaderboardEntry> {
        let parts: Vec<&str> = line.trim().split('|').collect();
        if parts.len() != 5 {
            return None;
        }
        Some(LeaderboardEntry {
            name: parts[0].to_string(),
            time_secs: parts[1].parse().ok()?,
            date: parts[2].to_string(),
            size: parts[3].parse().ok()?,
            mines: parts[4].parse().ok()?,
        })
    }
}

/// Directory of per-configuration leaderboard files, one pipe-delimited
/// text file per `(size, mines)` pair.
#[derive(Clone, Debug)]
pub struct LeaderboardStore {
    dir: PathBuf,
}

impl LeaderboardStore {
    /// Opens a store rooted at `dir`, creating the directory when missing.
    /// A directory that cannot be created is only logged; later writes will
    /// fail and be dropped the same way.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(err) = fs::create_dir_all(&dir) {
            log::warn!("Failed to create leaderboard directory {}: {}", dir.display(), err);
        }
        Self { dir }
    }

    fn file_path(&self, size: Coord, mines: CellCount) -> PathBuf {
        self.dir
            .join(format!("leaderboard_{size}x{size}_{mines}mines.txt"))
    }

    /// Entries for one configuration, best time first, at most
    /// [`MAX_ENTRIES`]. A missing file is an empty board; unreadable files
    /// and malformed lines are skipped.
    pub fn load(&self, size: Coord, mines: CellCount) -> Vec<LeaderboardEntry> {
        let path = self.file_path(size, mines);
        if !path.exists() {
            return Vec::new();
        }
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                log::warn!("Failed to read leaderboard {}: {}", path.display(), err);
                return Vec::new();
            }
        };
        let mut entries: Vec<LeaderboardEntry> = contents
            .lines()
            .filter_map(LeaderboardEntry::parse)
            .collect();
        entries.sort_by(|a, b| a.time_secs.total_cmp(&b.time_secs));
        entries.truncate(MAX_ENTRIES);
        entries
    }

    /// Inserts an entry into its configuration's board, keeping the fastest
    /// [`MAX_ENTRIES`]. The file is replaced atomically.
    pub fn record(&self, entry: LeaderboardEntry) -> Result<(), StoreError> {
        let (size, mines) = (entry.size, entry.mines);
        let mut entries = self.load(size, mines);
        entries.push(entry);
        entries.sort_by(|a, b| a.time_secs.total_cmp(&b.time_secs));
        entries.truncate(MAX_ENTRIES);
        self.save(size, mines, &entries)
    }

    fn save(&self, size: Coord, mines: CellCount, entries: &[LeaderboardEntry]) -> Result<(), StoreError> {
        let path = self.file_path(size, mines);
        let mut contents = String::new();
        for entry in entries {
            contents.push_str(&entry.to_line());
            contents.push('\n');
        }
        // write-then-rename so a torn write cannot eat the previous board
        let tmp = path.with_extension("txt.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Removes one configuration's board. Clearing a board that was never
    /// saved is fine.
    pub fn clear(&self, size: Coord, mines: CellCount) -> Result<(), StoreError> {
        match fs::remove_file(self.file_path(size, mines)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Every configuration with a saved board, plus `include` even when it
    /// has none yet, sorted ascending. Stray files are ignored.
    pub fn configurations(&self, include: Option<(Coord, CellCount)>) -> Vec<(Coord, CellCount)> {
        let mut configs: Vec<(Coord, CellCount)> = Vec::new();
        if let Ok(dir) = fs::read_dir(&self.dir) {
            for entry in dir.flatten() {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                if let Some(config) = parse_file_name(name) {
                    configs.push(config);
                }
            }
        }
        if let Some(current) = include {
            if !configs.contains(&current) {
                configs.push(current);
            }
        }
        configs.sort_unstable();
        configs
    }
}

fn parse_file_name(name: &str) -> Option<(Coord, CellCount)> {
    let rest = name
        .strip_prefix("leaderboard_")?
        .strip_suffix("mines.txt")?;
    let (dims, mines) = rest.split_once('_')?;
    let (w, h) = dims.split_once('x')?;
    if w != h {
        return None;
    }
    Some((w.parse().ok()?, mines.parse().ok()?))
}
