use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest board size accepted by the leaderboard.
pub const MIN_BOARD_SIZE: u8 = 8;
/// Largest board size accepted by the leaderboard.
pub const MAX_BOARD_SIZE: u8 = 16;
/// Board sizes offered to players.
pub const BOARD_SIZES: [u8; 4] = [8, 10, 12, 16];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
    Impossible,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Impossible,
    ];

    /// Share of board cells holding a mine, in percent.
    pub const fn density_percent(self) -> usize {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 15,
            Difficulty::Hard => 20,
            Difficulty::Impossible => 25,
        }
    }

    pub fn density(self) -> f64 {
        self.density_percent() as f64 / 100.0
    }

    /// Number of mines on a `size`×`size` board, rounded down.
    ///
    /// `None` when the board is too large to count.
    pub fn mine_count(self, size: usize) -> Option<usize> {
        let cells = size.checked_mul(size)?;
        Some(cells.checked_mul(self.density_percent())? / 100)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Impossible => "impossible",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown difficulty: {0}")]
pub struct ParseDifficultyError(pub String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|difficulty| difficulty.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseDifficultyError(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    InProgress,
    Won,
    Lost,
}

impl GameStatus {
    pub const fn is_finished(self) -> bool {
        matches!(self, GameStatus::Won | GameStatus::Lost)
    }
}

/// What a player can see of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum Cell {
    #[serde(rename = "hidden")]
    Hidden,
    #[serde(rename = "flagged")]
    Flagged,
    #[serde(rename = "revealed")]
    Revealed { adjacent: u8 },
    #[serde(rename = "mine")]
    Mine,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    /// Completion time in whole seconds.
    pub time: u32,
    pub difficulty: Difficulty,
    pub board_size: u8,
    pub date: DateTime<Utc>,
}

/// Payload submitted after a won game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLeaderboardEntry {
    pub name: String,
    pub time: u32,
    pub difficulty: Difficulty,
    pub board_size: u8,
}

impl NewLeaderboardEntry {
    /// Lists every rule the entry breaks. An empty list means the store will accept it.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name: must not be empty".to_string());
        }
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&self.board_size) {
            problems.push(format!(
                "boardSize: must be between {} and {}, got {}",
                MIN_BOARD_SIZE, MAX_BOARD_SIZE, self.board_size
            ));
        }
        problems
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Formats a leaderboard time as `m:ss`.
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
