use serde::{Deserialize, Serialize};

use crate::models::Difficulty;

/// Maximum number of entries returned by a leaderboard query.
pub const LEADERBOARD_LIMIT: usize = 10;

/// Filters of a leaderboard query. Missing filters match every entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub difficulty: Option<Difficulty>,
    pub board_size: Option<u8>,
}

impl LeaderboardQuery {
    pub fn new(difficulty: Difficulty, board_size: u8) -> Self {
        Self {
            difficulty: Some(difficulty),
            board_size: Some(board_size),
        }
    }

    pub fn matches(&self, difficulty: Difficulty, board_size: u8) -> bool {
        self.difficulty.is_none_or(|wanted| wanted == difficulty)
            && self.board_size.is_none_or(|wanted| wanted == board_size)
    }
}

/// JSON body returned alongside a non-success status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(error: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            error: error.into(),
            details,
        }
    }
}
