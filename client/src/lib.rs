//! Minesweeper Client Library
//!
//! Runs single-player games on top of `minesweeper-core`, times them, and reports
//! winning times to the leaderboard server.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use minesweeper_client::{Difficulty, GameEvent, LeaderboardClient, MinesweeperGame};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let store = Arc::new(LeaderboardClient::new("http://localhost:8000")?);
//!     let mut game = MinesweeperGame::new(store, "ada", 10, Difficulty::Medium)?;
//!     let mut events = game.subscribe_to_events();
//!
//!     game.toggle_flag(0, 0)?;
//!     game.reveal(5, 5)?;
//!
//!     while let Ok(event) = events.try_recv() {
//!         if let GameEvent::GameStatusChanged { status, elapsed_secs } = event {
//!             println!("{:?} after {}s", status, elapsed_secs);
//!         }
//!     }
//!
//!     // resolves once a win has been recorded on the server
//!     game.wait_for_submission().await;
//!     Ok(())
//! }
//! ```
//!
//! Any [`LeaderboardStore`] can stand in for the HTTP client, e.g. in tests.

pub mod client;
pub mod game;

pub use client::{LeaderboardClient, LeaderboardStore};
pub use game::{GameEvent, MinesweeperGame};
pub use minesweeper_common::models::{
    BOARD_SIZES, Cell, Difficulty, GameStatus, LeaderboardEntry, NewLeaderboardEntry, format_time,
};
pub use minesweeper_core::{FlagOutcome, GameError, GameSession, RevealOutcome};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
