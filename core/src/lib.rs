//! Single-player minesweeper rules.
//!
//! [`Board`] deals the mines, the [`engine`] functions apply one move to a
//! board and its reveal/flag masks, and [`GameSession`] ties them together
//! behind the operations a player actually performs.
//!
//! ```rust
//! use minesweeper_core::{Difficulty, GameSession};
//!
//! let mut session = GameSession::seeded(10, Difficulty::Hard, 7)?;
//! assert_eq!(session.mine_count(), 20);
//!
//! session.toggle_flag(0, 0)?;
//! session.reveal(5, 5)?;
//! assert_ne!(session.revealed_count(), 0);
//! # Ok::<(), minesweeper_core::GameError>(())
//! ```

pub mod board;
pub mod engine;
pub mod error;
pub mod mask;
pub mod session;

pub use board::{Board, MINE};
pub use engine::{FlagOutcome, RevealOutcome};
pub use error::{GameError, Result};
pub use mask::Mask;
pub use session::GameSession;

pub use minesweeper_common::models::{Cell, Difficulty, GameStatus};
