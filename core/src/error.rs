use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Board size must be at least 1 and small enough to count its cells")]
    InvalidSize,
    #[error("Too many mines: {mines} requested but the board only has {cells} cells")]
    TooManyMines { mines: usize, cells: usize },
    #[error("Position ({row}, {col}) is outside the {size}x{size} board")]
    OutOfBounds { row: usize, col: usize, size: usize },
}

pub type Result<T> = std::result::Result<T, GameError>;
