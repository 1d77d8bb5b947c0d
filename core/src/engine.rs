use minesweeper_common::models::GameStatus;
use tracing::{debug, info, instrument, warn};

use crate::{
    board::{Board, MINE},
    mask::Mask,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    /// `cells` were newly revealed and the game goes on.
    Revealed { cells: usize },
    /// The last safe cells were revealed.
    Won { cells: usize },
    /// A mine was hit and the whole board disclosed.
    Lost,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, RevealOutcome::NoChange)
    }

    /// Status after this outcome, given the status before it.
    pub const fn status(self, previous: GameStatus) -> GameStatus {
        match self {
            RevealOutcome::Won { .. } => GameStatus::Won,
            RevealOutcome::Lost => GameStatus::Lost,
            RevealOutcome::NoChange | RevealOutcome::Revealed { .. } => previous,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    NoChange,
    Flagged,
    Unflagged,
}

impl FlagOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, FlagOutcome::NoChange)
    }
}

/// True once every safe cell is revealed. Flags play no part.
pub fn is_won(board: &Board, revealed: &Mask) -> bool {
    board
        .cells()
        .iter()
        .zip(revealed.as_slice())
        .all(|(&value, &shown)| value == MINE || shown)
}

/// Reveals `(row, col)` and whatever the flood fill reaches from it.
///
/// The position must be on the board and both masks must match its size.
/// Hitting a mine discloses every cell and clears all flags.
#[instrument(level = "trace", skip(board, revealed, flagged))]
pub fn reveal(
    board: &Board,
    revealed: &mut Mask,
    flagged: &mut Mask,
    row: usize,
    col: usize,
    status: GameStatus,
) -> RevealOutcome {
    debug_assert_eq!(revealed.size(), board.size());
    debug_assert_eq!(flagged.size(), board.size());

    if status.is_finished() {
        debug!("Ignoring reveal on finished game at ({}, {})", row, col);
        return RevealOutcome::NoChange;
    }
    if revealed.get(row, col) {
        return RevealOutcome::NoChange;
    }
    if flagged.get(row, col) {
        debug!("Ignoring reveal on flagged cell ({}, {})", row, col);
        return RevealOutcome::NoChange;
    }

    if board.is_mine(row, col) {
        warn!("Player hit mine at ({}, {}) - game over!", row, col);
        revealed.fill(true);
        flagged.fill(false);
        return RevealOutcome::Lost;
    }

    let cells = flood_fill(board, revealed, flagged, row, col);
    if is_won(board, revealed) {
        info!("Game won! All safe cells revealed.");
        RevealOutcome::Won { cells }
    } else {
        debug!("Revealed {} cells, game continues", cells);
        RevealOutcome::Revealed { cells }
    }
}

fn flood_fill(board: &Board, revealed: &mut Mask, flagged: &Mask, row: usize, col: usize) -> usize {
    let mut pending = vec![(row, col)];
    let mut cells = 0;

    while let Some((row, col)) = pending.pop() {
        if revealed.get(row, col) || flagged.get(row, col) {
            continue;
        }

        revealed.set(row, col, true);
        cells += 1;

        if board.value(row, col) == 0 {
            pending.extend(
                board
                    .neighbors(row, col)
                    .filter(|&(r, c)| !revealed.get(r, c) && !flagged.get(r, c)),
            );
        }
    }

    cells
}

/// Flips the flag on an unrevealed cell of an unfinished game.
#[instrument(level = "trace", skip(flagged, revealed))]
pub fn toggle_flag(
    flagged: &mut Mask,
    revealed: &Mask,
    row: usize,
    col: usize,
    status: GameStatus,
) -> FlagOutcome {
    if status.is_finished() {
        debug!("Ignoring flag action on finished game at ({}, {})", row, col);
        return FlagOutcome::NoChange;
    }
    if revealed.get(row, col) {
        debug!("Ignoring flag action on revealed cell ({}, {})", row, col);
        return FlagOutcome::NoChange;
    }

    if flagged.toggle(row, col) {
        debug!("Cell ({}, {}) flagged", row, col);
        FlagOutcome::Flagged
    } else {
        debug!("Cell ({}, {}) unflagged", row, col);
        FlagOutcome::Unflagged
    }
}
