use minesweeper_common::models::{Cell, Difficulty, GameStatus};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info, instrument, warn};

use crate::{
    board::Board,
    engine::{self, FlagOutcome, RevealOutcome},
    error::{GameError, Result},
    mask::Mask,
};

/// One player's game: the board plus everything they have revealed or flagged.
///
/// Starting a new game replaces all of it at once. The random source is kept
/// so every board of a seeded session is reproducible.
#[derive(Debug)]
pub struct GameSession<R = StdRng> {
    rng: R,
    difficulty: Difficulty,
    board: Board,
    revealed: Mask,
    flagged: Mask,
    status: GameStatus,
}

fn mines_for(size: usize, difficulty: Difficulty) -> Result<usize> {
    difficulty.mine_count(size).ok_or_else(|| {
        warn!("Board size {} is too large", size);
        GameError::InvalidSize
    })
}

impl GameSession<StdRng> {
    pub fn new(size: usize, difficulty: Difficulty) -> Result<Self> {
        Self::with_rng(size, difficulty, StdRng::from_os_rng())
    }

    pub fn seeded(size: usize, difficulty: Difficulty, seed: u64) -> Result<Self> {
        Self::with_rng(size, difficulty, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> GameSession<R> {
    #[instrument(level = "trace", skip(rng))]
    pub fn with_rng(size: usize, difficulty: Difficulty, mut rng: R) -> Result<Self> {
        let board = Board::generate(size, mines_for(size, difficulty)?, &mut rng)?;
        info!(
            "Creating new game: {}x{} on {} with {} mines",
            size,
            size,
            difficulty,
            board.mine_count()
        );
        Ok(Self::fresh(rng, difficulty, board))
    }

    /// Discards the current game and deals a fresh board.
    ///
    /// On error the current game is kept as it was.
    #[instrument(level = "trace", skip(self))]
    pub fn new_game(&mut self, size: usize, difficulty: Difficulty) -> Result<()> {
        let board = Board::generate(size, mines_for(size, difficulty)?, &mut self.rng)?;
        info!(
            "Starting new game: {}x{} on {} with {} mines",
            size,
            size,
            difficulty,
            board.mine_count()
        );

        self.difficulty = difficulty;
        self.revealed = Mask::new(size);
        self.flagged = Mask::new(size);
        self.board = board;
        self.status = GameStatus::InProgress;
        Ok(())
    }

    /// New board with the current size and difficulty.
    pub fn restart(&mut self) -> Result<()> {
        self.new_game(self.board.size(), self.difficulty)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn reveal(&mut self, row: usize, col: usize) -> Result<RevealOutcome> {
        self.check_bounds(row, col)?;

        let outcome = engine::reveal(
            &self.board,
            &mut self.revealed,
            &mut self.flagged,
            row,
            col,
            self.status,
        );
        let status = outcome.status(self.status);
        if status != self.status {
            info!("Game status changed: {:?} -> {:?}", self.status, status);
            self.status = status;
        }
        Ok(outcome)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn toggle_flag(&mut self, row: usize, col: usize) -> Result<FlagOutcome> {
        self.check_bounds(row, col)?;
        Ok(engine::toggle_flag(
            &mut self.flagged,
            &self.revealed,
            row,
            col,
            self.status,
        ))
    }

    fn check_bounds(&self, row: usize, col: usize) -> Result<()> {
        if self.board.contains(row, col) {
            Ok(())
        } else {
            warn!("Invalid position: ({}, {})", row, col);
            Err(GameError::OutOfBounds {
                row,
                col,
                size: self.board.size(),
            })
        }
    }
}

impl<R> GameSession<R> {
    /// Wraps an existing board, e.g. a hand-made layout.
    pub fn from_board(board: Board, difficulty: Difficulty, rng: R) -> Self {
        debug!(
            "Starting game from a {}x{} layout with {} mines",
            board.size(),
            board.size(),
            board.mine_count()
        );
        Self::fresh(rng, difficulty, board)
    }

    fn fresh(rng: R, difficulty: Difficulty, board: Board) -> Self {
        let size = board.size();
        Self {
            rng,
            difficulty,
            board,
            revealed: Mask::new(size),
            flagged: Mask::new(size),
            status: GameStatus::InProgress,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn mine_count(&self) -> usize {
        self.board.mine_count()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn revealed(&self) -> &Mask {
        &self.revealed
    }

    pub fn flagged(&self) -> &Mask {
        &self.flagged
    }

    pub fn is_revealed(&self, row: usize, col: usize) -> bool {
        self.board.contains(row, col) && self.revealed.get(row, col)
    }

    pub fn is_flagged(&self, row: usize, col: usize) -> bool {
        self.board.contains(row, col) && self.flagged.get(row, col)
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed.count()
    }

    pub fn flag_count(&self) -> usize {
        self.flagged.count()
    }

    /// Mines minus flags. Goes negative when the player over-flags.
    pub fn mines_left(&self) -> isize {
        self.board.mine_count() as isize - self.flag_count() as isize
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        if !self.board.contains(row, col) {
            return None;
        }
        Some(if self.revealed.get(row, col) {
            match self.board.adjacent(row, col) {
                Some(adjacent) => Cell::Revealed { adjacent },
                None => Cell::Mine,
            }
        } else if self.flagged.get(row, col) {
            Cell::Flagged
        } else {
            Cell::Hidden
        })
    }

    /// Row-major snapshot of what the player currently sees.
    pub fn cells(&self) -> Vec<Vec<Cell>> {
        let size = self.board.size();
        (0..size)
            .map(|row| (0..size).filter_map(|col| self.cell(row, col)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_mine_session() -> GameSession {
        let board = Board::from_mines(8, &[(0, 0)]).unwrap();
        GameSession::from_board(board, Difficulty::Easy, StdRng::seed_from_u64(0))
    }

    #[test]
    fn new_game_uses_difficulty_density() {
        let session = GameSession::seeded(10, Difficulty::Hard, 3).unwrap();
        assert_eq!(session.mine_count(), 20);
        assert_eq!(session.status(), GameStatus::InProgress);
        assert_eq!(session.revealed_count(), 0);
        assert_eq!(session.flag_count(), 0);
    }

    #[test]
    fn new_game_resets_a_finished_game() {
        let mut session = single_mine_session();
        session.reveal(0, 0).unwrap();
        assert_eq!(session.status(), GameStatus::Lost);

        session.new_game(12, Difficulty::Medium).unwrap();

        assert_eq!(session.status(), GameStatus::InProgress);
        assert_eq!(session.size(), 12);
        assert_eq!(session.mine_count(), 21);
        assert_eq!(session.revealed_count(), 0);
        assert_eq!(session.difficulty(), Difficulty::Medium);
    }

    #[test]
    fn failed_new_game_keeps_the_current_one() {
        let mut session = single_mine_session();
        session.toggle_flag(3, 3).unwrap();

        assert_eq!(
            session.new_game(0, Difficulty::Hard),
            Err(GameError::InvalidSize)
        );
        assert_eq!(session.size(), 8);
        assert!(session.is_flagged(3, 3));
    }

    #[test]
    fn oversized_boards_are_a_configuration_error() {
        assert_eq!(
            GameSession::seeded(usize::MAX / 2, Difficulty::Hard, 1).unwrap_err(),
            GameError::InvalidSize
        );

        let mut session = single_mine_session();
        session.toggle_flag(3, 3).unwrap();

        assert_eq!(
            session.new_game(usize::MAX, Difficulty::Easy),
            Err(GameError::InvalidSize)
        );
        assert_eq!(session.size(), 8);
        assert_eq!(session.mine_count(), 1);
        assert!(session.is_flagged(3, 3));
        assert_eq!(session.status(), GameStatus::InProgress);
    }

    #[test]
    fn seeded_sessions_deal_the_same_boards() {
        let mut a = GameSession::seeded(16, Difficulty::Impossible, 99).unwrap();
        let mut b = GameSession::seeded(16, Difficulty::Impossible, 99).unwrap();
        assert_eq!(a.board(), b.board());

        a.restart().unwrap();
        b.restart().unwrap();
        assert_eq!(a.board(), b.board());
    }

    #[test]
    fn out_of_bounds_moves_are_rejected_without_change() {
        let mut session = single_mine_session();
        assert_eq!(
            session.reveal(8, 0),
            Err(GameError::OutOfBounds {
                row: 8,
                col: 0,
                size: 8
            })
        );
        assert!(session.toggle_flag(0, 100).is_err());
        assert_eq!(session.revealed_count(), 0);
        assert_eq!(session.flag_count(), 0);
        assert_eq!(session.status(), GameStatus::InProgress);
        assert_eq!(session.cell(8, 8), None);
    }

    #[test]
    fn one_click_wins_the_single_mine_board() {
        let mut session = single_mine_session();
        assert_eq!(session.reveal(7, 7), Ok(RevealOutcome::Won { cells: 63 }));
        assert_eq!(session.status(), GameStatus::Won);
        assert_eq!(session.cell(0, 0), Some(Cell::Hidden));
        assert_eq!(session.cell(1, 1), Some(Cell::Revealed { adjacent: 1 }));
        assert_eq!(session.cell(7, 7), Some(Cell::Revealed { adjacent: 0 }));
    }

    #[test]
    fn finished_session_ignores_moves() {
        let mut session = single_mine_session();
        session.reveal(7, 7).unwrap();

        assert_eq!(session.toggle_flag(0, 0), Ok(FlagOutcome::NoChange));
        assert_eq!(session.reveal(0, 0), Ok(RevealOutcome::NoChange));
        assert_eq!(session.status(), GameStatus::Won);
        assert!(!session.is_revealed(0, 0));
    }

    #[test]
    fn snapshot_shows_flags_and_mines() {
        let mut session = single_mine_session();
        session.toggle_flag(2, 2).unwrap();
        session.toggle_flag(4, 4).unwrap();
        assert_eq!(session.mines_left(), -1);

        let cells = session.cells();
        assert_eq!(cells.len(), 8);
        assert!(cells.iter().all(|row| row.len() == 8));
        assert_eq!(cells[2][2], Cell::Flagged);

        session.reveal(0, 0).unwrap();
        let cells = session.cells();
        assert_eq!(cells[0][0], Cell::Mine);
        assert_eq!(cells[2][2], Cell::Revealed { adjacent: 0 });
        assert_eq!(session.flag_count(), 0);
    }
}
