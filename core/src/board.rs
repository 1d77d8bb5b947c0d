use rand::Rng;
use tracing::{debug, instrument};

use crate::error::{GameError, Result};

/// Cell value marking a mine. Safe cells hold their neighbour count, 0 through 8.
pub const MINE: i8 = -1;

const DISPLACEMENTS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Square minefield with precomputed neighbour counts, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: usize,
    mine_count: usize,
    cells: Vec<i8>,
}

fn check_params(size: usize, mine_count: usize) -> Result<usize> {
    if size == 0 {
        return Err(GameError::InvalidSize);
    }
    let cells = size.checked_mul(size).ok_or(GameError::InvalidSize)?;
    if mine_count >= cells {
        return Err(GameError::TooManyMines {
            mines: mine_count,
            cells,
        });
    }
    Ok(cells)
}

impl Board {
    /// Places `mine_count` mines uniformly at random, then counts neighbours.
    ///
    /// At least one cell must stay free of mines, so `mine_count` has to be
    /// smaller than `size * size`.
    #[instrument(level = "trace", skip(rng))]
    pub fn generate<R: Rng + ?Sized>(size: usize, mine_count: usize, rng: &mut R) -> Result<Self> {
        let total = check_params(size, mine_count)?;
        let mut cells = vec![0; total];

        let mut placed = 0;
        let mut draws = 0usize;
        while placed < mine_count {
            let row = rng.random_range(0..size);
            let col = rng.random_range(0..size);
            draws += 1;

            let cell = &mut cells[row * size + col];
            if *cell != MINE {
                *cell = MINE;
                placed += 1;
            }
        }

        let mut board = Self {
            size,
            mine_count,
            cells,
        };
        board.count_adjacent_mines();

        debug!(
            "Generated {}x{} board with {} mines in {} draws",
            size, size, mine_count, draws
        );
        Ok(board)
    }

    /// Builds a board with mines at exactly the given positions. Duplicates are ignored.
    pub fn from_mines(size: usize, mines: &[(usize, usize)]) -> Result<Self> {
        if size == 0 {
            return Err(GameError::InvalidSize);
        }
        let total = size.checked_mul(size).ok_or(GameError::InvalidSize)?;
        let mut cells = vec![0; total];

        for &(row, col) in mines {
            if row >= size || col >= size {
                return Err(GameError::OutOfBounds { row, col, size });
            }
            cells[row * size + col] = MINE;
        }

        let mine_count = cells.iter().filter(|&&value| value == MINE).count();
        check_params(size, mine_count)?;

        let mut board = Self {
            size,
            mine_count,
            cells,
        };
        board.count_adjacent_mines();
        Ok(board)
    }

    fn count_adjacent_mines(&mut self) {
        for index in 0..self.cells.len() {
            if self.cells[index] == MINE {
                continue;
            }
            let (row, col) = self.position(index);
            let count = self
                .neighbors(row, col)
                .filter(|&(r, c)| self.is_mine(r, c))
                .count();
            self.cells[index] = count as i8;
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn mine_count(&self) -> usize {
        self.mine_count
    }

    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn safe_cell_count(&self) -> usize {
        self.total_cells() - self.mine_count
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }

    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.size, index % self.size)
    }

    /// Raw cell value: [`MINE`] or the neighbour count.
    pub fn value(&self, row: usize, col: usize) -> i8 {
        self.cells[self.index(row, col)]
    }

    pub fn is_mine(&self, row: usize, col: usize) -> bool {
        self.value(row, col) == MINE
    }

    /// Neighbour count of a safe cell, `None` for a mine.
    pub fn adjacent(&self, row: usize, col: usize) -> Option<u8> {
        u8::try_from(self.value(row, col)).ok()
    }

    pub fn cells(&self) -> &[i8] {
        &self.cells
    }

    /// In-grid positions around `(row, col)`. Edges do not wrap.
    pub fn neighbors(&self, row: usize, col: usize) -> Neighbors {
        Neighbors {
            center: (row, col),
            size: self.size,
            index: 0,
        }
    }
}

#[derive(Debug)]
pub struct Neighbors {
    center: (usize, usize),
    size: usize,
    index: usize,
}

impl Iterator for Neighbors {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&(dr, dc)) = DISPLACEMENTS.get(self.index) {
            self.index += 1;

            let (Some(row), Some(col)) = (
                self.center.0.checked_add_signed(dr),
                self.center.1.checked_add_signed(dc),
            ) else {
                continue;
            };

            if row < self.size && col < self.size {
                return Some((row, col));
            }
        }
        None
    }
}
