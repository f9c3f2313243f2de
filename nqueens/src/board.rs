use agal::evolution::StateManager;
use agal::{FitnessDirection, FitnessEvaluator};

use rand::Rng;
use serde::Serialize;

/// An n×n chessboard holding one queen per column.
///
/// Boards serialize for display only. They are never read
/// back, since the conflict count must agree with the
/// positions, which only [`Board::new`] guarantees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Board {
    /// The row of the queen in each column.
    positions: Vec<usize>,
    conflicts: i64,
}

impl Board {
    /// Creates a board with the queen of column `i`
    /// on row `positions[i]`.
    ///
    /// # Panics
    /// Panics if any row is outside of the board.
    pub fn new(positions: Vec<usize>) -> Board {
        let conflicts = count_conflicts(&positions);
        Board {
            positions,
            conflicts,
        }
    }

    /// Creates a `size`×`size` board with randomly placed queens.
    pub fn random(size: usize) -> Board {
        let mut rng = rand::thread_rng();
        Board::new((0..size).map(|_| rng.gen_range(0..size)).collect())
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Returns the number of pairs of queens attacking
    /// each other, along rows or diagonals.
    pub fn conflicts(&self) -> i64 {
        self.conflicts
    }

    pub fn size(&self) -> usize {
        self.positions.len()
    }

    /// Moves the queen in `column` to `row`.
    pub fn place(&mut self, column: usize, row: usize) {
        self.positions[column] = row;
        self.conflicts = count_conflicts(&self.positions);
    }
}

/// Counts attacking pairs in linear time. Each queen placed
/// on a line conflicts with every queen already on it.
fn count_conflicts(positions: &[usize]) -> i64 {
    let size = positions.len();
    if size == 0 {
        return 0;
    }
    let mut rows = vec![0i64; size];
    let mut rising = vec![0i64; 2 * size - 1];
    let mut falling = vec![0i64; 2 * size - 1];

    let mut conflicts = 0;
    for (column, &row) in positions.iter().enumerate() {
        for count in [
            &mut rows[row],
            &mut rising[column + row],
            &mut falling[size - 1 - row + column],
        ] {
            conflicts += *count;
            *count += 1;
        }
    }
    conflicts
}

/// Creates, combines and scores boards of a fixed size.
/// Fewer conflicts is fitter.
#[derive(Clone, Copy, Debug)]
pub struct QueensManager {
    size: usize,
}

impl QueensManager {
    pub fn new(size: usize) -> QueensManager {
        QueensManager { size }
    }

    /// Returns the largest number of conflicts possible,
    /// with every queen on the same row.
    pub fn max_conflicts(&self) -> i64 {
        let size = self.size as i64;
        size * (size - 1) / 2
    }

    /// Moves a random queen to a random row.
    pub fn mutate(&self, board: &mut Board) {
        let mut rng = rand::thread_rng();
        board.place(rng.gen_range(0..self.size), rng.gen_range(0..self.size));
    }
}

impl StateManager<Board> for QueensManager {
    fn randomize(&self) -> Board {
        Board::random(self.size)
    }

    /// Single point crossover: the mother's columns up to a
    /// random point, followed by the father's.
    fn reproduce(&self, mother: &Board, father: &Board) -> Board {
        let cut = rand::thread_rng().gen_range(0..self.size);
        Board::new(
            mother.positions[..cut]
                .iter()
                .chain(&father.positions[cut..])
                .copied()
                .collect(),
        )
    }
}

impl FitnessEvaluator<Board> for QueensManager {
    fn fitness(&self, board: &Board) -> i64 {
        board.conflicts()
    }

    fn direction(&self) -> FitnessDirection {
        FitnessDirection::LowerIsBetter
    }
}
