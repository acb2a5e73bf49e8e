//! Rectangular grid of cells holding agent indices.

use crate::model::Pos;

/// Content of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    /// Index of the occupying agent in the engine's roster.
    Occupied(usize),
}

/// Fixed-size grid stored in row-major order.
///
/// The grid never owns agents, it only records which roster index sits in
/// each cell. Neighbourhoods are Chebyshev squares clipped to the grid.
#[derive(Debug, Clone)]
pub struct Grid {
    n_rows: usize,
    n_cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an empty grid.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            cells: vec![Cell::Empty; n_rows * n_cols],
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn cell(&self, pos: Pos) -> Cell {
        self.cells[self.idx(pos)]
    }

    pub fn is_empty(&self, pos: Pos) -> bool {
        self.cell(pos) == Cell::Empty
    }

    pub fn occupant(&self, pos: Pos) -> Option<usize> {
        match self.cell(pos) {
            Cell::Empty => None,
            Cell::Occupied(i_agt) => Some(i_agt),
        }
    }

    /// Iterate over all positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + use<> {
        let n_cols = self.n_cols;
        (0..self.n_rows).flat_map(move |row| (0..n_cols).map(move |col| Pos::new(row, col)))
    }

    /// Put an agent in an empty cell.
    pub fn place(&mut self, pos: Pos, i_agt: usize) {
        let idx = self.idx(pos);
        debug_assert_eq!(self.cells[idx], Cell::Empty, "cell {pos:?} is occupied");
        self.cells[idx] = Cell::Occupied(i_agt);
    }

    /// Move the occupant of `from` into the empty cell `to`.
    pub fn move_occupant(&mut self, from: Pos, to: Pos) {
        let i_from = self.idx(from);
        let i_to = self.idx(to);
        debug_assert_ne!(self.cells[i_from], Cell::Empty, "cell {from:?} is empty");
        debug_assert_eq!(self.cells[i_to], Cell::Empty, "cell {to:?} is occupied");
        self.cells[i_to] = self.cells[i_from];
        self.cells[i_from] = Cell::Empty;
    }

    /// Positions within Chebyshev distance `radius` of `pos`, excluding `pos` itself.
    pub fn neighbors(&self, pos: Pos, radius: usize) -> impl Iterator<Item = Pos> + use<> {
        let row_min = pos.row.saturating_sub(radius);
        let row_max = (pos.row + radius).min(self.n_rows - 1);
        let col_min = pos.col.saturating_sub(radius);
        let col_max = (pos.col + radius).min(self.n_cols - 1);
        (row_min..=row_max)
            .flat_map(move |row| (col_min..=col_max).map(move |col| Pos::new(row, col)))
            .filter(move |&nbr| nbr != pos)
    }

    /// Empty cells adjacent to `pos`.
    pub fn empty_neighbors(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        self.neighbors(pos, 1).filter(move |&nbr| self.is_empty(nbr))
    }

    /// Number of empty cells adjacent to `pos`.
    pub fn count_empty_neighbors(&self, pos: Pos) -> usize {
        self.empty_neighbors(pos).count()
    }

    /// Agents within Chebyshev distance `radius` of `pos`, excluding its occupant.
    pub fn occupants_within(&self, pos: Pos, radius: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbors(pos, radius).filter_map(move |nbr| self.occupant(nbr))
    }

    fn idx(&self, pos: Pos) -> usize {
        debug_assert!(pos.row < self.n_rows && pos.col < self.n_cols);
        pos.row * self.n_cols + pos.col
    }
}
