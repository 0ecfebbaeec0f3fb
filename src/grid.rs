//! Orientation grid: the central artifact passed between strategies,
//! the evaluator and the HTTP layer.
//!
//! A grid is a rectangular rows × columns matrix, rows top to bottom and
//! columns left to right. Its text form uses one symbol per cell:
//! `N` (normal), `R` (rotated) and `O` (gap).

use serde::{Serialize, Serializer};

use crate::model::{Orientation, ValidationError};

/// Single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    Normal,
    Rotated,
    Gap,
}

impl Cell {
    pub fn symbol(self) -> char {
        match self {
            Cell::Normal => 'N',
            Cell::Rotated => 'R',
            Cell::Gap => 'O',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'N' => Some(Cell::Normal),
            'R' => Some(Cell::Rotated),
            'O' | '.' | '-' => Some(Cell::Gap),
            _ => None,
        }
    }

    /// Orientation of the box in this cell, `None` for gaps.
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            Cell::Normal => Some(Orientation::Normal),
            Cell::Rotated => Some(Orientation::Rotated),
            Cell::Gap => None,
        }
    }

    #[inline]
    pub fn is_box(self) -> bool {
        self != Cell::Gap
    }
}

impl From<Orientation> for Cell {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Normal => Cell::Normal,
            Orientation::Rotated => Cell::Rotated,
        }
    }
}

/// Row-major orientation grid.
///
/// Grids handed out by strategies are never mutated afterwards; trial
/// placements go through [`Grid::with_cell`], which returns a modified copy.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Grid {
    rows: usize,
    columns: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates a grid filled with gaps.
    pub fn empty(rows: usize, columns: usize) -> Self {
        if rows == 0 || columns == 0 {
            return Self::default();
        }
        Self {
            rows,
            columns,
            cells: vec![Cell::Gap; rows * columns],
        }
    }

    /// Builds a grid from nested rows; all rows must have equal length.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, ValidationError> {
        let columns = rows.first().map_or(0, Vec::len);
        if let Some(idx) = rows.iter().position(|row| row.len() != columns) {
            return Err(ValidationError::InvalidGrid(format!(
                "row {} has {} cells, expected {}",
                idx,
                rows[idx].len(),
                columns
            )));
        }
        if columns == 0 {
            return Ok(Self::default());
        }
        Ok(Self {
            rows: rows.len(),
            columns,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Parses the text form, one string per row.
    ///
    /// Whitespace between symbols is optional, so `"N R O"` and `"NRO"`
    /// describe the same row.
    ///
    /// # Examples
    /// ```
    /// use layer_it_now::grid::{Cell, Grid};
    ///
    /// let grid = Grid::parse(&["N R", "N O"]).unwrap();
    /// assert_eq!(grid.get(1, 1), Cell::Gap);
    /// assert_eq!(grid.box_count(), 3);
    /// ```
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<Self, ValidationError> {
        let rows = lines
            .iter()
            .enumerate()
            .map(|(row_idx, line)| {
                line.as_ref()
                    .chars()
                    .filter(|c| !c.is_whitespace() && *c != ',')
                    .map(|c| {
                        Cell::from_symbol(c).ok_or_else(|| {
                            ValidationError::InvalidGrid(format!(
                                "unknown symbol '{}' in row {}",
                                c, row_idx
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(rows)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Degenerate grids (no rows or no columns) are empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }

    #[inline]
    pub fn get(&self, row: usize, column: usize) -> Cell {
        self.cells[row * self.columns + column]
    }

    /// Overwrites a cell of a grid that is still under construction.
    #[inline]
    pub(crate) fn set(&mut self, row: usize, column: usize, cell: Cell) {
        self.cells[row * self.columns + column] = cell;
    }

    /// Returns a copy with one cell replaced.
    pub fn with_cell(&self, row: usize, column: usize, cell: Cell) -> Self {
        let mut next = self.clone();
        next.set(row, column, cell);
        next
    }

    /// Cells of one row, left to right.
    pub fn row(&self, row: usize) -> &[Cell] {
        let start = row * self.columns;
        &self.cells[start..start + self.columns]
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, column: usize) -> impl Iterator<Item = Cell> + '_ {
        (0..self.rows).map(move |row| self.get(row, column))
    }

    /// Number of non-gap cells.
    pub fn box_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_box()).count()
    }

    pub fn count_of(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    /// Removes all-gap rows and columns from the grid perimeter.
    ///
    /// Interior gaps are kept. A grid without boxes trims to the empty grid.
    pub fn trimmed(&self) -> Self {
        let occupied_rows: Vec<usize> = (0..self.rows)
            .filter(|&r| self.row(r).iter().any(|c| c.is_box()))
            .collect();
        let occupied_columns: Vec<usize> = (0..self.columns)
            .filter(|&c| self.column(c).any(Cell::is_box))
            .collect();

        let (Some(&top), Some(&bottom)) = (occupied_rows.first(), occupied_rows.last()) else {
            return Self::default();
        };
        let (Some(&left), Some(&right)) = (occupied_columns.first(), occupied_columns.last())
        else {
            return Self::default();
        };

        if top == 0 && left == 0 && bottom + 1 == self.rows && right + 1 == self.columns {
            return self.clone();
        }

        let mut trimmed = Self::empty(bottom - top + 1, right - left + 1);
        for r in top..=bottom {
            for c in left..=right {
                trimmed.set(r - top, c - left, self.get(r, c));
            }
        }
        trimmed
    }

    /// Text form, one `"N R O"` string per row.
    pub fn to_lines(&self) -> Vec<String> {
        (0..self.rows)
            .map(|r| {
                self.row(r)
                    .iter()
                    .map(|c| c.symbol().to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lines().join("\n"))
    }
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_lines().serialize(serializer)
    }
}
