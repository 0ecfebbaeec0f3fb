//! Flexible placement: fill heuristics run over a range of grid sizes.
//!
//! Each fill walks the grid column by column and commits a cell only if the
//! whole grid still fits the pallet afterwards.

use crate::geometry::{column_width, fits_with_tolerance, footprint, packing_density};
use crate::grid::{Cell, Grid};
use crate::model::{Box2D, Pallet};

/// Fill heuristics tried on every grid size, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillPattern {
    /// Normal boxes first, rotated boxes into the leftover cells.
    NormalFirst,
    /// Rotated boxes first, normal boxes into the leftover cells.
    RotatedFirst,
    /// Even columns normal, odd columns rotated.
    MixedColumns,
    /// Orientation per column chosen from the remaining pallet width.
    SpaceEfficiency,
}

impl FillPattern {
    pub const ALL: [FillPattern; 4] = [
        FillPattern::NormalFirst,
        FillPattern::RotatedFirst,
        FillPattern::MixedColumns,
        FillPattern::SpaceEfficiency,
    ];

    /// Fills `grid` in place and returns the number of boxes placed.
    pub fn fill(
        self,
        grid: &mut Grid,
        b: &Box2D,
        count: usize,
        pallet: &Pallet,
        tolerance: f64,
    ) -> usize {
        match self {
            FillPattern::NormalFirst => {
                place_with_priority(grid, b, count, Cell::Normal, Cell::Rotated, pallet, tolerance)
            }
            FillPattern::RotatedFirst => {
                place_with_priority(grid, b, count, Cell::Rotated, Cell::Normal, pallet, tolerance)
            }
            FillPattern::MixedColumns => place_mixed_columns(grid, b, count, pallet, tolerance),
            FillPattern::SpaceEfficiency => {
                place_by_space_efficiency(grid, b, count, pallet, tolerance)
            }
        }
    }
}

/// Writes `cell` at `(row, column)` if the grid still fits afterwards.
fn try_commit(
    grid: &mut Grid,
    row: usize,
    column: usize,
    cell: Cell,
    b: &Box2D,
    pallet: &Pallet,
    tolerance: f64,
) -> bool {
    let trial = grid.with_cell(row, column, cell);
    if fits_with_tolerance(&trial, b, pallet, tolerance) {
        *grid = trial;
        true
    } else {
        false
    }
}

/// Two column-major passes over the empty cells: the first places `first`,
/// the second places `second` wherever `first` did not fit.
pub fn place_with_priority(
    grid: &mut Grid,
    b: &Box2D,
    count: usize,
    first: Cell,
    second: Cell,
    pallet: &Pallet,
    tolerance: f64,
) -> usize {
    let mut placed = 0;
    for cell in [first, second] {
        for column in 0..grid.columns() {
            for row in 0..grid.rows() {
                if placed >= count {
                    return placed;
                }
                if grid.get(row, column) == Cell::Gap
                    && try_commit(grid, row, column, cell, b, pallet, tolerance)
                {
                    placed += 1;
                }
            }
        }
    }
    placed
}

/// Alternates normal and rotated columns. A column stops at its first cell
/// that does not fit.
pub fn place_mixed_columns(
    grid: &mut Grid,
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    tolerance: f64,
) -> usize {
    let mut placed = 0;
    for column in 0..grid.columns() {
        let cell = if column % 2 == 0 {
            Cell::Normal
        } else {
            Cell::Rotated
        };
        placed += fill_column(grid, column, cell, count - placed, b, pallet, tolerance);
        if placed >= count {
            break;
        }
    }
    placed
}

/// Picks each column's orientation from the width still available: rotated
/// if the long side fits (normal for square boxes), normal if only the short
/// side fits, otherwise the column stays empty.
pub fn place_by_space_efficiency(
    grid: &mut Grid,
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    tolerance: f64,
) -> usize {
    let mut placed = 0;
    for column in 0..grid.columns() {
        if placed >= count {
            break;
        }
        let used: f64 = (0..column).map(|c| column_width(grid, c, b)).sum();
        let remaining = pallet.width - used;

        let cell = if remaining + tolerance >= b.length {
            if b.width < b.length {
                Cell::Rotated
            } else {
                Cell::Normal
            }
        } else if remaining + tolerance >= b.width {
            Cell::Normal
        } else {
            continue;
        };
        placed += fill_column(grid, column, cell, count - placed, b, pallet, tolerance);
    }
    placed
}

/// Fills one column top-down with `cell` until `limit` boxes are placed or a
/// cell does not fit.
fn fill_column(
    grid: &mut Grid,
    column: usize,
    cell: Cell,
    limit: usize,
    b: &Box2D,
    pallet: &Pallet,
    tolerance: f64,
) -> usize {
    let mut placed = 0;
    for row in 0..grid.rows() {
        if placed >= limit || !try_commit(grid, row, column, cell, b, pallet, tolerance) {
            break;
        }
        placed += 1;
    }
    placed
}

/// Runs the fill patterns on a single `rows × columns` grid and returns the
/// first one that places all boxes.
pub fn try_flexible_placement(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    rows: usize,
    columns: usize,
    tolerance: f64,
) -> Option<Grid> {
    FillPattern::ALL.into_iter().find_map(|pattern| {
        let mut grid = Grid::empty(rows, columns);
        let placed = pattern.fill(&mut grid, b, count, pallet, tolerance);
        if placed >= count && fits_with_tolerance(&grid, b, pallet, tolerance) {
            log::debug!("{:?} placed {} boxes in {}x{}", pattern, placed, rows, columns);
            Some(grid)
        } else {
            None
        }
    })
}

/// Tries every grid size up to `max_rows × max_columns` that has room for
/// `count` boxes and keeps the result with the best box-area to footprint
/// ratio.
pub fn flexible_arrangement(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    max_rows: usize,
    max_columns: usize,
    tolerance: f64,
) -> Option<Grid> {
    let mut best: Option<(f64, Grid)> = None;

    for rows in 1..=max_rows {
        for columns in 1..=max_columns {
            if rows * columns < count {
                continue;
            }
            let Some(grid) = try_flexible_placement(b, count, pallet, rows, columns, tolerance)
            else {
                continue;
            };
            if footprint(&grid, b).area() <= 0.0 {
                continue;
            }
            let density = packing_density(&grid, b);
            if best.as_ref().is_none_or(|(current, _)| density > *current) {
                best = Some((density, grid));
            }
        }
    }
    best.map(|(_, grid)| grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fits;
    use crate::types::EPSILON_GENERAL;

    #[test]
    fn normal_first_fills_column_major() {
        let b = Box2D::new(10.0, 20.0).unwrap();
        let pallet = Pallet::new(50.0, 50.0).unwrap();
        let mut grid = Grid::empty(2, 2);
        let placed = place_with_priority(
            &mut grid,
            &b,
            3,
            Cell::Normal,
            Cell::Rotated,
            &pallet,
            EPSILON_GENERAL,
        );
        assert_eq!(placed, 3);
        assert_eq!(grid.to_lines(), vec!["N N", "N O"]);
    }

    #[test]
    fn priority_falls_back_to_second_orientation() {
        // a third normal box would need 60 > 50
        let b = Box2D::new(10.0, 20.0).unwrap();
        let pallet = Pallet::new(10.0, 50.0).unwrap();
        let mut grid = Grid::empty(3, 1);
        let placed = place_with_priority(
            &mut grid,
            &b,
            3,
            Cell::Normal,
            Cell::Rotated,
            &pallet,
            EPSILON_GENERAL,
        );
        // a rotated box is 20 wide and cannot join the 10 wide column
        assert_eq!(placed, 2);
        assert_eq!(grid.column(0).collect::<Vec<_>>()[2], Cell::Gap);
    }

    #[test]
    fn mixed_columns_alternate() {
        let b = Box2D::new(10.0, 20.0).unwrap();
        let pallet = Pallet::default();
        let mut grid = Grid::empty(2, 2);
        let placed = place_mixed_columns(&mut grid, &b, 4, &pallet, EPSILON_GENERAL);
        assert_eq!(placed, 4);
        assert_eq!(grid.to_lines(), vec!["N R", "N R"]);
    }

    #[test]
    fn space_efficiency_uses_remaining_width() {
        // 20 + 20 leaves 5, too narrow for either orientation
        let b = Box2D::new(10.0, 20.0).unwrap();
        let pallet = Pallet::new(45.0, 48.0).unwrap();
        let mut grid = Grid::empty(2, 3);
        let placed = place_by_space_efficiency(&mut grid, &b, 6, &pallet, EPSILON_GENERAL);
        assert_eq!(placed, 4);
        assert_eq!(grid.to_lines(), vec!["R R O", "R R O"]);
    }

    #[test]
    fn flexible_arrangement_finds_valid_grid() {
        let b = Box2D::new(6.0, 9.0).unwrap();
        let pallet = Pallet::default();
        let grid = flexible_arrangement(&b, 20, &pallet, 8, 8, EPSILON_GENERAL).unwrap();
        assert!(grid.box_count() >= 20);
        assert!(fits(&grid, &b, &pallet));
    }

    #[test]
    fn flexible_arrangement_respects_grid_cap() {
        let b = Box2D::new(1.0, 1.0).unwrap();
        assert!(flexible_arrangement(&b, 65, &Pallet::default(), 8, 8, EPSILON_GENERAL).is_none());
    }
}
