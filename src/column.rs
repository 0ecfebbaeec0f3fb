//! Column-wise placement.
//!
//! Builds a grid column by column, left to right. Every column receives an
//! even share of the remaining boxes; if the share is too tall for the
//! pallet, boxes are rotated from the bottom up, and if that still fails the
//! column gives up cells to gaps.

use crate::geometry::{fits_with_tolerance, stacked_height};
use crate::grid::{Cell, Grid};
use crate::model::{Box2D, Pallet};

/// Orientation sequence of one column, top to bottom: `normal` N cells
/// followed by `rotated` R cells followed by `gaps` gap cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ColumnPlan {
    normal: usize,
    rotated: usize,
    gaps: usize,
}

impl ColumnPlan {
    fn boxes(&self) -> usize {
        self.normal + self.rotated
    }

    fn cells(&self) -> impl Iterator<Item = Cell> {
        std::iter::repeat_n(Cell::Normal, self.normal)
            .chain(std::iter::repeat_n(Cell::Rotated, self.rotated))
            .chain(std::iter::repeat_n(Cell::Gap, self.gaps))
    }
}

/// Finds the first rotation count `k` so that `boxes - k` normal boxes on
/// top of `k` rotated boxes fit the pallet length.
fn rotation_split(boxes: usize, b: &Box2D, pallet: &Pallet, tolerance: f64) -> Option<usize> {
    (0..=boxes).find(|&rotated| {
        let height = stacked_height(
            std::iter::repeat_n(Cell::Normal, boxes - rotated)
                .chain(std::iter::repeat_n(Cell::Rotated, rotated)),
            b,
        );
        height <= pallet.length + tolerance
    })
}

/// Plans a single column holding up to `boxes` boxes in a grid of `rows`.
fn plan_column(
    boxes: usize,
    rows: usize,
    b: &Box2D,
    pallet: &Pallet,
    tolerance: f64,
) -> Option<ColumnPlan> {
    if let Some(rotated) = rotation_split(boxes, b, pallet, tolerance) {
        return Some(ColumnPlan {
            normal: boxes - rotated,
            rotated,
            gaps: 0,
        });
    }

    for gaps in 1..=rows.saturating_sub(boxes) {
        let reduced = match boxes.checked_sub(gaps) {
            Some(reduced) if reduced > 0 => reduced,
            _ => break,
        };
        if let Some(rotated) = rotation_split(reduced, b, pallet, tolerance) {
            return Some(ColumnPlan {
                normal: reduced - rotated,
                rotated,
                gaps,
            });
        }
    }
    None
}

/// Attempts to build a `rows × columns` grid for `count` boxes.
///
/// Returns `None` when a column cannot be made to fit or the finished grid
/// exceeds the pallet. Columns that had to give up cells to gaps reduce the
/// delivered box count, so the returned grid may hold fewer than `count`
/// boxes; callers compare [`Grid::box_count`] against their target.
pub fn try_arrangement(
    rows: usize,
    columns: usize,
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    tolerance: f64,
) -> Option<Grid> {
    if rows == 0 || columns == 0 {
        return None;
    }

    let mut grid = Grid::empty(rows, columns);
    let mut placed = 0usize;

    for column in 0..columns {
        let remaining = count.saturating_sub(placed);
        let remaining_columns = columns - column;
        let boxes_in_column = rows.min(remaining.div_ceil(remaining_columns));
        if boxes_in_column == 0 {
            continue;
        }

        let Some(plan) = plan_column(boxes_in_column, rows, b, pallet, tolerance) else {
            log::debug!(
                "column {} of {}x{} cannot hold {} boxes",
                column,
                rows,
                columns,
                boxes_in_column
            );
            return None;
        };

        for (row, cell) in plan.cells().enumerate() {
            grid.set(row, column, cell);
        }
        placed += plan.boxes();
    }

    if !fits_with_tolerance(&grid, b, pallet, tolerance) {
        log::debug!("{}x{} exceeds {}", rows, columns, pallet);
        return None;
    }
    Some(grid)
}
