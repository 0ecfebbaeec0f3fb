//! Geometric evaluation of orientation grids.
//!
//! This is the fitness oracle of every search strategy. Columns are placed
//! side by side and boxes are stacked inside a column, so:
//! - a column is as wide as its widest box
//! - a column is as tall as the sum of its box heights
//! - the layer is as wide as the sum of its columns and as tall as its
//!   tallest column
//!
//! All functions are pure and may be called any number of times.

use serde::Serialize;
use utoipa::ToSchema;

use crate::grid::{Cell, Grid};
use crate::model::{Box2D, Pallet};
use crate::types::EPSILON_GENERAL;

/// Rectangular envelope occupied by a grid.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, ToSchema)]
pub struct Footprint {
    pub width: f64,
    pub height: f64,
}

impl Footprint {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Horizontal extent of a cell.
#[inline]
pub fn cell_width(cell: Cell, b: &Box2D) -> f64 {
    match cell {
        Cell::Normal => b.width,
        Cell::Rotated => b.length,
        Cell::Gap => 0.0,
    }
}

/// Vertical extent of a cell.
#[inline]
pub fn cell_height(cell: Cell, b: &Box2D) -> f64 {
    match cell {
        Cell::Normal => b.length,
        Cell::Rotated => b.width,
        Cell::Gap => 0.0,
    }
}

/// Width of a single column (widest box in it).
pub fn column_width(grid: &Grid, column: usize, b: &Box2D) -> f64 {
    grid.column(column)
        .map(|cell| cell_width(cell, b))
        .fold(0.0, f64::max)
}

/// Height of a single column (sum of stacked boxes).
pub fn column_height(grid: &Grid, column: usize, b: &Box2D) -> f64 {
    grid.column(column).map(|cell| cell_height(cell, b)).sum()
}

/// Height of a column described by its orientation sequence.
pub fn stacked_height<I>(cells: I, b: &Box2D) -> f64
where
    I: IntoIterator<Item = Cell>,
{
    cells.into_iter().map(|cell| cell_height(cell, b)).sum()
}

/// Calculates the envelope of a grid.
///
/// # Examples
/// ```
/// use layer_it_now::geometry::footprint;
/// use layer_it_now::grid::Grid;
/// use layer_it_now::model::Box2D;
///
/// let b = Box2D::new(10.0, 20.0).unwrap();
/// let grid = Grid::parse(&["N N", "N N"]).unwrap();
/// let fp = footprint(&grid, &b);
/// assert_eq!((fp.width, fp.height), (20.0, 40.0));
/// ```
pub fn footprint(grid: &Grid, b: &Box2D) -> Footprint {
    if grid.is_empty() {
        return Footprint::default();
    }

    (0..grid.columns()).fold(Footprint::default(), |acc, column| Footprint {
        width: acc.width + column_width(grid, column, b),
        height: acc.height.max(column_height(grid, column, b)),
    })
}

/// Checks whether a grid fits on the pallet.
///
/// Degenerate grids trivially fit.
pub fn fits(grid: &Grid, b: &Box2D, pallet: &Pallet) -> bool {
    fits_with_tolerance(grid, b, pallet, EPSILON_GENERAL)
}

/// Same as [`fits`] with an explicit comparison tolerance.
pub fn fits_with_tolerance(grid: &Grid, b: &Box2D, pallet: &Pallet, tolerance: f64) -> bool {
    if grid.is_empty() {
        return true;
    }
    footprint_fits(footprint(grid, b), pallet, tolerance)
}

/// Alias of [`fits`] under the name the HTTP layer exposes.
pub fn evaluate_fit(grid: &Grid, b: &Box2D, pallet: &Pallet) -> bool {
    fits(grid, b, pallet)
}

/// Checks a precomputed footprint against the pallet.
#[inline]
pub fn footprint_fits(fp: Footprint, pallet: &Pallet, tolerance: f64) -> bool {
    fp.width <= pallet.width + tolerance && fp.height <= pallet.length + tolerance
}

/// Deviation of `rows / columns` from the target stability ratio.
///
/// Lower is better; zero columns score `+inf`.
pub fn ratio_score(rows: usize, columns: usize, target_ratio: f64) -> f64 {
    if columns == 0 {
        return f64::INFINITY;
    }
    (rows as f64 / columns as f64 - target_ratio).abs()
}

/// Symmetric utilisation ratio between footprint and pallet (0.0 to 1.0).
///
/// Over- and under-filling are penalised alike; an empty footprint scores 0.
pub fn area_efficiency(fp: Footprint, pallet: &Pallet) -> f64 {
    let footprint_area = fp.area();
    let pallet_area = pallet.area();
    if footprint_area <= EPSILON_GENERAL || pallet_area <= EPSILON_GENERAL {
        return 0.0;
    }
    (footprint_area / pallet_area).min(pallet_area / footprint_area)
}

/// Share of the footprint covered by boxes (0.0 to 1.0).
pub fn packing_density(grid: &Grid, b: &Box2D) -> f64 {
    let fp = footprint(grid, b);
    if fp.area() <= EPSILON_GENERAL {
        return 0.0;
    }
    grid.box_count() as f64 * b.area() / fp.area()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_box() -> Box2D {
        Box2D::new(10.0, 20.0).unwrap()
    }

    #[test]
    fn footprint_accumulates_columns() {
        let b = test_box();
        let grid = Grid::parse(&["N R", "N R", "O R"]).unwrap();
        let fp = footprint(&grid, &b);
        // column 0: width 10, height 40; column 1: width 20, height 30
        assert!((fp.width - 30.0).abs() < EPSILON_GENERAL);
        assert!((fp.height - 40.0).abs() < EPSILON_GENERAL);
        assert!((fp.area() - 1200.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn two_by_two_normal_area() {
        let b = test_box();
        let grid = Grid::parse(&["N N", "N N"]).unwrap();
        assert!((footprint(&grid, &b).area() - 800.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn fits_checks_both_axes() {
        let b = test_box();
        let pallet = Pallet::new(50.0, 50.0).unwrap();

        let small = Grid::parse(&["N N"]).unwrap();
        assert!(fits(&small, &b, &pallet));

        let rows: Vec<String> = (0..10).map(|_| "N".repeat(10)).collect();
        let large = Grid::parse(&rows).unwrap();
        assert!(!fits(&large, &b, &pallet));
    }

    #[test]
    fn degenerate_grid_trivially_fits() {
        let b = test_box();
        let tiny = Pallet::new(1.0, 1.0).unwrap();
        assert!(fits(&Grid::default(), &b, &tiny));
        assert_eq!(footprint(&Grid::empty(0, 3), &b), Footprint::default());
    }

    #[test]
    fn fits_is_idempotent() {
        let b = Box2D::new(5.0, 8.0).unwrap();
        let pallet = Pallet::default();
        let grid = Grid::parse(&["N R N", "N R N", "R O N"]).unwrap();
        let first = fits(&grid, &b, &pallet);
        let second = fits(&grid, &b, &pallet);
        assert_eq!(first, second);
        assert_eq!(footprint(&grid, &b), footprint(&grid, &b));
    }

    #[test]
    fn gap_only_end_columns_do_not_change_footprint() {
        let b = test_box();
        let core = Grid::parse(&["N R", "N O"]).unwrap();
        let padded = Grid::parse(&["O N R O", "O N O O"]).unwrap();
        assert_eq!(footprint(&core, &b), footprint(&padded, &b));

        let flipped = Grid::parse(&["R R", "N O"]).unwrap();
        assert_ne!(footprint(&core, &b), footprint(&flipped, &b));
    }

    #[test]
    fn single_cell_fits_when_box_fits() {
        let b = Box2D::new(15.0, 30.0).unwrap();
        let pallet = Pallet::default();
        assert!(fits(&Grid::parse(&["N"]).unwrap(), &b, &pallet));
        assert!(fits(&Grid::parse(&["R"]).unwrap(), &b, &pallet));

        let long = Box2D::new(10.0, 45.0).unwrap();
        assert!(fits(&Grid::parse(&["N"]).unwrap(), &long, &pallet));
        assert!(!fits(&Grid::parse(&["R"]).unwrap(), &long, &pallet));
    }

    #[test]
    fn tolerance_absorbs_scaled_pallet_drift() {
        let b = Box2D::new(11.0, 11.0).unwrap();
        let grid = Grid::parse(&["N N N N"]).unwrap();
        // 40 * 1.1 is not exactly 44.0 in binary floating point
        let scaled = Pallet::default().scale(1.1);
        assert!(fits(&grid, &b, &scaled));
        assert!(!fits_with_tolerance(&grid, &b, &Pallet::new(43.99, 48.0).unwrap(), 1e-6));
    }

    #[test]
    fn ratio_score_properties() {
        let target = 6.0 / 5.0;
        assert!(ratio_score(6, 5, target).abs() < EPSILON_GENERAL);
        assert!(ratio_score(10, 5, target) > 0.0);
        assert!(ratio_score(3, 0, target).is_infinite());
        assert!(ratio_score(7, 5, target) < ratio_score(8, 5, target));
        assert!(ratio_score(8, 5, target) < ratio_score(10, 5, target));
    }

    #[test]
    fn area_efficiency_is_symmetric() {
        let pallet = Pallet::new(10.0, 10.0).unwrap();
        let under = Footprint {
            width: 5.0,
            height: 10.0,
        };
        let over = Footprint {
            width: 20.0,
            height: 10.0,
        };
        assert!((area_efficiency(under, &pallet) - 0.5).abs() < EPSILON_GENERAL);
        assert!((area_efficiency(over, &pallet) - 0.5).abs() < EPSILON_GENERAL);
        assert_eq!(area_efficiency(Footprint::default(), &pallet), 0.0);
    }

    #[test]
    fn packing_density_counts_gaps_as_waste() {
        let b = test_box();
        let full = Grid::parse(&["N N", "N N"]).unwrap();
        assert!((packing_density(&full, &b) - 1.0).abs() < EPSILON_GENERAL);

        let mixed = Grid::parse(&["N R"]).unwrap();
        // footprint 30 x 20 = 600, boxes 400
        assert!((packing_density(&mixed, &b) - 400.0 / 600.0).abs() < EPSILON_GENERAL);
    }
}
