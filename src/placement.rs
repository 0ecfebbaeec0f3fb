//! Positioned boxes and conversion to and from the grid representation.
//!
//! A grid maps onto positions column-wise: columns sit side by side, each as
//! wide as its widest box, and boxes inside a column are stacked from the top
//! with gaps taking no space.

use serde::Serialize;
use utoipa::ToSchema;

use crate::geometry::column_width;
use crate::grid::{Cell, Grid};
use crate::model::{Box2D, Orientation};
use crate::types::{BoundingRect, Dimensional, Positioned, Vec2};

/// A single box placed on the pallet plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    /// Horizontal extent in the placed orientation.
    pub width: f64,
    /// Vertical extent in the placed orientation.
    pub length: f64,
    pub orientation: Orientation,
}

impl Placement {
    /// Places `b` at `(x, y)` in the given orientation.
    pub fn new(x: f64, y: f64, b: &Box2D, orientation: Orientation) -> Self {
        let dims = b.footprint(orientation);
        Self {
            x,
            y,
            width: dims.x,
            length: dims.y,
            orientation,
        }
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.length
    }

    pub fn bounds(&self) -> BoundingRect {
        BoundingRect::from_position_and_dims(self.position(), self.dimensions())
    }

    /// Checks whether two placements share interior area.
    ///
    /// Edges closer than `tolerance` count as touching.
    pub fn overlaps(&self, other: &Placement, tolerance: f64) -> bool {
        self.x < other.right() - tolerance
            && self.right() > other.x + tolerance
            && self.y < other.bottom() - tolerance
            && self.bottom() > other.y + tolerance
    }
}

impl Dimensional for Placement {
    fn dimensions(&self) -> Vec2 {
        Vec2::new(self.width, self.length)
    }
}

impl Positioned for Placement {
    fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Converts a grid into positioned boxes.
pub fn grid_to_placements(grid: &Grid, b: &Box2D) -> Vec<Placement> {
    let mut placements = Vec::with_capacity(grid.box_count());
    let mut x = 0.0;

    for column in 0..grid.columns() {
        let mut y = 0.0;
        for orientation in grid.column(column).filter_map(Cell::orientation) {
            let placement = Placement::new(x, y, b, orientation);
            y = placement.bottom();
            placements.push(placement);
        }
        x += column_width(grid, column, b);
    }
    placements
}

/// Converts positioned boxes back into a grid.
///
/// Succeeds only when the placements form aligned columns: every column
/// starts where the previous one ends and its boxes are stacked from the top
/// without vertical gaps. Shorter columns are padded with gap cells at the
/// bottom. Returns `None` for empty input or unaligned layouts.
pub fn placements_to_grid(placements: &[Placement], tolerance: f64) -> Option<Grid> {
    if placements.is_empty() {
        return None;
    }

    let mut sorted: Vec<&Placement> = placements.iter().collect();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y)));

    let mut columns: Vec<Vec<&Placement>> = Vec::new();
    for placement in sorted {
        match columns.last_mut() {
            Some(column) if (column[0].x - placement.x).abs() <= tolerance => {
                column.push(placement)
            }
            _ => columns.push(vec![placement]),
        }
    }

    let mut expected_x = 0.0;
    for column in &columns {
        if (column[0].x - expected_x).abs() > tolerance {
            return None;
        }
        let mut expected_y = 0.0;
        for placement in column {
            if (placement.y - expected_y).abs() > tolerance {
                return None;
            }
            expected_y = placement.bottom();
        }
        expected_x += column.iter().map(|p| p.width).fold(0.0, f64::max);
    }

    let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
    let mut grid = Grid::empty(rows, columns.len());
    for (c, column) in columns.iter().enumerate() {
        for (r, placement) in column.iter().enumerate() {
            grid.set(r, c, placement.orientation.into());
        }
    }
    Some(grid)
}
