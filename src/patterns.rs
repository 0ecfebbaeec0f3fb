//! Smart patterns: catalogued layouts that often beat uniform grids for
//! rectangular boxes.
//!
//! The family is tried in a fixed order and the first pattern that places all
//! boxes on the pallet wins:
//! 1. perimeter-first fill
//! 2. alternating column catalog
//! 3. mixed column catalog
//! 4. block fill (normal block beside rotated block)
//! 5. ratio fill
//! 6. 2×2 tiles of one orientation, leftovers in the other
//! 7. column split (rotated top half, normal bottom half)
//! 8. checkerboard
//!
//! Grid-size searches stay within `max_grid_rows` × `max_grid_columns` of the
//! [`LayoutConfig`].

use std::ops::RangeInclusive;

use crate::geometry::{fits_with_tolerance, packing_density, ratio_score};
use crate::grid::{Cell, Grid};
use crate::model::{Box2D, Pallet};
use crate::optimizer::LayoutConfig;

use crate::grid::Cell::{Normal as N, Rotated as R};

/// Column orientation sequences tried by the alternating search.
const ALTERNATING_CATALOG: [&[Cell]; 20] = [
    &[R, N, R, N, R],
    &[N, R, N, R, N],
    &[R, N, R, N],
    &[N, R, N, R],
    &[R, N, R],
    &[N, R, N],
    &[R, R, N, N],
    &[N, N, R, R],
    &[R, R, N, R],
    &[N, R, R, N],
    &[R, N, N, R],
    &[R, N, R, R],
    &[N, R, N, N],
    &[R, N, R, N, R, N],
    &[R, R, N, N, R, R],
    &[N, R, N, R, N, R],
    &[R, R],
    &[N, N],
    &[R, N],
    &[N, R],
];

/// Column orientation sequences tried by the mixed column search.
const MIXED_COLUMN_CATALOG: [&[Cell]; 5] = [
    &[R, N, N, R, R],
    &[R, N, N, R],
    &[R, N, R],
    &[N, R, N, R],
    &[R, R, N, N],
];

// Preferred search ranges; upper ends are capped by the grid limits.
const MIXED_COLUMN_ROWS: RangeInclusive<usize> = 5..=8;
const PERIMETER_ROWS: RangeInclusive<usize> = 5..=8;
const PERIMETER_COLUMNS: RangeInclusive<usize> = 3..=6;
const BLOCK_ROWS: RangeInclusive<usize> = 1..=5;
const BLOCK_COLUMNS: RangeInclusive<usize> = 1..=3;
const RATIO_FILL_RATIOS: [f64; 7] = [0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8];
const RATIO_FILL_ROWS: RangeInclusive<usize> = 4..=8;
const RATIO_FILL_COLUMNS: RangeInclusive<usize> = 3..=7;

fn capped(range: RangeInclusive<usize>, cap: usize) -> RangeInclusive<usize> {
    *range.start()..=(*range.end()).min(cap)
}

/// A named member of the smart pattern family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmartPattern {
    Perimeter,
    Alternating,
    MixedColumns,
    Blocks,
    RatioFill,
    Tiles,
    ColumnSplit,
    Checkerboard,
}

impl SmartPattern {
    pub const ALL: [SmartPattern; 8] = [
        SmartPattern::Perimeter,
        SmartPattern::Alternating,
        SmartPattern::MixedColumns,
        SmartPattern::Blocks,
        SmartPattern::RatioFill,
        SmartPattern::Tiles,
        SmartPattern::ColumnSplit,
        SmartPattern::Checkerboard,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SmartPattern::Perimeter => "perimeter",
            SmartPattern::Alternating => "alternating",
            SmartPattern::MixedColumns => "mixed_columns",
            SmartPattern::Blocks => "blocks",
            SmartPattern::RatioFill => "ratio_fill",
            SmartPattern::Tiles => "tiles",
            SmartPattern::ColumnSplit => "column_split",
            SmartPattern::Checkerboard => "checkerboard",
        }
    }

    pub fn attempt(
        self,
        b: &Box2D,
        count: usize,
        pallet: &Pallet,
        config: &LayoutConfig,
    ) -> Option<Grid> {
        match self {
            SmartPattern::Perimeter => perimeter_pattern(b, count, pallet, config),
            SmartPattern::Alternating => alternating_pattern(b, count, pallet, config),
            SmartPattern::MixedColumns => mixed_column_pattern(b, count, pallet, config),
            SmartPattern::Blocks => block_pattern(b, count, pallet, config),
            SmartPattern::RatioFill => ratio_fill_pattern(b, count, pallet, config),
            SmartPattern::Tiles => tile_pattern(b, count, pallet, config),
            SmartPattern::ColumnSplit => {
                first_mixed_grid(b, count, pallet, config, column_split_fill)
            }
            SmartPattern::Checkerboard => {
                first_mixed_grid(b, count, pallet, config, checkerboard_fill)
            }
        }
    }
}

/// Tries the smart patterns in order and returns the first success together
/// with the pattern that produced it.
pub fn smart_patterns(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    config: &LayoutConfig,
) -> Option<(SmartPattern, Grid)> {
    SmartPattern::ALL.into_iter().find_map(|pattern| {
        let grid = pattern.attempt(b, count, pallet, config)?;
        log::debug!("smart pattern {} placed {} boxes", pattern.name(), grid.box_count());
        Some((pattern, grid))
    })
}

fn accepts(grid: &Grid, b: &Box2D, count: usize, pallet: &Pallet, tolerance: f64) -> bool {
    grid.box_count() >= count && fits_with_tolerance(grid, b, pallet, tolerance)
}

/// How many boxes of an orientation stack into one pallet-length column.
fn per_column(cell: Cell, b: &Box2D, pallet: &Pallet, tolerance: f64) -> usize {
    let height = match cell {
        Cell::Normal => b.length,
        Cell::Rotated => b.width,
        Cell::Gap => return 0,
    };
    ((pallet.length + tolerance) / height).floor() as usize
}

/// First orientation (normal, then rotated) that keeps the grid on the pallet.
fn fitting_orientation(
    grid: &Grid,
    row: usize,
    column: usize,
    b: &Box2D,
    pallet: &Pallet,
    tolerance: f64,
) -> Option<Cell> {
    [N, R]
        .into_iter()
        .find(|&cell| fits_with_tolerance(&grid.with_cell(row, column, cell), b, pallet, tolerance))
}

/// Fills columns following a sequence, each column up to `limit(cell)` boxes.
fn fill_columns(
    sequence: &[Cell],
    rows: usize,
    count: usize,
    limit: impl Fn(Cell) -> usize,
) -> Grid {
    let mut grid = Grid::empty(rows, sequence.len());
    let mut placed = 0;
    for (column, &cell) in sequence.iter().enumerate() {
        let boxes = limit(cell).min(rows).min(count - placed);
        for row in 0..boxes {
            grid.set(row, column, cell);
        }
        placed += boxes;
        if placed >= count {
            break;
        }
    }
    grid
}

/// Perimeter-first fill on grids of 5 to 8 rows and 3 to 6 columns.
pub fn perimeter_pattern(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    config: &LayoutConfig,
) -> Option<Grid> {
    let tolerance = config.general_epsilon;
    for rows in capped(PERIMETER_ROWS, config.max_grid_rows) {
        for columns in capped(PERIMETER_COLUMNS, config.max_grid_columns) {
            if rows * columns < count {
                continue;
            }
            let variants = [
                ring_fill(rows, columns, b, count, pallet, tolerance),
                corner_fill(rows, columns, b, count, pallet, tolerance),
            ];
            if let Some(grid) = variants
                .into_iter()
                .flatten()
                .find(|grid| accepts(grid, b, count, pallet, tolerance))
            {
                return Some(grid);
            }
        }
    }
    None
}

/// Fills the outer ring first, then inner rings, picking a fitting
/// orientation for every cell.
fn ring_fill(
    rows: usize,
    columns: usize,
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    tolerance: f64,
) -> Option<Grid> {
    let mut grid = Grid::empty(rows, columns);
    let mut placed = 0;

    let mut visit = |grid: &mut Grid, row: usize, column: usize| {
        if placed >= count || grid.get(row, column) != Cell::Gap {
            return;
        }
        if let Some(cell) = fitting_orientation(grid, row, column, b, pallet, tolerance) {
            grid.set(row, column, cell);
            placed += 1;
        }
    };

    for column in 0..columns {
        visit(&mut grid, 0, column);
        visit(&mut grid, rows - 1, column);
    }
    for row in 1..rows - 1 {
        visit(&mut grid, row, 0);
        visit(&mut grid, row, columns - 1);
    }
    for layer in 1..(rows / 2).min(columns / 2) {
        for row in layer..rows - layer {
            for column in layer..columns - layer {
                let on_ring = row == layer
                    || row == rows - layer - 1
                    || column == layer
                    || column == columns - layer - 1;
                if on_ring {
                    visit(&mut grid, row, column);
                }
            }
        }
    }

    (placed >= count).then_some(grid)
}

/// Rotated corners, normal edges, then the interior with fitting
/// orientations.
fn corner_fill(
    rows: usize,
    columns: usize,
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    tolerance: f64,
) -> Option<Grid> {
    let mut grid = Grid::empty(rows, columns);
    let mut placed = 0;

    if rows > 1 && columns > 1 {
        for (row, column) in [(0, 0), (0, columns - 1), (rows - 1, 0), (rows - 1, columns - 1)] {
            if placed < count {
                grid.set(row, column, R);
                placed += 1;
            }
        }
    }

    for row in 0..rows {
        for column in 0..columns {
            let on_edge = row == 0 || row == rows - 1 || column == 0 || column == columns - 1;
            if on_edge && placed < count && grid.get(row, column) == Cell::Gap {
                grid.set(row, column, N);
                placed += 1;
            }
        }
    }

    for row in 1..rows.saturating_sub(1) {
        for column in 1..columns.saturating_sub(1) {
            if placed >= count || grid.get(row, column) != Cell::Gap {
                continue;
            }
            if let Some(cell) = fitting_orientation(&grid, row, column, b, pallet, tolerance) {
                grid.set(row, column, cell);
                placed += 1;
            }
        }
    }

    (placed >= count).then_some(grid)
}

/// Searches the alternating catalog for the densest sequence that is narrow
/// enough and has the capacity for `count` boxes.
pub fn alternating_pattern(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    config: &LayoutConfig,
) -> Option<Grid> {
    let tolerance = config.general_epsilon;
    let max_rotated = per_column(R, b, pallet, tolerance);
    let max_normal = per_column(N, b, pallet, tolerance);
    let rows = max_rotated.max(max_normal);
    if rows == 0 {
        return None;
    }
    let limit = |cell: Cell| if cell == R { max_rotated } else { max_normal };

    let mut best: Option<(usize, f64, Grid)> = None;
    for sequence in ALTERNATING_CATALOG {
        let width: f64 = sequence
            .iter()
            .map(|&cell| if cell == R { b.length } else { b.width })
            .sum();
        if width > pallet.width + tolerance {
            continue;
        }
        let capacity: usize = sequence.iter().map(|&cell| limit(cell)).sum();
        if capacity < count {
            continue;
        }

        let grid = fill_columns(sequence, rows, count, limit);
        if !accepts(&grid, b, count, pallet, tolerance) {
            continue;
        }
        let placed = grid.box_count();
        let density = packing_density(&grid, b);
        let better = match &best {
            None => true,
            Some((best_placed, best_density, _)) => {
                placed > *best_placed || (placed == *best_placed && density > *best_density)
            }
        };
        if better {
            best = Some((placed, density, grid));
        }
    }
    best.map(|(_, _, grid)| grid)
}

/// Fills the mixed column catalog with 5 to 8 rows.
pub fn mixed_column_pattern(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    config: &LayoutConfig,
) -> Option<Grid> {
    let tolerance = config.general_epsilon;
    let max_rotated = per_column(R, b, pallet, tolerance);
    let max_normal = per_column(N, b, pallet, tolerance);
    let limit = |cell: Cell| if cell == R { max_rotated } else { max_normal };

    MIXED_COLUMN_CATALOG
        .into_iter()
        .filter(|sequence| sequence.len() <= config.max_grid_columns)
        .find_map(|sequence| {
            capped(MIXED_COLUMN_ROWS, config.max_grid_rows)
                .map(|rows| fill_columns(sequence, rows, count, limit))
                .find(|grid| accepts(grid, b, count, pallet, tolerance))
        })
}

/// A block of normal boxes beside a block of rotated boxes.
///
/// The result may be wider than tall.
pub fn block_pattern(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    config: &LayoutConfig,
) -> Option<Grid> {
    let tolerance = config.general_epsilon;
    for normal_rows in BLOCK_ROWS {
        for normal_columns in BLOCK_COLUMNS {
            for rotated_rows in BLOCK_ROWS {
                for rotated_columns in BLOCK_COLUMNS {
                    let columns = normal_columns + rotated_columns;
                    let rows = normal_rows.max(rotated_rows);
                    if columns > config.max_grid_columns || rows > config.max_grid_rows {
                        continue;
                    }
                    if normal_rows * normal_columns + rotated_rows * rotated_columns < count {
                        continue;
                    }

                    let mut grid = Grid::empty(rows, columns);
                    let mut placed = 0;
                    let blocks = [
                        (N, normal_rows, 0..normal_columns),
                        (R, rotated_rows, normal_columns..columns),
                    ];
                    for (cell, block_rows, block_columns) in blocks {
                        for row in 0..block_rows {
                            for column in block_columns.clone() {
                                if placed < count {
                                    grid.set(row, column, cell);
                                    placed += 1;
                                }
                            }
                        }
                    }

                    if accepts(&grid, b, count, pallet, tolerance) {
                        return Some(grid);
                    }
                }
            }
        }
    }
    None
}

/// Row-major fill that keeps the share of normal boxes near a target
/// fraction.
pub fn ratio_fill_pattern(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    config: &LayoutConfig,
) -> Option<Grid> {
    let tolerance = config.general_epsilon;
    for ratio in RATIO_FILL_RATIOS {
        let target_normal = (count as f64 * ratio) as usize;
        let target_rotated = count - target_normal;

        for rows in capped(RATIO_FILL_ROWS, config.max_grid_rows) {
            for columns in capped(RATIO_FILL_COLUMNS, config.max_grid_columns) {
                if rows * columns < count {
                    continue;
                }
                let grid = ratio_fill(rows, columns, count, ratio, target_normal, target_rotated);
                if accepts(&grid, b, count, pallet, tolerance) {
                    return Some(grid);
                }
            }
        }
    }
    None
}

fn ratio_fill(
    rows: usize,
    columns: usize,
    count: usize,
    ratio: f64,
    target_normal: usize,
    target_rotated: usize,
) -> Grid {
    let mut grid = Grid::empty(rows, columns);
    let (mut normal, mut rotated) = (0usize, 0usize);

    'rows: for row in 0..rows {
        for column in 0..columns {
            if normal + rotated >= count {
                break 'rows;
            }
            let share = normal as f64 / (normal + rotated).max(1) as f64;
            if normal < target_normal && (rotated >= target_rotated || share < ratio) {
                grid.set(row, column, N);
                normal += 1;
            } else if rotated < target_rotated {
                grid.set(row, column, R);
                rotated += 1;
            } else {
                break;
            }
        }
    }
    grid
}

/// Grid sizes with `rows >= columns` within the grid limits that can hold
/// `count` boxes, closest to the target ratio first.
fn mixed_grid_sizes(count: usize, config: &LayoutConfig) -> Vec<(usize, usize)> {
    let mut sizes: Vec<(usize, usize)> = (1..=config.max_grid_rows)
        .flat_map(|rows| {
            (1..=rows.min(config.max_grid_columns)).map(move |columns| (rows, columns))
        })
        .filter(|&(rows, columns)| rows * columns >= count)
        .collect();
    let score = |(rows, columns): (usize, usize)| ratio_score(rows, columns, config.target_ratio);
    sizes.sort_by(|&a, &b| score(a).total_cmp(&score(b)));
    sizes
}

/// First grid size on which `fill` produces an accepted grid.
fn first_mixed_grid(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    config: &LayoutConfig,
    fill: impl Fn(usize, usize, usize) -> Grid,
) -> Option<Grid> {
    mixed_grid_sizes(count, config)
        .into_iter()
        .map(|(rows, columns)| fill(rows, columns, count))
        .find(|grid| accepts(grid, b, count, pallet, config.general_epsilon))
}

/// 2×2 tiles of rotated boxes, then of normal boxes, on every grid size.
pub fn tile_pattern(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    config: &LayoutConfig,
) -> Option<Grid> {
    mixed_grid_sizes(count, config)
        .into_iter()
        .find_map(|(rows, columns)| {
            [R, N]
                .into_iter()
                .map(|tile| tile_fill(rows, columns, count, tile))
                .find(|grid| accepts(grid, b, count, pallet, config.general_epsilon))
        })
}

/// Tiles whole 2×2 blocks of `tile` while at least four boxes remain, then
/// fills the free cells row by row with the other orientation.
fn tile_fill(rows: usize, columns: usize, count: usize, tile: Cell) -> Grid {
    let leftover = if tile == R { N } else { R };
    let mut grid = Grid::empty(rows, columns);
    let mut placed = 0;

    for row in (0..rows.saturating_sub(1)).step_by(2) {
        for column in (0..columns.saturating_sub(1)).step_by(2) {
            if placed + 4 > count {
                break;
            }
            for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                grid.set(row + r, column + c, tile);
            }
            placed += 4;
        }
    }

    for row in 0..rows {
        for column in 0..columns {
            if placed >= count {
                return grid;
            }
            if grid.get(row, column) == Cell::Gap {
                grid.set(row, column, leftover);
                placed += 1;
            }
        }
    }
    grid
}

/// Each column gets rotated boxes in its upper half and normal boxes below.
fn column_split_fill(rows: usize, columns: usize, count: usize) -> Grid {
    let mut grid = Grid::empty(rows, columns);
    let mut placed = 0;
    for column in 0..columns {
        let boxes = rows.min(count - placed);
        for row in 0..boxes {
            grid.set(row, column, if row < boxes / 2 { R } else { N });
        }
        placed += boxes;
        if placed >= count {
            break;
        }
    }
    grid
}

/// Row-major fill alternating orientations like a checkerboard.
fn checkerboard_fill(rows: usize, columns: usize, count: usize) -> Grid {
    let mut grid = Grid::empty(rows, columns);
    let cells = (0..rows).flat_map(|row| (0..columns).map(move |column| (row, column)));
    for (row, column) in cells.take(count) {
        grid.set(row, column, if (row + column) % 2 == 0 { R } else { N });
    }
    grid
}
