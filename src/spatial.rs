//! Bottom-left spatial fill.
//!
//! Boxes are placed one at a time as far up, then as far left, as possible.
//! Candidate rows are the pallet top and the bottoms of already placed boxes;
//! candidate columns are the pallet edge and the right edges of boxes that
//! share the vertical band.

use crate::grid::Grid;
use crate::model::{Box2D, Orientation, Pallet};
use crate::placement::{Placement, placements_to_grid};
use crate::types::Vec2;

/// Weight of the vertical coordinate when ranking positions.
const ROW_WEIGHT: f64 = 1000.0;

/// Sorts values ascending and removes near-duplicates.
fn dedup_sorted(mut values: Vec<f64>, tolerance: f64) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() <= tolerance);
    values
}

/// Finds the topmost, then leftmost, free position for a `width × length`
/// rectangle.
///
/// Returns `None` when no candidate position keeps the rectangle on the
/// pallet without overlapping an existing placement.
pub fn find_butted_position(
    existing: &[Placement],
    width: f64,
    length: f64,
    pallet: &Pallet,
    tolerance: f64,
) -> Option<Vec2> {
    let rows = dedup_sorted(
        std::iter::once(0.0)
            .chain(existing.iter().map(Placement::bottom))
            .collect(),
        tolerance,
    );

    for y in rows {
        if y + length > pallet.length + tolerance {
            continue;
        }

        let band: Vec<&Placement> = existing
            .iter()
            .filter(|p| y + length > p.y + tolerance && y < p.bottom() - tolerance)
            .collect();
        let xs = dedup_sorted(
            std::iter::once(0.0)
                .chain(band.iter().map(|p| p.right()))
                .collect(),
            tolerance,
        );

        for x in xs {
            if x + width > pallet.width + tolerance {
                break;
            }
            let candidate = Placement {
                x,
                y,
                width,
                length,
                orientation: Orientation::Normal,
            };
            if !band.iter().any(|p| p.overlaps(&candidate, tolerance)) {
                return Some(Vec2::new(x, y));
            }
        }
    }
    None
}

/// Places up to `count` boxes with the bottom-left rule.
///
/// For every box both orientations are tried and the position with the
/// lowest `y * 1000 + x` wins; `Normal` wins ties. Stops early once no
/// orientation finds room.
pub fn bottom_left_fill(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    tolerance: f64,
) -> Vec<Placement> {
    let mut placements: Vec<Placement> = Vec::with_capacity(count);

    while placements.len() < count {
        let mut best: Option<(f64, Placement)> = None;
        for orientation in Orientation::ALL {
            let dims = b.footprint(orientation);
            let Some(pos) = find_butted_position(&placements, dims.x, dims.y, pallet, tolerance)
            else {
                continue;
            };
            let score = pos.y * ROW_WEIGHT + pos.x;
            if best.as_ref().is_none_or(|(current, _)| score < *current) {
                best = Some((score, Placement::new(pos.x, pos.y, b, orientation)));
            }
        }

        match best {
            Some((_, placement)) => placements.push(placement),
            None => break,
        }
    }
    placements
}

/// Runs the bottom-left fill and converts the result into a grid.
///
/// Succeeds only if all `count` boxes were placed and they line up into
/// columns the grid representation can express.
pub fn spatial_arrangement(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    tolerance: f64,
) -> Option<Grid> {
    let placements = bottom_left_fill(b, count, pallet, tolerance);
    if placements.len() < count {
        log::debug!(
            "bottom-left fill placed {} of {} boxes on {}",
            placements.len(),
            count,
            pallet
        );
        return None;
    }
    placements_to_grid(&placements, tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fits;
    use crate::grid::Cell;
    use crate::types::EPSILON_GENERAL;

    #[test]
    fn first_box_goes_to_origin() {
        let pallet = Pallet::default();
        let pos = find_butted_position(&[], 5.0, 8.0, &pallet, EPSILON_GENERAL).unwrap();
        assert_eq!(pos, Vec2::zero());
    }

    #[test]
    fn butted_position_hugs_existing_boxes() {
        let b = Box2D::new(5.0, 8.0).unwrap();
        let pallet = Pallet::new(10.0, 48.0).unwrap();
        let existing = vec![
            Placement::new(0.0, 0.0, &b, Orientation::Normal),
            Placement::new(5.0, 0.0, &b, Orientation::Normal),
        ];
        let pos = find_butted_position(&existing, 5.0, 8.0, &pallet, EPSILON_GENERAL).unwrap();
        assert_eq!(pos, Vec2::new(0.0, 8.0));
    }

    #[test]
    fn no_room_returns_none() {
        let b = Box2D::new(10.0, 10.0).unwrap();
        let pallet = Pallet::new(10.0, 10.0).unwrap();
        let existing = vec![Placement::new(0.0, 0.0, &b, Orientation::Normal)];
        assert!(find_butted_position(&existing, 10.0, 10.0, &pallet, EPSILON_GENERAL).is_none());
    }

    #[test]
    fn fill_never_overlaps_and_stays_on_pallet() {
        let b = Box2D::new(7.0, 11.0).unwrap();
        let pallet = Pallet::default();
        let placements = bottom_left_fill(&b, 30, &pallet, EPSILON_GENERAL);
        assert!(!placements.is_empty());
        for (i, a) in placements.iter().enumerate() {
            assert!(a.right() <= pallet.width + EPSILON_GENERAL);
            assert!(a.bottom() <= pallet.length + EPSILON_GENERAL);
            for other in &placements[i + 1..] {
                assert!(!a.overlaps(other, EPSILON_GENERAL));
            }
        }
    }

    #[test]
    fn normal_wins_ties() {
        let b = Box2D::new(5.0, 8.0).unwrap();
        let placements = bottom_left_fill(&b, 1, &Pallet::default(), EPSILON_GENERAL);
        assert_eq!(placements[0].orientation, Orientation::Normal);
    }

    #[test]
    fn uniform_rows_convert_to_grid() {
        let b = Box2D::new(5.0, 8.0).unwrap();
        let pallet = Pallet::default();
        let grid = spatial_arrangement(&b, 16, &pallet, EPSILON_GENERAL).unwrap();
        assert_eq!(grid.box_count(), 16);
        assert_eq!(grid.count_of(Cell::Normal), 16);
        assert!(fits(&grid, &b, &pallet));
    }

    #[test]
    fn too_many_boxes_fail() {
        let b = Box2D::new(10.0, 20.0).unwrap();
        let pallet = Pallet::new(50.0, 50.0).unwrap();
        assert!(spatial_arrangement(&b, 100, &pallet, EPSILON_GENERAL).is_none());
    }
}
