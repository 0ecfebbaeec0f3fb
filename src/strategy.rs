//! Registry of layout strategies.
//!
//! Every strategy answers the same question: an orientation grid holding at
//! least `count` boxes that fits the pallet, or nothing. Selection between
//! the answers happens in [`crate::selection`].

use std::cmp::Ordering;

use crate::candidates::generate_candidates;
use crate::column::try_arrangement;
use crate::flexible::flexible_arrangement;
use crate::geometry::{footprint, ratio_score};
use crate::grid::Grid;
use crate::model::{Box2D, Pallet};
use crate::optimizer::LayoutConfig;
use crate::patterns::smart_patterns;
use crate::spatial::spatial_arrangement;
use crate::types::compare_with_epsilon;

/// A layout heuristic that can be plugged into the search.
pub trait Strategy: Send + Sync {
    /// Stable name reported in results and events.
    fn name(&self) -> &'static str;

    /// Tries to arrange `count` boxes on `pallet`.
    fn attempt(&self, b: &Box2D, count: usize, pallet: &Pallet, config: &LayoutConfig)
    -> Option<Grid>;

    /// Column-wise results carry a score penalty during selection.
    fn is_column_wise(&self) -> bool {
        false
    }
}

/// Regular grids from the divisor shapes of `count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnWise;

/// Fill heuristics over all grid sizes up to the configured cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flexible;

/// Fixed pattern catalog, first success wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmartPatterns;

/// Bottom-left fill converted back into a grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialFill;

/// All strategies in evaluation order. Selection ties keep this order.
pub static REGISTRY: &[&dyn Strategy] = &[&ColumnWise, &Flexible, &SmartPatterns, &SpatialFill];

impl Strategy for ColumnWise {
    fn name(&self) -> &'static str {
        "column_wise"
    }

    /// Keeps the candidate with the smallest footprint area; ratio score
    /// breaks ties.
    fn attempt(
        &self,
        b: &Box2D,
        count: usize,
        pallet: &Pallet,
        config: &LayoutConfig,
    ) -> Option<Grid> {
        let eps = config.general_epsilon;
        let mut best: Option<(f64, f64, Grid)> = None;

        for (rows, columns) in generate_candidates(count, config.target_ratio) {
            let Some(grid) = try_arrangement(rows, columns, b, count, pallet, eps) else {
                continue;
            };
            if grid.box_count() < count {
                continue;
            }
            let area = footprint(&grid, b).area();
            let ratio = ratio_score(rows, columns, config.target_ratio);

            let better = match &best {
                None => true,
                Some((best_area, best_ratio, _)) => {
                    match compare_with_epsilon(area, *best_area, eps) {
                        Ordering::Less => true,
                        Ordering::Greater => false,
                        Ordering::Equal => ratio + eps < *best_ratio,
                    }
                }
            };
            if better {
                best = Some((area, ratio, grid));
            }
        }
        best.map(|(_, _, grid)| grid)
    }

    fn is_column_wise(&self) -> bool {
        true
    }
}

impl Strategy for Flexible {
    fn name(&self) -> &'static str {
        "flexible"
    }

    fn attempt(
        &self,
        b: &Box2D,
        count: usize,
        pallet: &Pallet,
        config: &LayoutConfig,
    ) -> Option<Grid> {
        flexible_arrangement(
            b,
            count,
            pallet,
            config.max_grid_rows,
            config.max_grid_columns,
            config.general_epsilon,
        )
    }
}

impl Strategy for SmartPatterns {
    fn name(&self) -> &'static str {
        "smart_patterns"
    }

    fn attempt(
        &self,
        b: &Box2D,
        count: usize,
        pallet: &Pallet,
        config: &LayoutConfig,
    ) -> Option<Grid> {
        smart_patterns(b, count, pallet, config).map(|(pattern, grid)| {
            log::debug!("smart pattern '{}' matched on {}", pattern.name(), pallet);
            grid
        })
    }
}

impl Strategy for SpatialFill {
    fn name(&self) -> &'static str {
        "spatial"
    }

    fn attempt(
        &self,
        b: &Box2D,
        count: usize,
        pallet: &Pallet,
        config: &LayoutConfig,
    ) -> Option<Grid> {
        spatial_arrangement(b, count, pallet, config.general_epsilon)
    }
}

/// Looks up a registered strategy by name.
pub fn by_name(name: &str) -> Option<&'static dyn Strategy> {
    REGISTRY.iter().copied().find(|s| s.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fits;

    #[test]
    fn registry_order_and_names() {
        let names: Vec<_> = REGISTRY.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["column_wise", "flexible", "smart_patterns", "spatial"]);
        assert!(by_name("column_wise").unwrap().is_column_wise());
        assert!(!by_name("spatial").unwrap().is_column_wise());
        assert!(by_name("unknown").is_none());
    }

    #[test]
    fn column_wise_prefers_smallest_footprint() {
        let b = Box2D::new(10.0, 20.0).unwrap();
        let pallet = Pallet::new(50.0, 50.0).unwrap();
        let grid = ColumnWise
            .attempt(&b, 4, &pallet, &LayoutConfig::default())
            .unwrap();
        assert_eq!(grid.box_count(), 4);
        assert!(fits(&grid, &b, &pallet));
        assert!(footprint(&grid, &b).area() <= 800.0 + 1e-9);
    }

    #[test]
    fn every_success_fits_and_holds_enough_boxes() {
        let b = Box2D::new(5.0, 8.0).unwrap();
        let pallet = Pallet::default();
        let config = LayoutConfig::default();
        for strategy in REGISTRY {
            if let Some(grid) = strategy.attempt(&b, 20, &pallet, &config) {
                assert!(grid.box_count() >= 20, "{}", strategy.name());
                assert!(fits(&grid, &b, &pallet), "{}", strategy.name());
            }
        }
    }

    #[test]
    fn nothing_fits_an_undersized_pallet() {
        let b = Box2D::new(10.0, 20.0).unwrap();
        let pallet = Pallet::new(50.0, 50.0).unwrap();
        let config = LayoutConfig::default();
        assert!(REGISTRY.iter().all(|s| s.attempt(&b, 100, &pallet, &config).is_none()));
    }
}
