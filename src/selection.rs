//! Runs strategies on one pallet and picks the winner.
//!
//! Results are trimmed of empty border rows and columns before scoring. The
//! winner holds the most boxes; among equal counts the lowest score wins:
//!
//! `score = (1 - area_efficiency) * efficiency_weight + ratio_score + penalty`
//!
//! where `penalty` is `column_wise_penalty` for column-wise results and 0
//! otherwise. Ties keep the strategy order.

use std::cmp::Ordering;

use crate::geometry::fits_with_tolerance;
use crate::model::{Box2D, Pallet};
use crate::optimizer::{Arrangement, LayoutConfig, SearchEvent};
use crate::strategy::Strategy;
use crate::types::compare_with_epsilon;

/// Selection score of an arrangement, lower is better.
pub fn selection_score(arrangement: &Arrangement, column_wise: bool, config: &LayoutConfig) -> f64 {
    let penalty = if column_wise {
        config.column_wise_penalty
    } else {
        0.0
    };
    let inefficiency = 1.0 - arrangement.area_efficiency;
    inefficiency * config.efficiency_weight + arrangement.ratio_score + penalty
}

fn is_better(
    candidate: &Arrangement,
    candidate_score: f64,
    current: &Arrangement,
    current_score: f64,
    eps: f64,
) -> bool {
    match candidate.box_count.cmp(&current.box_count) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            compare_with_epsilon(candidate_score, current_score, eps) == Ordering::Less
        }
    }
}

/// Runs every strategy on `pallet` and returns the best arrangement.
///
/// Emits one [`SearchEvent::StrategyEvaluated`] per strategy.
pub fn search_on_pallet(
    b: &Box2D,
    count: usize,
    pallet: &Pallet,
    strategies: &[&dyn Strategy],
    config: &LayoutConfig,
    mut on_event: impl FnMut(&SearchEvent),
) -> Option<Arrangement> {
    let eps = config.general_epsilon;
    let mut best: Option<(f64, Arrangement)> = None;

    for strategy in strategies {
        let grid = strategy
            .attempt(b, count, pallet, config)
            .map(|grid| grid.trimmed())
            .filter(|grid| grid.box_count() >= count && fits_with_tolerance(grid, b, pallet, eps));

        on_event(&SearchEvent::StrategyEvaluated {
            strategy: strategy.name().to_string(),
            pallet_width: pallet.width,
            pallet_length: pallet.length,
            success: grid.is_some(),
            box_count: grid.as_ref().map_or(0, |g| g.box_count()),
        });

        let Some(grid) = grid else {
            continue;
        };
        let arrangement = Arrangement::new(grid, b, *pallet, config.target_ratio, strategy.name());
        let score = selection_score(&arrangement, strategy.is_column_wise(), config);
        log::debug!(
            "{} on {}: {} boxes in {}x{}, score {:.3}",
            strategy.name(),
            pallet,
            arrangement.box_count,
            arrangement.rows,
            arrangement.columns,
            score
        );

        let replace = match &best {
            None => true,
            Some((current_score, current)) => {
                is_better(&arrangement, score, current, *current_score, eps)
            }
        };
        if replace {
            best = Some((score, arrangement));
        }
    }

    best.map(|(_, arrangement)| arrangement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    /// Returns a fixed grid regardless of input.
    struct Fixed {
        name: &'static str,
        lines: &'static [&'static str],
        column_wise: bool,
    }

    impl Strategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn attempt(&self, _: &Box2D, _: usize, _: &Pallet, _: &LayoutConfig) -> Option<Grid> {
            Grid::parse(self.lines).ok()
        }

        fn is_column_wise(&self) -> bool {
            self.column_wise
        }
    }

    fn setup() -> (Box2D, Pallet, LayoutConfig) {
        (
            Box2D::new(10.0, 20.0).unwrap(),
            Pallet::default(),
            LayoutConfig::default(),
        )
    }

    #[test]
    fn column_wise_penalty_breaks_ties() {
        let (b, pallet, config) = setup();
        let column = Fixed {
            name: "a",
            lines: &["N N", "N N"],
            column_wise: true,
        };
        let other = Fixed {
            name: "b",
            lines: &["N N", "N N"],
            column_wise: false,
        };
        let best = search_on_pallet(&b, 4, &pallet, &[&column, &other], &config, |_| {}).unwrap();
        assert_eq!(best.strategy, "b");
    }

    #[test]
    fn equal_scores_keep_registry_order() {
        let (b, pallet, config) = setup();
        let first = Fixed {
            name: "first",
            lines: &["N N", "N N"],
            column_wise: false,
        };
        let second = Fixed {
            name: "second",
            lines: &["N N", "N N"],
            column_wise: false,
        };
        let best = search_on_pallet(&b, 4, &pallet, &[&first, &second], &config, |_| {}).unwrap();
        assert_eq!(best.strategy, "first");
    }

    #[test]
    fn more_boxes_win_over_better_score() {
        let (b, pallet, config) = setup();
        let exact = Fixed {
            name: "exact",
            lines: &["N N", "N N"],
            column_wise: false,
        };
        let more = Fixed {
            name: "more",
            lines: &["N N N", "N N N"],
            column_wise: true,
        };
        let best = search_on_pallet(&b, 4, &pallet, &[&exact, &more], &config, |_| {}).unwrap();
        assert_eq!(best.strategy, "more");
        assert_eq!(best.box_count, 6);
    }

    #[test]
    fn results_are_trimmed_and_filtered() {
        let (b, pallet, config) = setup();
        let padded = Fixed {
            name: "padded",
            lines: &["N O", "N O"],
            column_wise: false,
        };
        let short = Fixed {
            name: "short",
            lines: &["N"],
            column_wise: false,
        };
        let too_wide = Fixed {
            name: "too_wide",
            lines: &["R R R"],
            column_wise: false,
        };

        let best =
            search_on_pallet(&b, 2, &pallet, &[&short, &too_wide, &padded], &config, |_| {})
                .unwrap();
        assert_eq!(best.strategy, "padded");
        assert_eq!((best.rows, best.columns), (2, 1));
    }

    #[test]
    fn one_event_per_strategy() {
        let (b, pallet, config) = setup();
        let ok = Fixed {
            name: "ok",
            lines: &["N"],
            column_wise: false,
        };
        let mut events = Vec::new();
        let best =
            search_on_pallet(&b, 2, &pallet, &[&ok, &ok], &config, |e| events.push(e.clone()));
        assert!(best.is_none());
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(
            e,
            SearchEvent::StrategyEvaluated {
                success: false,
                box_count: 0,
                ..
            }
        )));
    }

    #[test]
    fn score_formula() {
        let (b, pallet, config) = setup();
        let grid = Grid::parse(&["N N N N", "N N N N"]).unwrap();
        // 40 x 40 on 40 x 48, ratio 2/4 against 1.2
        let arrangement = Arrangement::new(grid, &b, pallet, config.target_ratio, "test");
        let expected = (1.0 - 1600.0 / 1920.0) * 1000.0 + 0.7;
        assert!((selection_score(&arrangement, false, &config) - expected).abs() < 1e-9);
        assert!(
            (selection_score(&arrangement, true, &config)
                - expected
                - config.column_wise_penalty)
                .abs()
                < 1e-9
        );
    }
}
