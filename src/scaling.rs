//! Pallet escalation for box counts the standard pallet cannot hold.
//!
//! Proportional mode multiplies both pallet sides by growing factors and
//! reruns the full strategy registry. Independent mode enumerates small
//! width and length additions, smallest area first, and runs the cheaper
//! pattern strategies only.
//!
//! Results with fewer rows than columns are rejected, except for the
//! untouched standard pallet in independent mode.

use crate::model::{Box2D, Pallet};
use crate::optimizer::{Arrangement, Guidance, LayoutConfig, ScalingMode, SearchError, SearchEvent};
use crate::selection::search_on_pallet;
use crate::strategy::{ColumnWise, REGISTRY, SmartPatterns, Strategy};

/// Strategies of independent scaling, in order; the first success wins.
static FINE_STRATEGIES: &[&dyn Strategy] = &[&SmartPatterns, &ColumnWise];

/// Scale factors of proportional mode, starting at the standard factor 1.0.
///
/// Factors come from an integer step counter so the cap is hit exactly.
pub fn proportional_factors(config: &LayoutConfig) -> impl Iterator<Item = f64> {
    let increment = config.scale_increment;
    let steps = if increment > 0.0 && config.max_scale_factor > 1.0 {
        ((config.max_scale_factor - 1.0) / increment + 1e-9).floor() as usize
    } else {
        0
    };
    (0..=steps).map(move |step| 1.0 + step as f64 * increment)
}

/// Pallets of independent mode, sorted by area.
///
/// The standard pallet comes first.
pub fn independent_pallets(config: &LayoutConfig) -> Vec<Pallet> {
    let base = config.pallet();
    let increment = config.fine_scale_increment;
    let steps = if increment > 0.0 && config.max_additional_size > 0.0 {
        (config.max_additional_size / increment).round() as usize
    } else {
        0
    };

    let mut pallets: Vec<Pallet> = (0..=steps)
        .flat_map(|i| (0..=steps).map(move |j| (i, j)))
        .map(|(i, j)| base.grown(i as f64 * increment, j as f64 * increment))
        .collect();
    pallets.sort_by(|a, b| a.area().total_cmp(&b.area()));
    pallets
}

/// Retries the search according to `config.scaling_mode`, starting with the
/// standard pallet.
pub fn scale_and_retry(
    b: &Box2D,
    count: usize,
    config: &LayoutConfig,
    on_event: impl FnMut(&SearchEvent),
) -> Result<Arrangement, SearchError> {
    escalate(b, count, config, true, on_event)
}

/// Like [`scale_and_retry`]; `include_standard == false` skips the standard
/// pallet when the caller has searched it already.
pub(crate) fn escalate(
    b: &Box2D,
    count: usize,
    config: &LayoutConfig,
    include_standard: bool,
    on_event: impl FnMut(&SearchEvent),
) -> Result<Arrangement, SearchError> {
    let found = match config.scaling_mode {
        ScalingMode::Proportional => {
            scale_proportionally(b, count, config, include_standard, on_event)
        }
        ScalingMode::Independent => {
            scale_independently(b, count, config, include_standard, on_event)
        }
    };
    found.ok_or_else(|| SearchError::ScalingExhausted {
        count,
        guidance: Guidance::new(b, count, &config.pallet()),
    })
}

fn accept_scaled(arrangement: Arrangement) -> Option<Arrangement> {
    if arrangement.is_stable() {
        return Some(arrangement);
    }
    log::warn!(
        "⚠️ Rejecting unstable {}x{} layout on {} (more columns than rows)",
        arrangement.rows,
        arrangement.columns,
        arrangement.pallet
    );
    None
}

fn scale_proportionally(
    b: &Box2D,
    count: usize,
    config: &LayoutConfig,
    include_standard: bool,
    mut on_event: impl FnMut(&SearchEvent),
) -> Option<Arrangement> {
    let base = config.pallet();
    for (step, factor) in proportional_factors(config).enumerate() {
        if step == 0 && !include_standard {
            continue;
        }
        let pallet = base.scale(factor);
        log::debug!("Trying scale factor {:.2}: {}", factor, pallet);
        if step > 0 {
            on_event(&SearchEvent::PalletScaled {
                width: pallet.width,
                length: pallet.length,
            });
        }

        let found = search_on_pallet(b, count, &pallet, REGISTRY, config, &mut on_event)
            .and_then(accept_scaled);
        if found.is_some() {
            return found;
        }
    }
    None
}

fn scale_independently(
    b: &Box2D,
    count: usize,
    config: &LayoutConfig,
    include_standard: bool,
    mut on_event: impl FnMut(&SearchEvent),
) -> Option<Arrangement> {
    let base = config.pallet();
    let required_area = count as f64 * b.area();
    for pallet in independent_pallets(config) {
        let standard = pallet.is_standard_size(&base);
        if standard && !include_standard {
            continue;
        }
        let too_small = pallet.area() + config.general_epsilon < required_area;
        if too_small || !b.can_fit_in_space(pallet.dims()) {
            continue;
        }
        if !standard {
            on_event(&SearchEvent::PalletScaled {
                width: pallet.width,
                length: pallet.length,
            });
        }

        for strategy in FINE_STRATEGIES {
            let found = search_on_pallet(
                b,
                count,
                &pallet,
                std::slice::from_ref(strategy),
                config,
                &mut on_event,
            )
            .and_then(|arrangement| {
                if standard {
                    Some(arrangement)
                } else {
                    accept_scaled(arrangement)
                }
            });
            if found.is_some() {
                return found;
            }
        }
    }
    None
}
