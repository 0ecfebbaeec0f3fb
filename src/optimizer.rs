//! Layer search driver.
//!
//! Entry points:
//! - [`find_arrangement`]: best layout for a fixed box count, enlarging the
//!   pallet if the standard size is not enough
//! - [`auto_optimize`]: sweeps box counts on the standard pallet only
//!
//! Both have `_with_progress` variants that report [`SearchEvent`]s for live
//! streaming.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::geometry::{Footprint, area_efficiency, footprint, ratio_score};
use crate::grid::Grid;
use crate::model::{Box2D, Pallet, ValidationError};
use crate::scaling::escalate;
use crate::selection::search_on_pallet;
use crate::strategy::REGISTRY;

/// How the pallet grows when the standard size is not enough.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Both sides grow by the same factor.
    #[default]
    Proportional,
    /// Width and length grow independently in small steps.
    Independent,
}

/// Which count wins during auto-optimization.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CountPolicy {
    /// Most boxes per unit of pallet area.
    #[default]
    Density,
    /// Lowest `(1 - area_efficiency) * efficiency_weight - count`.
    EfficiencyAndCount,
}

/// Configuration of the layer search.
///
/// All limits that bound the search loops live here so that a deployment can
/// tune them without code changes.
#[derive(Copy, Clone, Debug)]
pub struct LayoutConfig {
    /// Width of the standard pallet
    pub pallet_width: f64,
    /// Length of the standard pallet
    pub pallet_length: f64,
    /// Preferred rows/columns ratio
    pub target_ratio: f64,
    /// Factor step of proportional scaling
    pub scale_increment: f64,
    /// Largest proportional scale factor
    pub max_scale_factor: f64,
    /// Size step of independent scaling
    pub fine_scale_increment: f64,
    /// Largest extra size per side for independent scaling
    pub max_additional_size: f64,
    /// Lower sweep bound is `theoretical_max / sweep_lower_divisor`
    pub sweep_lower_divisor: usize,
    /// Upper sweep bound is `theoretical_max * sweep_upper_multiplier`
    pub sweep_upper_multiplier: usize,
    /// Hard cap of the auto-optimization sweep
    pub max_sweep_count: usize,
    /// Largest grid height tried by flexible placement and smart patterns
    pub max_grid_rows: usize,
    /// Largest grid width tried by flexible placement and smart patterns
    pub max_grid_columns: usize,
    pub min_box_dimension: f64,
    pub max_box_dimension: f64,
    pub max_box_count: usize,
    /// General numerical tolerance
    pub general_epsilon: f64,
    /// Weight of the area efficiency term in the selection score
    pub efficiency_weight: f64,
    /// Score penalty added to column-wise results
    pub column_wise_penalty: f64,
    pub scaling_mode: ScalingMode,
    pub count_policy: CountPolicy,
}

impl LayoutConfig {
    pub const DEFAULT_PALLET_WIDTH: f64 = Pallet::DEFAULT_WIDTH;
    pub const DEFAULT_PALLET_LENGTH: f64 = Pallet::DEFAULT_LENGTH;
    pub const DEFAULT_TARGET_RATIO: f64 = 6.0 / 5.0;
    pub const DEFAULT_SCALE_INCREMENT: f64 = 0.1;
    pub const DEFAULT_MAX_SCALE_FACTOR: f64 = 3.0;
    pub const DEFAULT_FINE_SCALE_INCREMENT: f64 = 1.0 / 16.0;
    pub const DEFAULT_MAX_ADDITIONAL_SIZE: f64 = 8.0;
    pub const DEFAULT_SWEEP_LOWER_DIVISOR: usize = 4;
    pub const DEFAULT_SWEEP_UPPER_MULTIPLIER: usize = 2;
    pub const DEFAULT_MAX_SWEEP_COUNT: usize = 100;
    pub const DEFAULT_MAX_GRID_ROWS: usize = 8;
    pub const DEFAULT_MAX_GRID_COLUMNS: usize = 8;
    pub const DEFAULT_MIN_BOX_DIMENSION: f64 = 0.1;
    pub const DEFAULT_MAX_BOX_DIMENSION: f64 = 144.0;
    pub const DEFAULT_MAX_BOX_COUNT: usize = 1000;
    pub const DEFAULT_GENERAL_EPSILON: f64 = 1e-6;
    pub const DEFAULT_EFFICIENCY_WEIGHT: f64 = 1000.0;
    pub const DEFAULT_COLUMN_WISE_PENALTY: f64 = 10.0;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> LayoutConfigBuilder {
        LayoutConfigBuilder::default()
    }

    /// The standard (unscaled) pallet.
    pub fn pallet(&self) -> Pallet {
        Pallet {
            width: self.pallet_width,
            length: self.pallet_length,
        }
    }

    /// Builds a box from raw input, enforcing the configured dimension range.
    pub fn make_box(&self, width: f64, length: f64) -> Result<Box2D, ValidationError> {
        Box2D::with_limits(width, length, self.min_box_dimension, self.max_box_dimension)
    }

    /// Checks that `count` is at least 1 and at most `max_box_count`.
    pub fn validate_count(&self, count: usize) -> Result<(), ValidationError> {
        if count == 0 {
            return Err(ValidationError::InvalidCount(
                "Box count must be at least 1".to_string(),
            ));
        }
        if count > self.max_box_count {
            return Err(ValidationError::InvalidCount(format!(
                "Box count must not exceed {}, got: {}",
                self.max_box_count, count
            )));
        }
        Ok(())
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pallet_width: Self::DEFAULT_PALLET_WIDTH,
            pallet_length: Self::DEFAULT_PALLET_LENGTH,
            target_ratio: Self::DEFAULT_TARGET_RATIO,
            scale_increment: Self::DEFAULT_SCALE_INCREMENT,
            max_scale_factor: Self::DEFAULT_MAX_SCALE_FACTOR,
            fine_scale_increment: Self::DEFAULT_FINE_SCALE_INCREMENT,
            max_additional_size: Self::DEFAULT_MAX_ADDITIONAL_SIZE,
            sweep_lower_divisor: Self::DEFAULT_SWEEP_LOWER_DIVISOR,
            sweep_upper_multiplier: Self::DEFAULT_SWEEP_UPPER_MULTIPLIER,
            max_sweep_count: Self::DEFAULT_MAX_SWEEP_COUNT,
            max_grid_rows: Self::DEFAULT_MAX_GRID_ROWS,
            max_grid_columns: Self::DEFAULT_MAX_GRID_COLUMNS,
            min_box_dimension: Self::DEFAULT_MIN_BOX_DIMENSION,
            max_box_dimension: Self::DEFAULT_MAX_BOX_DIMENSION,
            max_box_count: Self::DEFAULT_MAX_BOX_COUNT,
            general_epsilon: Self::DEFAULT_GENERAL_EPSILON,
            efficiency_weight: Self::DEFAULT_EFFICIENCY_WEIGHT,
            column_wise_penalty: Self::DEFAULT_COLUMN_WISE_PENALTY,
            scaling_mode: ScalingMode::default(),
            count_policy: CountPolicy::default(),
        }
    }
}

/// Builder for [`LayoutConfig`].
#[derive(Clone, Debug, Default)]
pub struct LayoutConfigBuilder {
    config: LayoutConfig,
}

impl LayoutConfigBuilder {
    /// Sets the standard pallet size.
    pub fn pallet(mut self, width: f64, length: f64) -> Self {
        self.config.pallet_width = width;
        self.config.pallet_length = length;
        self
    }

    pub fn target_ratio(mut self, ratio: f64) -> Self {
        self.config.target_ratio = ratio;
        self
    }

    /// Sets step and cap of proportional scaling.
    pub fn proportional_scaling(mut self, increment: f64, max_factor: f64) -> Self {
        self.config.scale_increment = increment;
        self.config.max_scale_factor = max_factor;
        self
    }

    /// Sets step and cap of independent scaling.
    pub fn independent_scaling(mut self, increment: f64, max_additional: f64) -> Self {
        self.config.fine_scale_increment = increment;
        self.config.max_additional_size = max_additional;
        self
    }

    /// Sets the bounds of the auto-optimization sweep.
    pub fn sweep(
        mut self,
        lower_divisor: usize,
        upper_multiplier: usize,
        max_count: usize,
    ) -> Self {
        self.config.sweep_lower_divisor = lower_divisor;
        self.config.sweep_upper_multiplier = upper_multiplier;
        self.config.max_sweep_count = max_count;
        self
    }

    pub fn max_grid(mut self, rows: usize, columns: usize) -> Self {
        self.config.max_grid_rows = rows;
        self.config.max_grid_columns = columns;
        self
    }

    /// Sets the accepted box dimension range.
    pub fn box_dimension_range(mut self, min: f64, max: f64) -> Self {
        self.config.min_box_dimension = min;
        self.config.max_box_dimension = max;
        self
    }

    pub fn max_box_count(mut self, count: usize) -> Self {
        self.config.max_box_count = count;
        self
    }

    pub fn general_epsilon(mut self, epsilon: f64) -> Self {
        self.config.general_epsilon = epsilon;
        self
    }

    /// Sets the selection score weights.
    pub fn scoring(mut self, efficiency_weight: f64, column_wise_penalty: f64) -> Self {
        self.config.efficiency_weight = efficiency_weight;
        self.config.column_wise_penalty = column_wise_penalty;
        self
    }

    pub fn scaling_mode(mut self, mode: ScalingMode) -> Self {
        self.config.scaling_mode = mode;
        self
    }

    pub fn count_policy(mut self, policy: CountPolicy) -> Self {
        self.config.count_policy = policy;
        self
    }

    /// Creates the final configuration.
    pub fn build(self) -> LayoutConfig {
        self.config
    }
}

/// A finished layer layout.
#[derive(Clone, Debug, Serialize)]
pub struct Arrangement {
    pub grid: Grid,
    pub rows: usize,
    pub columns: usize,
    pub pallet: Pallet,
    pub box_count: usize,
    pub footprint: Footprint,
    pub area_efficiency: f64,
    pub ratio_score: f64,
    /// Name of the strategy that produced the grid
    pub strategy: &'static str,
}

impl Arrangement {
    /// Derives all metrics of a grid on a pallet.
    pub fn new(
        grid: Grid,
        b: &Box2D,
        pallet: Pallet,
        target_ratio: f64,
        strategy: &'static str,
    ) -> Self {
        let fp = footprint(&grid, b);
        Self {
            rows: grid.rows(),
            columns: grid.columns(),
            box_count: grid.box_count(),
            footprint: fp,
            area_efficiency: area_efficiency(fp, &pallet),
            ratio_score: ratio_score(grid.rows(), grid.columns(), target_ratio),
            pallet,
            grid,
            strategy,
        }
    }

    /// Rows at least as many as columns.
    pub fn is_stable(&self) -> bool {
        self.rows >= self.columns
    }
}

/// Progress notifications of a search.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum SearchEvent {
    /// A search for a fixed count begins.
    SearchStarted {
        count: usize,
        box_width: f64,
        box_length: f64,
        pallet_width: f64,
        pallet_length: f64,
    },
    /// A strategy finished on a pallet.
    StrategyEvaluated {
        strategy: String,
        pallet_width: f64,
        pallet_length: f64,
        success: bool,
        box_count: usize,
    },
    /// The search moved to an enlarged pallet.
    PalletScaled { width: f64, length: f64 },
    /// Auto-optimization finished one count.
    CountEvaluated { count: usize, success: bool },
    /// Search finished.
    Finished {
        success: bool,
        count: Option<usize>,
        strategy: Option<String>,
    },
}

/// Box size suggestion in the guidance of a failed search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct SuggestedBox {
    pub width: f64,
    pub length: f64,
}

/// Hints returned when even the enlarged pallets cannot hold the layer.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Guidance {
    /// `floor(pallet_area / box_area)` for the standard pallet
    pub theoretical_max_by_area: usize,
    /// Total area of all requested boxes
    pub required_area: f64,
    /// Area of the standard pallet
    pub available_area: f64,
    /// Whether the boxes alone cover more than the pallet
    pub area_exceeded: bool,
    /// Proportionally shrunk box that would match the pallet area, if
    /// shrinking is needed at all
    pub suggested_box: Option<SuggestedBox>,
}

impl Guidance {
    pub fn new(b: &Box2D, count: usize, pallet: &Pallet) -> Self {
        let required_area = count as f64 * b.area();
        let available_area = pallet.area();
        let area_exceeded = required_area > available_area;
        let suggested_box = area_exceeded.then(|| {
            let shrink = (available_area / required_area).sqrt();
            SuggestedBox {
                width: b.width * shrink,
                length: b.length * shrink,
            }
        });

        Self {
            theoretical_max_by_area: (available_area / b.area()).floor() as usize,
            required_area,
            available_area,
            area_exceeded,
            suggested_box,
        }
    }
}

/// Errors of the layer search.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),
    #[error("No box count between {lowest} and {highest} fits on {pallet}")]
    NoArrangement {
        pallet: Pallet,
        lowest: usize,
        highest: usize,
    },
    #[error("No arrangement for {count} boxes, even on enlarged pallets")]
    ScalingExhausted { count: usize, guidance: Guidance },
}

impl SearchError {
    /// Machine readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            SearchError::InvalidInput(_) => "invalid_input",
            SearchError::NoArrangement { .. } => "no_arrangement",
            SearchError::ScalingExhausted { .. } => "scaling_exhausted",
        }
    }

    pub fn guidance(&self) -> Option<&Guidance> {
        match self {
            SearchError::ScalingExhausted { guidance, .. } => Some(guidance),
            _ => None,
        }
    }
}

/// Finds the best layout for `count` boxes.
///
/// Runs every registered strategy on the standard pallet and, if none
/// succeeds, escalates to enlarged pallets per `config.scaling_mode`.
pub fn find_arrangement(
    b: &Box2D,
    count: usize,
    config: &LayoutConfig,
) -> Result<Arrangement, SearchError> {
    find_arrangement_with_progress(b, count, config, |_| {})
}

/// Like [`find_arrangement`], reporting every step to `on_event`.
pub fn find_arrangement_with_progress(
    b: &Box2D,
    count: usize,
    config: &LayoutConfig,
    mut on_event: impl FnMut(&SearchEvent),
) -> Result<Arrangement, SearchError> {
    config.validate_count(count)?;
    let pallet = config.pallet();

    on_event(&SearchEvent::SearchStarted {
        count,
        box_width: b.width,
        box_length: b.length,
        pallet_width: pallet.width,
        pallet_length: pallet.length,
    });

    let result = match search_on_pallet(b, count, &pallet, REGISTRY, config, &mut on_event) {
        Some(arrangement) => Ok(arrangement),
        None => {
            log::info!(
                "ℹ️ No layout for {} x {} on {}; enlarging the pallet",
                count,
                b,
                pallet
            );
            escalate(b, count, config, false, &mut on_event)
        }
    };

    match &result {
        Ok(arrangement) => {
            log::info!(
                "✅ {} boxes as {}x{} on {} ({})",
                arrangement.box_count,
                arrangement.rows,
                arrangement.columns,
                arrangement.pallet,
                arrangement.strategy
            );
            on_event(&SearchEvent::Finished {
                success: true,
                count: Some(arrangement.box_count),
                strategy: Some(arrangement.strategy.to_string()),
            });
        }
        Err(err) => {
            log::warn!("⚠️ {}", err);
            on_event(&SearchEvent::Finished {
                success: false,
                count: None,
                strategy: None,
            });
        }
    }
    result
}

/// Result of an auto-optimization.
#[derive(Clone, Debug, Serialize)]
pub struct OptimizedLayer {
    /// Winning box count
    pub count: usize,
    pub arrangement: Arrangement,
}

/// Inclusive range of counts swept for a box.
///
/// The upper bound never exceeds `max_sweep_count` and the lower bound never
/// exceeds the upper one, so small boxes sweep down from the cap instead of
/// producing an empty range. Both bounds are at least 1.
pub fn sweep_bounds(b: &Box2D, config: &LayoutConfig) -> (usize, usize) {
    let theoretical_max = (config.pallet().area() / b.area()).floor() as usize;
    let highest = theoretical_max
        .saturating_mul(config.sweep_upper_multiplier)
        .min(config.max_sweep_count)
        .max(1);
    let lowest = (theoretical_max / config.sweep_lower_divisor.max(1)).clamp(1, highest);
    (lowest, highest)
}

impl CountPolicy {
    /// Ranks a successful count; lower is better.
    fn score(self, count: usize, arrangement: &Arrangement, config: &LayoutConfig) -> f64 {
        match self {
            CountPolicy::Density => -(count as f64 / arrangement.pallet.area()),
            CountPolicy::EfficiencyAndCount => {
                (1.0 - arrangement.area_efficiency) * config.efficiency_weight - count as f64
            }
        }
    }
}

/// Finds the best box count for the standard pallet.
///
/// Pallet scaling is never used here; if no count in the sweep fits, the
/// result is [`SearchError::NoArrangement`].
pub fn auto_optimize(b: &Box2D, config: &LayoutConfig) -> Result<OptimizedLayer, SearchError> {
    auto_optimize_with_progress(b, config, |_| {})
}

/// Like [`auto_optimize`], reporting every step to `on_event`.
pub fn auto_optimize_with_progress(
    b: &Box2D,
    config: &LayoutConfig,
    mut on_event: impl FnMut(&SearchEvent),
) -> Result<OptimizedLayer, SearchError> {
    let pallet = config.pallet();
    let (lowest, highest) = sweep_bounds(b, config);
    log::info!("🔎 Sweeping {} to {} boxes of {} on {}", lowest, highest, b, pallet);

    let mut best: Option<(f64, OptimizedLayer)> = None;
    for count in lowest..=highest {
        let found = search_on_pallet(b, count, &pallet, REGISTRY, config, &mut on_event);
        on_event(&SearchEvent::CountEvaluated {
            count,
            success: found.is_some(),
        });
        let Some(arrangement) = found else {
            log::debug!("{} boxes do not fit on {}", count, pallet);
            continue;
        };

        let score = config.count_policy.score(count, &arrangement, config);
        let improves = match &best {
            None => true,
            Some((current, _)) => score < current - config.general_epsilon,
        };
        if improves {
            best = Some((score, OptimizedLayer { count, arrangement }));
        }
    }

    match best {
        Some((_, layer)) => {
            log::info!("✅ Best count: {} ({})", layer.count, layer.arrangement.strategy);
            on_event(&SearchEvent::Finished {
                success: true,
                count: Some(layer.count),
                strategy: Some(layer.arrangement.strategy.to_string()),
            });
            Ok(layer)
        }
        None => {
            on_event(&SearchEvent::Finished {
                success: false,
                count: None,
                strategy: None,
            });
            Err(SearchError::NoArrangement {
                pallet,
                lowest,
                highest,
            })
        }
    }
}
