//! Data models for the pallet layer planner.
//!
//! This module defines the fundamental value types of a layer search:
//! - `Box2D`: the footprint of one carton, normalised so that width <= length
//! - `Pallet`: the rectangular load surface, scalable for escalation
//! - `Orientation`: the two allowed rotations of a carton
//!
//! All structures implement the traits from the `types` module.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Dimensional, EPSILON_GENERAL, Vec2, validation};

/// Validation error for box, pallet and count input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid box count: {0}")]
    InvalidCount(String),
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),
}

/// Orientation of a placed carton.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum Orientation {
    /// Stored width runs left to right, length runs top to bottom.
    Normal,
    /// Axes swapped relative to `Normal`.
    Rotated,
}

impl Orientation {
    /// Both orientations in the order strategies try them.
    pub const ALL: [Orientation; 2] = [Orientation::Normal, Orientation::Rotated];

    /// Returns the other orientation.
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Normal => Orientation::Rotated,
            Orientation::Rotated => Orientation::Normal,
        }
    }

    /// Single-letter symbol used by the grid text format.
    pub fn symbol(self) -> char {
        match self {
            Orientation::Normal => 'N',
            Orientation::Rotated => 'R',
        }
    }
}

/// Footprint of a single carton.
///
/// The constructor guarantees `width <= length`, so `Orientation::Normal`
/// always places the short side along the pallet width.
///
/// # Fields
/// * `width` - Shorter side
/// * `length` - Longer side
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct Box2D {
    #[schema(example = 10.0)]
    pub width: f64,
    #[schema(example = 20.0)]
    pub length: f64,
}

impl Box2D {
    /// Creates a new box after validating both dimensions.
    ///
    /// If `width > length` the values are swapped and a warning is logged.
    /// Use [`Box2D::needs_swap`] to surface the correction to a caller.
    ///
    /// # Examples
    /// ```
    /// use layer_it_now::model::Box2D;
    ///
    /// let swapped = Box2D::new(20.0, 10.0).unwrap();
    /// assert_eq!((swapped.width, swapped.length), (10.0, 20.0));
    /// assert!(Box2D::new(-1.0, 10.0).is_err());
    /// ```
    pub fn new(width: f64, length: f64) -> Result<Self, ValidationError> {
        validation::validate_dimension(width, "Box width")
            .map_err(ValidationError::InvalidDimension)?;
        validation::validate_dimension(length, "Box length")
            .map_err(ValidationError::InvalidDimension)?;

        if Self::needs_swap(width, length) {
            log::warn!(
                "⚠️ Box width ({}) > length ({}); swapping so width is the shorter side",
                width,
                length
            );
            return Ok(Self {
                width: length,
                length: width,
            });
        }
        Ok(Self { width, length })
    }

    /// Creates a new box and additionally enforces the inclusive `[min, max]`
    /// range for both sides.
    pub fn with_limits(
        width: f64,
        length: f64,
        min_dimension: f64,
        max_dimension: f64,
    ) -> Result<Self, ValidationError> {
        validation::validate_dimension_range(width, "Box width", min_dimension, max_dimension)
            .map_err(ValidationError::InvalidDimension)?;
        validation::validate_dimension_range(length, "Box length", min_dimension, max_dimension)
            .map_err(ValidationError::InvalidDimension)?;
        Self::new(width, length)
    }

    /// Reports whether the raw input would be swapped by the constructor.
    pub fn needs_swap(width: f64, length: f64) -> bool {
        width > length
    }

    /// Area covered by one box.
    pub fn area(&self) -> f64 {
        self.width * self.length
    }

    /// Returns the (horizontal, vertical) extent for an orientation.
    #[inline]
    pub fn footprint(&self, orientation: Orientation) -> Vec2 {
        match orientation {
            Orientation::Normal => Vec2::new(self.width, self.length),
            Orientation::Rotated => Vec2::new(self.length, self.width),
        }
    }

    /// Checks if the box fits into a free rectangle in either orientation.
    pub fn can_fit_in_space(&self, available: Vec2) -> bool {
        Orientation::ALL
            .iter()
            .any(|&o| self.footprint(o).fits_within(&available, EPSILON_GENERAL))
    }

    /// Picks the orientation for a free rectangle.
    ///
    /// Both orientations cover the same area, so `Normal` wins whenever it
    /// fits; `None` if neither orientation fits.
    pub fn best_orientation_for_space(&self, available: Vec2) -> Option<Orientation> {
        Orientation::ALL
            .into_iter()
            .find(|&o| self.footprint(o).fits_within(&available, EPSILON_GENERAL))
    }
}

impl Dimensional for Box2D {
    fn dimensions(&self) -> Vec2 {
        Vec2::new(self.width, self.length)
    }
}

impl std::fmt::Display for Box2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Box({} x {})", self.width, self.length)
    }
}

/// Rectangular pallet surface.
///
/// Pallets are immutable values; escalation creates new instances via
/// [`Pallet::scale`] or [`Pallet::grown`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct Pallet {
    #[schema(example = 40.0)]
    pub width: f64,
    #[schema(example = 48.0)]
    pub length: f64,
}

impl Pallet {
    pub const DEFAULT_WIDTH: f64 = 40.0;
    pub const DEFAULT_LENGTH: f64 = 48.0;

    /// Creates a new pallet with validation.
    pub fn new(width: f64, length: f64) -> Result<Self, ValidationError> {
        validation::validate_dimension(width, "Pallet width")
            .map_err(ValidationError::InvalidDimension)?;
        validation::validate_dimension(length, "Pallet length")
            .map_err(ValidationError::InvalidDimension)?;
        Ok(Self { width, length })
    }

    /// Area of the load surface.
    pub fn area(&self) -> f64 {
        self.width * self.length
    }

    /// Checks whether this pallet equals the given standard size.
    pub fn is_standard_size(&self, standard: &Pallet) -> bool {
        (self.width - standard.width).abs() <= EPSILON_GENERAL
            && (self.length - standard.length).abs() <= EPSILON_GENERAL
    }

    /// Creates a new pallet with both sides multiplied by `factor`.
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            width: self.width * factor,
            length: self.length * factor,
        }
    }

    /// Creates a new pallet enlarged independently along both sides.
    pub fn grown(&self, extra_width: f64, extra_length: f64) -> Self {
        Self {
            width: self.width + extra_width,
            length: self.length + extra_length,
        }
    }

    /// Pallet dimensions as a vector.
    #[inline]
    pub fn dims(&self) -> Vec2 {
        Vec2::new(self.width, self.length)
    }
}

impl Default for Pallet {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            length: Self::DEFAULT_LENGTH,
        }
    }
}

impl Dimensional for Pallet {
    fn dimensions(&self) -> Vec2 {
        self.dims()
    }
}

impl std::fmt::Display for Pallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pallet({:.2} x {:.2})", self.width, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_creation_keeps_ordered_dimensions() {
        let b = Box2D::new(10.0, 20.0).unwrap();
        assert_eq!(b.width, 10.0);
        assert_eq!(b.length, 20.0);
        assert!((b.area() - 200.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn box_creation_swaps_when_width_exceeds_length() {
        assert!(Box2D::needs_swap(20.0, 10.0));
        let b = Box2D::new(20.0, 10.0).unwrap();
        assert_eq!((b.width, b.length), (10.0, 20.0));
    }

    #[test]
    fn box_rejects_non_positive_dimensions() {
        assert!(matches!(
            Box2D::new(0.0, 10.0),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(Box2D::new(10.0, -5.0).is_err());
        assert!(Box2D::new(f64::NAN, 5.0).is_err());
    }

    #[test]
    fn box_respects_dimension_limits() {
        assert!(Box2D::with_limits(5.0, 8.0, 0.5, 48.0).is_ok());
        assert!(Box2D::with_limits(0.1, 8.0, 0.5, 48.0).is_err());
        assert!(Box2D::with_limits(5.0, 60.0, 0.5, 48.0).is_err());
    }

    #[test]
    fn box_footprint_per_orientation() {
        let b = Box2D::new(10.0, 20.0).unwrap();
        assert_eq!(b.footprint(Orientation::Normal), Vec2::new(10.0, 20.0));
        assert_eq!(b.footprint(Orientation::Rotated), Vec2::new(20.0, 10.0));
        assert_eq!(Orientation::Normal.flipped(), Orientation::Rotated);
    }

    #[test]
    fn box_orientation_for_space() {
        let b = Box2D::new(10.0, 20.0).unwrap();

        assert!(b.can_fit_in_space(Vec2::new(25.0, 25.0)));
        assert!(b.can_fit_in_space(Vec2::new(25.0, 15.0)));
        assert!(!b.can_fit_in_space(Vec2::new(8.0, 8.0)));

        assert_eq!(
            b.best_orientation_for_space(Vec2::new(15.0, 25.0)),
            Some(Orientation::Normal)
        );
        assert_eq!(
            b.best_orientation_for_space(Vec2::new(25.0, 15.0)),
            Some(Orientation::Rotated)
        );
        assert_eq!(b.best_orientation_for_space(Vec2::new(8.0, 8.0)), None);
    }

    #[test]
    fn pallet_defaults_and_scaling() {
        let pallet = Pallet::default();
        assert_eq!(pallet.width, 40.0);
        assert_eq!(pallet.length, 48.0);
        assert!((pallet.area() - 1920.0).abs() < EPSILON_GENERAL);

        let scaled = pallet.scale(2.0);
        assert_eq!(scaled.width, 80.0);
        assert_eq!(scaled.length, 96.0);
        assert!(!scaled.is_standard_size(&pallet));
        assert!(pallet.is_standard_size(&Pallet::default()));

        let grown = pallet.grown(0.0625, 1.0);
        assert!((grown.width - 40.0625).abs() < EPSILON_GENERAL);
        assert!((grown.length - 49.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn pallet_rejects_invalid_dimensions() {
        assert!(Pallet::new(0.0, 48.0).is_err());
        assert!(Pallet::new(50.0, 60.0).is_ok());
    }
}
