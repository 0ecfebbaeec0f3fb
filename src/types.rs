//! Common types and traits for 2D layer geometry.
//!
//! This module defines the small value types shared by the grid evaluator,
//! the spatial placement records and the HTTP layer.

use std::cmp::Ordering;
use std::ops::Add;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
///
/// Used for all fit checks so that scaled pallets (e.g. `40.0 * 1.1`) do not
/// reject exact fits because of rounding.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Represents a 2D vector or point in the pallet plane.
///
/// `x` runs left to right along the pallet width, `y` runs top to bottom
/// along the pallet length.
///
/// # Examples
/// ```
/// use layer_it_now::types::Vec2;
///
/// let position = Vec2::new(10.0, 20.0);
/// let dims = Vec2::new(5.0, 8.0);
/// let corner = position + dims;
/// assert_eq!(corner, Vec2::new(15.0, 28.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// Creates a new 2D vector.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Creates a zero vector (origin, top-left pallet corner).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Calculates the area spanned by the vector when used as dimensions.
    #[inline]
    pub fn area(&self) -> f64 {
        self.x * self.y
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    ///
    /// # Parameters
    /// * `outer` - The outer vector (e.g. pallet dimensions)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, outer: &Self, tolerance: f64) -> bool {
        self.x <= outer.x + tolerance && self.y <= outer.y + tolerance
    }
}

impl Add for Vec2 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Trait for objects with a rectangular extent in the pallet plane.
pub trait Dimensional {
    /// Returns the (width, length) extent of the object.
    fn dimensions(&self) -> Vec2;

    /// Calculates the covered area.
    fn area(&self) -> f64 {
        self.dimensions().area()
    }
}

/// Trait for objects with a position in the pallet plane.
pub trait Positioned {
    /// Returns the position of the top-left corner.
    fn position(&self) -> Vec2;
}

/// Axis-aligned rectangle used for overlap tests between placements.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingRect {
    /// Top-left corner
    pub min: Vec2,
    /// Bottom-right corner
    pub max: Vec2,
}

impl BoundingRect {
    /// Creates a rectangle from position and dimensions.
    #[inline]
    pub fn from_position_and_dims(position: Vec2, dims: Vec2) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Checks whether two rectangles share interior area.
    ///
    /// Touching edges do not count as an intersection.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

/// Compares two values, treating differences up to `eps` as equal.
pub fn compare_with_epsilon(a: f64, b: f64, eps: f64) -> Ordering {
    if (a - b).abs() <= eps {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Validation functions shared by the model and the request layer.
pub mod validation {

    /// Validates a single dimension.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the dimension for error messages
    pub fn validate_dimension(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        Ok(())
    }

    /// Validates that a dimension lies within the inclusive `[min, max]` range.
    pub fn validate_dimension_range(
        value: f64,
        name: &str,
        min: f64,
        max: f64,
    ) -> Result<(), String> {
        validate_dimension(value, name)?;
        if value < min || value > max {
            return Err(format!(
                "{} must be between {} and {}, got: {}",
                name, min, max, value
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_operations() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(4.0, 6.0);

        assert_eq!(a + b, Vec2::new(5.0, 8.0));
        assert!((b.area() - 24.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn test_vec2_fits_within() {
        let small = Vec2::new(5.0, 5.0);
        let large = Vec2::new(10.0, 10.0);

        assert!(small.fits_within(&large, EPSILON_GENERAL));
        assert!(!large.fits_within(&small, EPSILON_GENERAL));
        // Rounding noise is absorbed by the tolerance
        let noisy = Vec2::new(44.000_000_000_1, 10.0);
        assert!(noisy.fits_within(&Vec2::new(44.0, 10.0), EPSILON_GENERAL));
    }

    #[test]
    fn test_bounding_rect_intersects() {
        let a = BoundingRect::from_position_and_dims(Vec2::zero(), Vec2::new(10.0, 10.0));
        let b = BoundingRect::from_position_and_dims(Vec2::new(5.0, 5.0), Vec2::new(10.0, 10.0));
        let touching =
            BoundingRect::from_position_and_dims(Vec2::new(10.0, 0.0), Vec2::new(5.0, 5.0));

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&touching));
    }

    #[test]
    fn test_validation_dimension() {
        assert!(validation::validate_dimension(10.0, "Width").is_ok());
        assert!(validation::validate_dimension(0.0, "Width").is_err());
        assert!(validation::validate_dimension(-1.0, "Width").is_err());
        assert!(validation::validate_dimension(f64::NAN, "Width").is_err());
        assert!(validation::validate_dimension(f64::INFINITY, "Width").is_err());
        assert!(validation::validate_dimension_range(5.0, "Width", 0.5, 48.0).is_ok());
        assert!(validation::validate_dimension_range(50.0, "Width", 0.5, 48.0).is_err());
    }

    #[test]
    fn test_compare_with_epsilon() {
        assert_eq!(compare_with_epsilon(1.0, 1.0 + 1e-9, 1e-6), Ordering::Equal);
        assert_eq!(compare_with_epsilon(1.0, 2.0, 1e-6), Ordering::Less);
        assert_eq!(compare_with_epsilon(2.0, 1.0, 1e-6), Ordering::Greater);
    }
}
