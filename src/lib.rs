//! Single-layer pallet planning for identical boxes.
//!
//! Given a box footprint and a count, the planner searches for an
//! arrangement of normal and rotated boxes that fits the standard pallet,
//! enlarging the pallet when necessary, or for the best count on the
//! standard pallet.

pub mod api;
pub mod candidates;
pub mod column;
pub mod config;
pub mod flexible;
pub mod geometry;
pub mod grid;
pub mod model;
pub mod optimizer;
pub mod patterns;
pub mod placement;
pub mod scaling;
pub mod selection;
pub mod spatial;
pub mod strategy;
pub mod types;

pub use grid::{Cell, Grid};
pub use model::{Box2D, Orientation, Pallet, ValidationError};
pub use optimizer::{
    Arrangement, LayoutConfig, SearchError, SearchEvent, auto_optimize, find_arrangement,
};
