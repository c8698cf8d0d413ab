//! Utility types shared by the rest of the crate.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`Aabb`] - Axis-aligned bounding box
//! - Math type re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
