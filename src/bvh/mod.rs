//! Bounding volume hierarchy over the scene's triangle soup.
//!
//! ## Layout
//! ```text
//! TriangleStore [t0 t1 t2 ... tn-1]   (never reordered)
//!        ^  leaf.first .. leaf.first + leaf.count
//! nodes  [root, left subtree..., right subtree...]   (pre-order, index 0 = root)
//! ```

mod build;
mod node;
mod validate;

pub use build::{Bvh, BvhBuilder, DEFAULT_MAX_LEAF_SIZE};
pub use node::BvhNode;
pub use validate::{BvhStats, ValidationError};
