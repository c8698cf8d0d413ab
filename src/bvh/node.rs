//! GPU-facing BVH node layout.

use crate::util::{Aabb, Vec3};
use bytemuck::{Pod, Zeroable};

/// Flat BVH node (48 bytes, matches the traversal shader's struct).
///
/// Both corners start on a 16-byte boundary and are followed by four 32-bit
/// integers.
///
/// Interior node: `left`/`right` = child node indices, `first = -1`, `count = 0`
/// Leaf node: `left = right = -1`, triangles `[first, first + count)`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BvhNode {
    pub aabb_min: [f32; 3],
    pub _pad0: u32,
    pub aabb_max: [f32; 3],
    pub _pad1: u32,
    pub left: i32,
    pub right: i32,
    pub first: i32,
    pub count: i32,
}

const _: () = assert!(std::mem::size_of::<BvhNode>() == 48);
const _: () = assert!(std::mem::align_of::<BvhNode>() == 4);

impl BvhNode {
    /// Child index sentinel for leaves.
    pub const NO_CHILD: i32 = -1;

    pub fn new_leaf(bounds: &Aabb, first: i32, count: i32) -> Self {
        Self {
            aabb_min: bounds.min.to_array(),
            _pad0: 0,
            aabb_max: bounds.max.to_array(),
            _pad1: 0,
            left: Self::NO_CHILD,
            right: Self::NO_CHILD,
            first,
            count,
        }
    }

    /// Interior node with children still to be patched in.
    pub fn new_interior(bounds: &Aabb) -> Self {
        Self {
            left: Self::NO_CHILD,
            right: Self::NO_CHILD,
            first: -1,
            count: 0,
            ..Self::new_leaf(bounds, 0, 0)
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left == Self::NO_CHILD && self.right == Self::NO_CHILD
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(Vec3::from(self.aabb_min), Vec3::from(self.aabb_max))
    }

    /// Triangle range of a leaf, `None` for interior nodes.
    pub fn triangle_range(&self) -> Option<std::ops::Range<usize>> {
        if !self.is_leaf() || self.first < 0 || self.count < 0 {
            return None;
        }
        let first = self.first as usize;
        Some(first..first + self.count as usize)
    }
}
