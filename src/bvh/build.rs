//! Median-index BVH builder.
//!
//! Splits a triangle range at its array midpoint until ranges fit in a leaf.
//! Triangles are never reordered, so leaf ranges index straight into the
//! triangle store. Nodes are emitted in pre-order: a node's slot is reserved
//! before its subtrees are built, and its child indices are patched in once
//! the children have slots, so index 0 is always the root of a full build.

use super::node::BvhNode;
use crate::scene::Triangle;
use crate::util::{Aabb, Error, Result};
use tracing::debug;

/// Default maximum number of triangles per leaf.
pub const DEFAULT_MAX_LEAF_SIZE: usize = 4;

/// Built BVH: flat node array, index 0 = root.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    max_leaf_size: usize,
}

impl Default for Bvh {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
        }
    }
}

impl Bvh {
    #[cfg(test)]
    pub(crate) fn from_parts(nodes: Vec<BvhNode>, max_leaf_size: usize) -> Self {
        Self {
            nodes,
            max_leaf_size,
        }
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.first()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True until the first build.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Leaf size the tree was built with.
    pub fn max_leaf_size(&self) -> usize {
        self.max_leaf_size
    }

    /// All leaf nodes in array order.
    pub fn leaves(&self) -> impl Iterator<Item = &BvhNode> + '_ {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    /// Raw bytes in upload layout.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }
}

/// Which child slot of the parent a pending range fills.
#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Pending range on the explicit work stack.
struct Task {
    start: usize,
    end: usize,
    parent: Option<(usize, Side)>,
}

/// BVH builder configured with a validated leaf size.
#[derive(Debug, Clone, Copy)]
pub struct BvhBuilder {
    max_leaf_size: usize,
}

impl Default for BvhBuilder {
    fn default() -> Self {
        Self {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
        }
    }
}

impl BvhBuilder {
    /// Fails with `InvalidBuildParameter` for a leaf size of 0.
    pub fn new(max_leaf_size: usize) -> Result<Self> {
        if max_leaf_size < 1 {
            return Err(Error::build_parameter(format!(
                "max_leaf_size must be at least 1, got {max_leaf_size}"
            )));
        }
        Ok(Self { max_leaf_size })
    }

    pub fn max_leaf_size(&self) -> usize {
        self.max_leaf_size
    }

    /// Build a fresh tree over all of `triangles`.
    ///
    /// An empty slice yields a single leaf with `count = 0` and an inverted box.
    #[tracing::instrument(skip_all, fields(tri_count = triangles.len(), max_leaf_size = self.max_leaf_size))]
    pub fn build(&self, triangles: &[Triangle]) -> Result<Bvh> {
        // The number of nodes in the worst case (one triangle per leaf) is
        // 2 * n - 1, since only leaves hold triangles
        let mut nodes = Vec::with_capacity(2 * triangles.len().max(1));
        let root = self.build_range(triangles, 0, triangles.len(), &mut nodes)?;
        assert_eq!(root, 0, "full build must start from an empty node array");

        debug!("built {} nodes", nodes.len());
        Ok(Bvh {
            nodes,
            max_leaf_size: self.max_leaf_size,
        })
    }

    /// Append the subtree for `triangles[start..end]` to `nodes` and return
    /// the index of its root.
    ///
    /// Leaf `first` values are absolute indices into `triangles`. Parameters
    /// are checked before `nodes` is touched.
    pub fn build_range(
        &self,
        triangles: &[Triangle],
        start: usize,
        end: usize,
        nodes: &mut Vec<BvhNode>,
    ) -> Result<usize> {
        if start > end {
            return Err(Error::build_parameter(format!(
                "inverted triangle range {start}..{end}"
            )));
        }
        if end > triangles.len() {
            return Err(Error::build_parameter(format!(
                "triangle range {start}..{end} exceeds triangle count {}",
                triangles.len()
            )));
        }
        let max_nodes = nodes.len() + 2 * (end - start).max(1);
        if end > i32::MAX as usize || max_nodes > i32::MAX as usize {
            return Err(Error::build_parameter(format!(
                "{} triangles do not fit 32-bit node fields",
                end - start
            )));
        }

        let root = nodes.len();
        // Right is pushed before left so the left subtree is emitted first,
        // giving the same layout as the recursive formulation.
        let mut stack = vec![Task {
            start,
            end,
            parent: None,
        }];

        while let Some(task) = stack.pop() {
            let bounds = range_bounds(&triangles[task.start..task.end]);
            let node_idx = nodes.len();
            let count = task.end - task.start;

            if count <= self.max_leaf_size {
                nodes.push(BvhNode::new_leaf(&bounds, task.start as i32, count as i32));
            } else {
                nodes.push(BvhNode::new_interior(&bounds));

                let mid = task.start + count / 2;
                stack.push(Task {
                    start: mid,
                    end: task.end,
                    parent: Some((node_idx, Side::Right)),
                });
                stack.push(Task {
                    start: task.start,
                    end: mid,
                    parent: Some((node_idx, Side::Left)),
                });
            }

            if let Some((parent, side)) = task.parent {
                match side {
                    Side::Left => nodes[parent].left = node_idx as i32,
                    Side::Right => nodes[parent].right = node_idx as i32,
                }
            }
        }

        Ok(root)
    }
}

/// Componentwise min/max over every vertex of every triangle.
fn range_bounds(triangles: &[Triangle]) -> Aabb {
    Aabb::from_points(triangles.iter().flat_map(|t| t.positions()))
}
