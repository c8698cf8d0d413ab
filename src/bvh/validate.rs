//! Structural checks and statistics for a built BVH.

use super::build::Bvh;
use super::node::BvhNode;
use crate::scene::Triangle;
use crate::util::Aabb;
use thiserror::Error;

/// Violation of the BVH layout contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("BVH has no nodes")]
    Empty,

    #[error("Node {node}: child index {child} out of bounds (node count: {count})")]
    ChildOutOfBounds { node: usize, child: i32, count: usize },

    #[error("Node {node} is reachable more than once")]
    SharedNode { node: usize },

    #[error("{unreachable} nodes are not reachable from the root")]
    Unreachable { unreachable: usize },

    #[error("Leaf {node}: range {first}+{count} outside triangle count {triangle_count}")]
    LeafOutOfBounds {
        node: usize,
        first: i32,
        count: i32,
        triangle_count: usize,
    },

    #[error("Leaf {node}: {count} triangles, allowed 1..={max}")]
    LeafSize { node: usize, count: i32, max: usize },

    #[error("Triangle {index} covered by {times} leaves")]
    Coverage { index: usize, times: u32 },

    #[error("Node {node}: bounding box is not the tight bound of its triangles")]
    LooseBounds { node: usize },
}

/// Shape statistics of a BVH.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BvhStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_depth: usize,
    pub min_leaf_size: usize,
    pub max_leaf_size: usize,
    pub avg_leaf_size: f32,
}

impl Bvh {
    /// Check the layout contract against the triangles it was built over.
    ///
    /// Verifies that every node is reachable exactly once from index 0, that
    /// the leaves partition `[0, triangles.len())`, that leaf sizes respect the
    /// build limit and that every box is the exact bound of its triangles.
    pub fn validate(&self, triangles: &[Triangle]) -> Result<(), ValidationError> {
        let nodes = self.nodes();
        if nodes.is_empty() {
            return Err(ValidationError::Empty);
        }

        let node_count = nodes.len();
        let mut visited = vec![false; node_count];
        let mut order = Vec::with_capacity(node_count);
        let mut coverage = vec![0u32; triangles.len()];
        let mut stack = vec![0usize];

        while let Some(idx) = stack.pop() {
            if visited[idx] {
                return Err(ValidationError::SharedNode { node: idx });
            }
            visited[idx] = true;
            order.push(idx);

            let node = &nodes[idx];
            if node.is_leaf() {
                let range = leaf_range(idx, node, triangles.len())?;
                // A zero-sized leaf is only legal as the root of an empty scene
                let min = if triangles.is_empty() { 0 } else { 1 };
                if node.count < min || node.count as usize > self.max_leaf_size() {
                    return Err(ValidationError::LeafSize {
                        node: idx,
                        count: node.count,
                        max: self.max_leaf_size(),
                    });
                }
                for i in range {
                    coverage[i] += 1;
                }
            } else {
                for child in [node.right, node.left] {
                    if child < 0 || child as usize >= node_count {
                        return Err(ValidationError::ChildOutOfBounds {
                            node: idx,
                            child,
                            count: node_count,
                        });
                    }
                    stack.push(child as usize);
                }
            }
        }

        if order.len() != node_count {
            return Err(ValidationError::Unreachable {
                unreachable: node_count - order.len(),
            });
        }

        if let Some((index, &times)) = coverage.iter().enumerate().find(|(_, &c)| c != 1) {
            return Err(ValidationError::Coverage { index, times });
        }

        // Reverse pre-order visits children before their parent
        let mut expected = vec![Aabb::EMPTY; node_count];
        for &idx in order.iter().rev() {
            let node = &nodes[idx];
            let bounds = match node.triangle_range() {
                Some(range) => Aabb::from_points(triangles[range].iter().flat_map(|t| t.positions())),
                None => {
                    let mut bb = expected[node.left as usize];
                    bb.expand_by_box(&expected[node.right as usize]);
                    bb
                }
            };
            if node.bounds() != bounds {
                return Err(ValidationError::LooseBounds { node: idx });
            }
            expected[idx] = bounds;
        }

        Ok(())
    }

    /// Node, leaf and depth statistics. Assumes a structurally valid tree.
    pub fn stats(&self) -> BvhStats {
        let nodes = self.nodes();
        if nodes.is_empty() {
            return BvhStats::default();
        }

        let mut stats = BvhStats {
            node_count: nodes.len(),
            min_leaf_size: usize::MAX,
            ..Default::default()
        };
        let mut total = 0usize;
        let mut stack = vec![(0usize, 1usize)];

        while let Some((idx, depth)) = stack.pop() {
            let Some(node) = nodes.get(idx) else { continue };
            stats.max_depth = stats.max_depth.max(depth);

            if node.is_leaf() {
                let count = node.count.max(0) as usize;
                stats.leaf_count += 1;
                stats.min_leaf_size = stats.min_leaf_size.min(count);
                stats.max_leaf_size = stats.max_leaf_size.max(count);
                total += count;
            } else {
                stack.push((node.right as usize, depth + 1));
                stack.push((node.left as usize, depth + 1));
            }
        }

        if stats.leaf_count == 0 {
            stats.min_leaf_size = 0;
        } else {
            stats.avg_leaf_size = total as f32 / stats.leaf_count as f32;
        }
        stats
    }
}

fn leaf_range(
    idx: usize,
    node: &BvhNode,
    triangle_count: usize,
) -> Result<std::ops::Range<usize>, ValidationError> {
    let out_of_bounds = || ValidationError::LeafOutOfBounds {
        node: idx,
        first: node.first,
        count: node.count,
        triangle_count,
    };
    let range = node.triangle_range().ok_or_else(out_of_bounds)?;
    if range.end > triangle_count {
        return Err(out_of_bounds());
    }
    Ok(range)
}
