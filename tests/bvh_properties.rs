//! Structural properties of built BVHs over scattered triangle soups.

use scene_bvh::bvh::{BvhStats, ValidationError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_bvh::prelude::*;

/// Uniform point in the cube of edge `scale` centred on the origin.
fn point(rng: &mut StdRng, scale: f32) -> Vec3 {
    let half = scale * 0.5;
    Vec3::new(
        rng.gen_range(-half..half),
        rng.gen_range(-half..half),
        rng.gen_range(-half..half),
    )
}

/// Seeded so every run sees the same soup.
fn soup(n: usize, seed: u64) -> Vec<Triangle> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let center = point(&mut rng, 100.0);
            let v = |p: Vec3| Vertex::new(p, Vec3::Y, Vec2::ZERO);
            Triangle {
                v0: v(center + point(&mut rng, 2.0)),
                v1: v(center + point(&mut rng, 2.0)),
                v2: v(center + point(&mut rng, 2.0)),
                material: Material {
                    shininess: i as f32,
                    ..Default::default()
                },
            }
        })
        .collect()
}

/// Sorted triangle indices covered by every leaf.
fn leaf_indices(bvh: &Bvh) -> Vec<usize> {
    let mut covered: Vec<usize> = bvh
        .leaves()
        .filter_map(|n| n.triangle_range())
        .flatten()
        .collect();
    covered.sort_unstable();
    covered
}

#[test]
fn test_leaves_partition_triangles() {
    for (n, leaf) in [(1, 1), (7, 2), (64, 4), (1000, 4), (1001, 8), (333, 1)] {
        let tris = soup(n, n as u64);
        let bvh = BvhBuilder::new(leaf).unwrap().build(&tris).unwrap();
        assert_eq!(leaf_indices(&bvh), (0..n).collect::<Vec<_>>(), "n={n} leaf={leaf}");
        assert_eq!(bvh.validate(&tris), Ok(()), "n={n} leaf={leaf}");
    }
}

#[test]
fn test_bounds_are_tight() {
    let tris = soup(500, 7);
    let bvh = BvhBuilder::new(3).unwrap().build(&tris).unwrap();

    for node in bvh.nodes() {
        let bounds = node.bounds();
        assert!(!bounds.is_empty());
        if let Some(range) = node.triangle_range() {
            let exact = Aabb::from_points(tris[range].iter().flat_map(|t| t.positions()));
            assert_eq!(bounds, exact);
        } else {
            let mut union = bvh.nodes()[node.left as usize].bounds();
            union.expand_by_box(&bvh.nodes()[node.right as usize].bounds());
            assert_eq!(bounds, union);
        }
    }

    let all = Aabb::from_points(tris.iter().flat_map(|t| t.positions()));
    assert_eq!(bvh.root().unwrap().bounds(), all);
}

#[test]
fn test_root_first_and_children_after_parent() {
    let tris = soup(200, 3);
    let bvh = BvhBuilder::new(4).unwrap().build(&tris).unwrap();

    let root = bvh.root().unwrap();
    assert!(!root.is_leaf());
    for (i, node) in bvh.nodes().iter().enumerate() {
        if !node.is_leaf() {
            // Pre-order: left child immediately follows its parent
            assert_eq!(node.left as usize, i + 1);
            assert!(node.right > node.left);
            assert_eq!(node.first, -1);
            assert_eq!(node.count, 0);
        }
    }
}

#[test]
fn test_rebuild_is_deterministic() {
    let tris = soup(777, 11);
    let builder = BvhBuilder::new(5).unwrap();
    let a = builder.build(&tris).unwrap();
    let b = builder.build(&tris).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn test_leaf_size_bound() {
    let tris = soup(1000, 5);
    for leaf in [1, 2, 3, 4, 16, 1000, 5000] {
        let bvh = BvhBuilder::new(leaf).unwrap().build(&tris).unwrap();
        let stats: BvhStats = bvh.stats();
        assert!(stats.max_leaf_size <= leaf, "leaf={leaf}");
        assert!(stats.min_leaf_size >= 1, "leaf={leaf}");
        assert_eq!(stats.node_count, 2 * stats.leaf_count - 1);
    }

    // Median split halves the range, so depth stays logarithmic
    let stats = BvhBuilder::new(1).unwrap().build(&tris).unwrap().stats();
    assert_eq!(stats.leaf_count, 1000);
    assert_eq!(stats.max_depth, 11);
}

#[test]
fn test_empty_store_yields_sentinel_leaf() {
    let bvh = BvhBuilder::new(4).unwrap().build(&[]).unwrap();
    assert_eq!(bvh.len(), 1);

    let root = bvh.root().unwrap();
    assert!(root.is_leaf());
    assert_eq!(root.count, 0);
    assert_eq!(root.aabb_min, [f32::INFINITY; 3]);
    assert_eq!(root.aabb_max, [f32::NEG_INFINITY; 3]);
    assert!(root.bounds().is_empty());
    assert_eq!(bvh.validate(&[]), Ok(()));
}

#[test]
fn test_four_triangles_single_leaf() {
    let tris = soup(4, 1);
    let bvh = BvhBuilder::new(4).unwrap().build(&tris).unwrap();
    assert_eq!(bvh.len(), 1);
    assert_eq!((bvh.nodes()[0].first, bvh.nodes()[0].count), (0, 4));
}

#[test]
fn test_five_triangles_split_two_three() {
    let tris = soup(5, 2);
    let bvh = BvhBuilder::new(4).unwrap().build(&tris).unwrap();
    assert_eq!(bvh.len(), 3);

    let root = bvh.nodes()[0];
    let left = bvh.nodes()[root.left as usize];
    let right = bvh.nodes()[root.right as usize];
    assert_eq!(left.triangle_range(), Some(0..2));
    assert_eq!(right.triangle_range(), Some(2..5));
    assert_eq!(bvh.validate(&tris), Ok(()));
}

#[test]
fn test_validate_rejects_stale_tree() {
    let tris = soup(40, 9);
    let bvh = BvhBuilder::new(4).unwrap().build(&tris).unwrap();

    // Fewer triangles than the tree was built over
    let err = bvh.validate(&tris[..30]).unwrap_err();
    assert!(matches!(err, ValidationError::LeafOutOfBounds { .. }));

    // Same count, different geometry
    let moved = soup(40, 10);
    let err = bvh.validate(&moved).unwrap_err();
    assert!(matches!(err, ValidationError::LooseBounds { .. }));
}

#[test]
fn test_upload_layout() {
    let tris = soup(10, 4);
    let bvh = BvhBuilder::new(2).unwrap().build(&tris).unwrap();
    let data = GpuSceneData::new(&tris, &bvh);

    assert_eq!(data.triangles_bytes().len(), 10 * std::mem::size_of::<Triangle>());
    assert_eq!(data.nodes_bytes().len(), bvh.len() * std::mem::size_of::<BvhNode>());
    assert_eq!(data.nodes_bytes(), bvh.as_bytes());
    assert_eq!(data.node_count as usize, bvh.len());
}
