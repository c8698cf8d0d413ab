//! Vertex-level helpers applied by loaders: position normalisation and
//! normal generation.

use super::LoadedMesh;
use crate::util::{Aabb, Vec3};

/// Recenter all meshes on the origin and scale them uniformly so the largest
/// extent of their combined bounding box is 1.
///
/// Sub-meshes of one file are normalised together so they keep their
/// relative placement. Degenerate (flat in every axis or empty) input is only
/// recentred.
pub fn normalize_positions(meshes: &mut [LoadedMesh]) {
    let bounds = Aabb::from_points(
        meshes
            .iter()
            .flat_map(|m| m.vertices.iter().map(|v| v.position())),
    );
    if bounds.is_empty() {
        return;
    }

    let center = bounds.center();
    let extent = bounds.size().max_element();
    let scale = if extent > 0.0 { 1.0 / extent } else { 1.0 };

    for mesh in meshes.iter_mut() {
        for v in mesh.vertices.iter_mut() {
            v.position = ((v.position() - center) * scale).to_array();
        }
    }
}

/// Area-weighted per-vertex normals for an indexed triangle list.
///
/// Triples that reference missing vertices are skipped here; index validation
/// happens when the mesh is ingested.
pub fn generate_normals(positions: &[Vec3], triangles: &[[u32; 3]]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for tri in triangles {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let (Some(&p0), Some(&p1), Some(&p2)) = (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };

        // Cross product length is twice the area, which is the weight we want
        let face_normal = (p1 - p0).cross(p2 - p0);
        normals[a] += face_normal;
        normals[b] += face_normal;
        normals[c] += face_normal;
    }

    for n in normals.iter_mut() {
        *n = n.normalize_or_zero();
    }
    normals
}
