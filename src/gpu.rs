//! Snapshot of the scene arrays for GPU upload.

use crate::bvh::{Bvh, BvhNode};
use crate::scene::Triangle;
use std::fs;
use std::path::Path;

/// Complete scene data ready for GPU upload.
///
/// Owns copies of both arrays, so a consumer on another thread never sees a
/// node array that is still being rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuSceneData {
    /// Triangle soup in store order (leaf ranges index into it).
    pub triangles: Vec<Triangle>,
    /// Flat BVH node array, index 0 = root.
    pub nodes: Vec<BvhNode>,
    /// Total triangle count.
    pub tri_count: u32,
    /// Total node count.
    pub node_count: u32,
}

impl GpuSceneData {
    pub fn new(triangles: &[Triangle], bvh: &Bvh) -> Self {
        Self {
            triangles: triangles.to_vec(),
            nodes: bvh.nodes().to_vec(),
            tri_count: triangles.len() as u32,
            node_count: bvh.len() as u32,
        }
    }

    /// Triangle data as bytes.
    pub fn triangles_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// BVH nodes as bytes.
    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Write `triangles.bin` and `nodes.bin` into `dir`.
    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join("triangles.bin"), self.triangles_bytes())?;
        fs::write(dir.join("nodes.bin"), self.nodes_bytes())?;
        Ok(())
    }
}
