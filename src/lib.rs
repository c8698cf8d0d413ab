//! # scene-bvh
//!
//! Flattens loaded meshes into a self-contained triangle soup and builds a
//! bounding volume hierarchy over it, laid out as flat arrays that a GPU ray
//! tracer can upload and traverse directly.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math re-exports, bounding boxes
//! - [`mesh`] - Mesh data model and the mesh loaders (OBJ, in-memory)
//! - [`scene`] - Triangle store and scene assembly
//! - [`bvh`] - BVH node layout, builder and validation
//! - [`gpu`] - Upload snapshot of the triangle and node arrays
//! - [`settings`] - Persistent build settings
//!
//! ## Example
//!
//! ```ignore
//! use scene_bvh::prelude::*;
//!
//! let mut scene = Scene::new();
//! scene.add_mesh("bunny.obj", Mat4::IDENTITY, true)?;
//! scene.add_mesh("floor.obj", Mat4::IDENTITY, false)?;
//! scene.rebuild_acceleration_structure(DEFAULT_MAX_LEAF_SIZE)?;
//!
//! let data = scene.gpu_data();
//! queue.write_buffer(&tri_buffer, 0, data.triangles_bytes());
//! queue.write_buffer(&node_buffer, 0, data.nodes_bytes());
//! ```

pub mod util;
pub mod mesh;
pub mod scene;
pub mod bvh;
pub mod gpu;
pub mod settings;

// Re-export commonly used types
pub use util::{Error, Result};
pub use scene::Scene;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Aabb, Error, Mat4, Result, Vec2, Vec3};
    pub use crate::mesh::{LoadOptions, LoadedMesh, Material, Mesh, MeshLoader, ObjLoader, Vertex};
    pub use crate::scene::{Scene, Triangle, TriangleStore};
    pub use crate::bvh::{Bvh, BvhBuilder, BvhNode, DEFAULT_MAX_LEAF_SIZE};
    pub use crate::gpu::GpuSceneData;
    pub use crate::settings::Settings;
}
