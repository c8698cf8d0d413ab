//! Mesh data model and the mesh-loading collaborator.
//!
//! A loader turns a file into one or more [`LoadedMesh`] values (one per
//! object or material group). The scene resolves each loaded material into a
//! GPU-ready [`Material`] and keeps the result as a [`Mesh`].

mod geometry;
pub mod obj;

pub use geometry::{generate_normals, normalize_positions};
pub use obj::ObjLoader;

use crate::util::{Error, Result, Vec2, Vec3};
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Vertex as stored inside triangles (48 bytes).
///
/// Every vector starts on a 16-byte boundary so the struct can be read
/// directly as a storage-buffer element.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub _pad0: f32,
    pub normal: [f32; 3],
    pub _pad1: f32,
    pub tex_coord: [f32; 2],
    pub _pad2: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<Vertex>() == 48);

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position: position.to_array(),
            _pad0: 0.0,
            normal: normal.to_array(),
            _pad1: 0.0,
            tex_coord: tex_coord.to_array(),
            _pad2: [0.0; 2],
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    #[inline]
    pub fn normal(&self) -> Vec3 {
        Vec3::from(self.normal)
    }

    #[inline]
    pub fn tex_coord(&self) -> Vec2 {
        Vec2::from(self.tex_coord)
    }
}

/// Resolved material copied into every triangle (32 bytes).
///
/// Layout: `diffuse` rgb + `shininess`, then `transparency`, `ior`,
/// `texture` handle (`-1` = none) and one padding word.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Material {
    pub diffuse: [f32; 3],
    pub shininess: f32,
    pub transparency: f32,
    pub ior: f32,
    pub texture: i32,
    pub _pad: u32,
}

const _: () = assert!(std::mem::size_of::<Material>() == 32);

impl Material {
    /// Texture handle value meaning "no texture".
    pub const NO_TEXTURE: i32 = -1;

    /// Texture handle into the scene's texture table, if any.
    pub fn texture(&self) -> Option<u32> {
        u32::try_from(self.texture).ok()
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: [0.8, 0.8, 0.8],
            shininess: 0.0,
            transparency: 0.0,
            ior: 1.0,
            texture: Self::NO_TEXTURE,
            _pad: 0,
        }
    }
}

/// A mesh owned by the scene: vertices, index triples and one material.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<[u32; 3]>,
    pub material: Material,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Check that every index triple addresses the vertex array.
    pub fn validate(&self) -> Result<()> {
        validate_triangles(&self.name, &self.triangles, self.vertices.len())
    }
}

/// Material as described by the source file, before texture resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedMaterial {
    pub diffuse: Vec3,
    pub shininess: f32,
    pub transparency: f32,
    pub ior: f32,
    pub texture: Option<PathBuf>,
}

impl Default for LoadedMaterial {
    fn default() -> Self {
        let m = Material::default();
        Self {
            diffuse: Vec3::from(m.diffuse),
            shininess: m.shininess,
            transparency: m.transparency,
            ior: m.ior,
            texture: None,
        }
    }
}

impl LoadedMaterial {
    /// Bake into a GPU material using an already resolved texture handle.
    pub fn resolve(&self, texture: Option<u32>) -> Material {
        Material {
            diffuse: self.diffuse.to_array(),
            shininess: self.shininess,
            transparency: self.transparency,
            ior: self.ior,
            texture: texture
                .and_then(|t| i32::try_from(t).ok())
                .unwrap_or(Material::NO_TEXTURE),
            _pad: 0,
        }
    }
}

/// One sub-mesh returned by a [`MeshLoader`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedMesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<[u32; 3]>,
    pub material: LoadedMaterial,
}

impl LoadedMesh {
    pub fn validate(&self) -> Result<()> {
        validate_triangles(&self.name, &self.triangles, self.vertices.len())
    }
}

/// Options passed through to the loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Recenter on the origin and scale the largest extent to 1.
    pub normalize_vertex_positions: bool,
}

/// Mesh-loading collaborator.
pub trait MeshLoader {
    /// Whether `path` names something this loader can open.
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Parse `path` into an ordered list of sub-meshes.
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Vec<LoadedMesh>>;
}

/// Loader serving meshes registered in memory under a path key.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, Vec<LoadedMesh>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the sub-meshes returned for `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, meshes: Vec<LoadedMesh>) {
        self.files.insert(path.into(), meshes);
    }
}

impl MeshLoader for MemoryLoader {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Vec<LoadedMesh>> {
        let mut meshes = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::mesh_load(path, "no meshes registered for path"))?;
        if options.normalize_vertex_positions {
            normalize_positions(&mut meshes);
        }
        Ok(meshes)
    }
}

fn validate_triangles(name: &str, triangles: &[[u32; 3]], vertex_count: usize) -> Result<()> {
    let bad = triangles
        .iter()
        .flatten()
        .find(|&&i| i as usize >= vertex_count);

    match bad {
        Some(&index) => Err(Error::InvalidMeshIndex {
            mesh: name.to_string(),
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> LoadedMesh {
        let n = Vec3::Z;
        LoadedMesh {
            name: "quad".into(),
            vertices: vec![
                Vertex::new(Vec3::new(0.0, 0.0, 0.0), n, Vec2::new(0.0, 0.0)),
                Vertex::new(Vec3::new(2.0, 0.0, 0.0), n, Vec2::new(1.0, 0.0)),
                Vertex::new(Vec3::new(2.0, 2.0, 0.0), n, Vec2::new(1.0, 1.0)),
                Vertex::new(Vec3::new(0.0, 2.0, 0.0), n, Vec2::new(0.0, 1.0)),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
            material: LoadedMaterial::default(),
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let mut mesh = quad();
        assert!(mesh.validate().is_ok());

        mesh.triangles.push([0, 3, 4]);
        match mesh.validate() {
            Err(Error::InvalidMeshIndex { index, vertex_count, .. }) => {
                assert_eq!(index, 4);
                assert_eq!(vertex_count, 4);
            }
            other => panic!("expected InvalidMeshIndex, got {:?}", other),
        }
    }

    #[test]
    fn test_material_texture_handle() {
        let loaded = LoadedMaterial::default();
        assert_eq!(loaded.resolve(None).texture(), None);
        assert_eq!(loaded.resolve(Some(3)).texture(), Some(3));
        assert_eq!(loaded.resolve(Some(3)).texture, 3);
    }

    #[test]
    fn test_memory_loader() {
        let mut loader = MemoryLoader::new();
        loader.insert("quad.obj", vec![quad()]);

        assert!(loader.exists(Path::new("quad.obj")));
        assert!(!loader.exists(Path::new("missing.obj")));

        let meshes = loader
            .load(Path::new("quad.obj"), &LoadOptions::default())
            .unwrap();
        assert_eq!(meshes, vec![quad()]);

        let normalized = loader
            .load(
                Path::new("quad.obj"),
                &LoadOptions {
                    normalize_vertex_positions: true,
                },
            )
            .unwrap();
        assert_eq!(normalized[0].vertices[0].position(), Vec3::new(-0.5, -0.5, 0.0));
        assert_eq!(normalized[0].vertices[2].position(), Vec3::new(0.5, 0.5, 0.0));
    }
}
