//! Scene assembly: meshes, their transforms, the triangle store and the BVH.
//!
//! ```text
//! add_mesh ──► MeshLoader ──► meshes + transforms ──► TriangleStore (append)
//! rebuild_acceleration_structure ──► BvhBuilder ──► node array (replaced wholesale)
//! ```
//!
//! Adding geometry never rebuilds the BVH; callers batch their `add_mesh`
//! calls and rebuild once.

mod triangle_store;

pub use triangle_store::{Triangle, TriangleStore};

use crate::bvh::{Bvh, BvhBuilder, BvhNode};
use crate::gpu::GpuSceneData;
use crate::mesh::{LoadOptions, LoadedMesh, Mesh, MeshLoader, ObjLoader};
use crate::util::{Error, Mat4, Result};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Owner of all scene geometry and its acceleration structure.
pub struct Scene {
    loader: Box<dyn MeshLoader>,
    meshes: Vec<Mesh>,
    mesh_transforms: Vec<Mat4>,
    mesh_ranges: Vec<Range<usize>>,
    textures: Vec<PathBuf>,
    triangles: TriangleStore,
    bvh: Bvh,
    /// A transform changed since the store was last flattened
    transforms_dirty: bool,
    /// Geometry changed since the last rebuild
    bvh_stale: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("meshes", &self.meshes.len())
            .field("textures", &self.textures.len())
            .field("triangles", &self.triangles.len())
            .field("nodes", &self.bvh.len())
            .field("bvh_stale", &self.bvh_stale)
            .finish()
    }
}

impl Scene {
    /// Empty scene loading OBJ files from disk.
    pub fn new() -> Self {
        Self::with_loader(ObjLoader)
    }

    /// Empty scene using a custom mesh loader.
    pub fn with_loader(loader: impl MeshLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            meshes: Vec::new(),
            mesh_transforms: Vec::new(),
            mesh_ranges: Vec::new(),
            textures: Vec::new(),
            triangles: TriangleStore::new(),
            bvh: Bvh::default(),
            transforms_dirty: false,
            bvh_stale: false,
        }
    }

    /// Load every sub-mesh in `path` and fold its triangles into the store.
    ///
    /// Returns the indices assigned to the new meshes. Each mesh gets
    /// `transform`, baked into the triangles it contributes. Does not rebuild
    /// the BVH. On any error the scene is left exactly as it was.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display(), normalize = normalize))]
    pub fn add_mesh(
        &mut self,
        path: impl AsRef<Path>,
        transform: Mat4,
        normalize: bool,
    ) -> Result<Vec<usize>> {
        let path = path.as_ref();
        if !self.loader.exists(path) {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let options = LoadOptions {
            normalize_vertex_positions: normalize,
        };
        let sub_meshes = self.loader.load(path, &options)?;
        let indices = self.add_loaded_meshes(sub_meshes, transform)?;

        info!(
            "Loaded {}: {} meshes, {} triangles total",
            path.display(),
            indices.len(),
            self.triangles.len()
        );
        Ok(indices)
    }

    /// Ingest meshes that were loaded elsewhere.
    ///
    /// All meshes are validated before any of them is committed, so a bad
    /// sub-mesh rejects the whole batch.
    pub fn add_loaded_meshes(
        &mut self,
        meshes: Vec<LoadedMesh>,
        transform: Mat4,
    ) -> Result<Vec<usize>> {
        for mesh in &meshes {
            mesh.validate()?;
        }

        let mut indices = Vec::with_capacity(meshes.len());
        for loaded in meshes {
            let texture = loaded.material.texture.as_deref().map(|t| self.texture_handle(t));
            let mesh = Mesh {
                material: loaded.material.resolve(texture),
                name: loaded.name,
                vertices: loaded.vertices,
                triangles: loaded.triangles,
            };

            let range = self.triangles.append_transformed(&mesh, &transform)?;
            debug!("{}: triangles {:?}", mesh.name, range);

            indices.push(self.meshes.len());
            self.meshes.push(mesh);
            self.mesh_transforms.push(transform);
            self.mesh_ranges.push(range);
        }

        if !indices.is_empty() {
            self.bvh_stale = true;
        }
        Ok(indices)
    }

    /// Rebuild the BVH over the whole triangle store.
    ///
    /// Pending transform changes are re-flattened into a fresh store. The
    /// store and node array are replaced together, only after a successful
    /// build; on error the scene is left untouched.
    #[tracing::instrument(skip(self))]
    pub fn rebuild_acceleration_structure(&mut self, max_leaf_size: usize) -> Result<()> {
        let builder = BvhBuilder::new(max_leaf_size)?;

        // Re-flattened geometry is only committed together with its tree
        let reflattened = if self.transforms_dirty {
            Some(self.flatten()?)
        } else {
            None
        };
        let triangles = match &reflattened {
            Some((store, _)) => store.as_slice(),
            None => self.triangles.as_slice(),
        };

        let bvh = builder.build(triangles)?;
        info!(
            "BVH rebuilt: {} triangles, {} nodes",
            triangles.len(),
            bvh.len()
        );

        if let Some((store, ranges)) = reflattened {
            self.triangles = store;
            self.mesh_ranges = ranges;
            self.transforms_dirty = false;
        }
        self.bvh = bvh;
        self.bvh_stale = false;
        Ok(())
    }

    /// Change a mesh's model transform.
    ///
    /// Takes effect on the next [`rebuild_acceleration_structure`], which
    /// re-flattens the whole store.
    ///
    /// [`rebuild_acceleration_structure`]: Self::rebuild_acceleration_structure
    pub fn set_mesh_transform(&mut self, index: usize, transform: Mat4) -> Result<()> {
        let count = self.mesh_transforms.len();
        let slot = self
            .mesh_transforms
            .get_mut(index)
            .ok_or(Error::InvalidMeshHandle { index, count })?;

        if *slot != transform {
            *slot = transform;
            self.transforms_dirty = true;
            self.bvh_stale = true;
        }
        Ok(())
    }

    /// Drop all meshes, textures, triangles and the BVH.
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.mesh_transforms.clear();
        self.mesh_ranges.clear();
        self.textures.clear();
        self.triangles.clear();
        self.bvh = Bvh::default();
        self.transforms_dirty = false;
        self.bvh_stale = false;
    }

    /// Owned snapshot of both upload arrays.
    pub fn gpu_data(&self) -> GpuSceneData {
        GpuSceneData::new(self.triangles.as_slice(), &self.bvh)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn mesh(&self, index: usize) -> Option<&Mesh> {
        self.meshes.get(index)
    }

    pub fn mesh_transforms(&self) -> &[Mat4] {
        &self.mesh_transforms
    }

    /// Triangles contributed by a mesh, as of the last flattening.
    pub fn mesh_triangle_range(&self, index: usize) -> Option<Range<usize>> {
        self.mesh_ranges.get(index).cloned()
    }

    /// Texture paths, indexed by material texture handle.
    pub fn textures(&self) -> &[PathBuf] {
        &self.textures
    }

    pub fn triangles(&self) -> &TriangleStore {
        &self.triangles
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn nodes(&self) -> &[BvhNode] {
        self.bvh.nodes()
    }

    /// Geometry changed since the last rebuild.
    pub fn needs_rebuild(&self) -> bool {
        self.bvh_stale
    }

    /// Handle for a texture path, registering it on first use.
    fn texture_handle(&mut self, path: &Path) -> u32 {
        let idx = match self.textures.iter().position(|t| t == path) {
            Some(idx) => idx,
            None => {
                self.textures.push(path.to_path_buf());
                self.textures.len() - 1
            }
        };
        idx as u32
    }

    /// Flatten the retained meshes with their current transforms into a new
    /// store, leaving the scene untouched.
    fn flatten(&self) -> Result<(TriangleStore, Vec<Range<usize>>)> {
        let mut store = TriangleStore::new();
        let mut ranges = Vec::with_capacity(self.meshes.len());
        for (mesh, transform) in self.meshes.iter().zip(&self.mesh_transforms) {
            ranges.push(store.append_transformed(mesh, transform)?);
        }

        debug!("re-flattened {} meshes", self.meshes.len());
        Ok((store, ranges))
    }
}
