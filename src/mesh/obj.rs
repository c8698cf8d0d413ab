//! Wavefront OBJ loader backed by `tobj`.
//!
//! Each OBJ model (object, group or material switch) becomes one
//! [`LoadedMesh`]. Faces are triangulated and a single index buffer is used
//! for positions, normals and texcoords.

use super::{generate_normals, normalize_positions, LoadOptions, LoadedMaterial, LoadedMesh, MeshLoader, Vertex};
use crate::util::{Error, Result, Vec2, Vec3};
use std::path::Path;
use tracing::{debug, warn};

/// Loads `.obj` files (and their `.mtl` libraries) from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjLoader;

impl MeshLoader for ObjLoader {
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Vec<LoadedMesh>> {
        let load_options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };

        let (models, materials) =
            tobj::load_obj(path, &load_options).map_err(|e| Error::mesh_load(path, e.to_string()))?;

        let materials = materials.unwrap_or_else(|e| {
            warn!("{}: material library unavailable ({}), using defaults", path.display(), e);
            Vec::new()
        });

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut meshes = Vec::with_capacity(models.len());

        for model in models {
            let mesh = model.mesh;
            if mesh.indices.len() % 3 != 0 {
                return Err(Error::mesh_load(
                    path,
                    format!("model '{}' has {} indices, not a triangle list", model.name, mesh.indices.len()),
                ));
            }

            let positions: Vec<Vec3> = mesh
                .positions
                .chunks_exact(3)
                .map(|p| Vec3::new(p[0], p[1], p[2]))
                .collect();
            let triangles: Vec<[u32; 3]> = mesh
                .indices
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .collect();

            let normals: Vec<Vec3> = if mesh.normals.len() == mesh.positions.len() {
                mesh.normals
                    .chunks_exact(3)
                    .map(|n| Vec3::new(n[0], n[1], n[2]))
                    .collect()
            } else {
                debug!("{}: generating normals", model.name);
                generate_normals(&positions, &triangles)
            };

            let has_uvs = mesh.texcoords.len() / 2 == positions.len();
            let vertices = positions
                .iter()
                .enumerate()
                .map(|(i, &p)| {
                    let uv = if has_uvs {
                        Vec2::new(mesh.texcoords[2 * i], mesh.texcoords[2 * i + 1])
                    } else {
                        Vec2::ZERO
                    };
                    Vertex::new(p, normals[i], uv)
                })
                .collect();

            let material = mesh
                .material_id
                .and_then(|id| materials.get(id))
                .map(|m| convert_material(m, base_dir))
                .unwrap_or_default();

            debug!(
                "{}: {} vertices, {} triangles",
                model.name,
                positions.len(),
                triangles.len()
            );

            meshes.push(LoadedMesh {
                name: model.name,
                vertices,
                triangles,
                material,
            });
        }

        if options.normalize_vertex_positions {
            normalize_positions(&mut meshes);
        }

        Ok(meshes)
    }
}

/// Map an MTL material onto the fields the tracer consumes.
fn convert_material(m: &tobj::Material, base_dir: &Path) -> LoadedMaterial {
    let defaults = LoadedMaterial::default();
    LoadedMaterial {
        diffuse: m.diffuse.map(Vec3::from).unwrap_or(defaults.diffuse),
        shininess: m.shininess.unwrap_or(defaults.shininess),
        // `d` is opacity, the tracer wants transparency
        transparency: m.dissolve.map(|d| 1.0 - d).unwrap_or(defaults.transparency),
        ior: m.optical_density.unwrap_or(defaults.ior),
        texture: m
            .diffuse_texture
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|t| base_dir.join(t)),
    }
}
