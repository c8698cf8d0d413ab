//! Flat, upload-ready triangle array.

use crate::mesh::{Material, Mesh, Vertex};
use crate::util::{Mat3, Mat4, Result, Vec3};
use bytemuck::{Pod, Zeroable};
use std::ops::Range;

/// Self-contained triangle: three vertices and the material, all by value
/// (176 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Triangle {
    pub v0: Vertex,
    pub v1: Vertex,
    pub v2: Vertex,
    pub material: Material,
}

const _: () = assert!(std::mem::size_of::<Triangle>() == 176);
const _: () = assert!(std::mem::size_of::<Triangle>() % 16 == 0);

impl Triangle {
    #[inline]
    pub fn positions(&self) -> [Vec3; 3] {
        [self.v0.position(), self.v1.position(), self.v2.position()]
    }
}

/// Append-only triangle soup built from meshes.
///
/// Triangles are never edited or removed individually; the only way to drop
/// geometry is [`TriangleStore::clear`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleStore {
    triangles: Vec<Triangle>,
}

impl TriangleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every triangle of `mesh` in index order.
    ///
    /// Returns the range the new triangles occupy. Indices are validated
    /// before anything is pushed, so a bad mesh leaves the store untouched.
    pub fn append(&mut self, mesh: &Mesh) -> Result<Range<usize>> {
        self.append_transformed(mesh, &Mat4::IDENTITY)
    }

    /// Like [`append`](Self::append) but with positions moved by `transform`
    /// and normals by its cofactor matrix.
    pub fn append_transformed(&mut self, mesh: &Mesh, transform: &Mat4) -> Result<Range<usize>> {
        mesh.validate()?;

        let start = self.triangles.len();
        self.triangles.reserve(mesh.triangles.len());

        let vertex = vertex_transform(transform);
        for &[i, j, k] in &mesh.triangles {
            self.triangles.push(Triangle {
                v0: vertex(&mesh.vertices[i as usize]),
                v1: vertex(&mesh.vertices[j as usize]),
                v2: vertex(&mesh.vertices[k as usize]),
                material: mesh.material,
            });
        }

        Ok(start..self.triangles.len())
    }

    /// Remove all triangles.
    pub fn clear(&mut self) {
        self.triangles.clear();
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn as_slice(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Raw bytes in upload layout.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }
}

impl std::ops::Index<usize> for TriangleStore {
    type Output = Triangle;

    fn index(&self, index: usize) -> &Triangle {
        &self.triangles[index]
    }
}

/// Matrix taking normals through `transform`.
///
/// The cofactor matrix is `det * inverse().transpose()` but stays finite for
/// singular transforms, so geometry flattened onto a plane keeps the plane's
/// normal. Its sign is corrected for mirroring transforms.
fn normal_matrix(transform: &Mat4) -> Mat3 {
    let m = Mat3::from_mat4(*transform);
    let cofactor = Mat3::from_cols(
        m.y_axis.cross(m.z_axis),
        m.z_axis.cross(m.x_axis),
        m.x_axis.cross(m.y_axis),
    );
    if m.determinant() < 0.0 {
        cofactor * -1.0
    } else {
        cofactor
    }
}

/// Build the per-vertex transform for `transform`, skipping the math
/// entirely for the identity so stored vertices stay bit-identical.
fn vertex_transform(transform: &Mat4) -> impl Fn(&Vertex) -> Vertex {
    let transform = *transform;
    let identity = transform == Mat4::IDENTITY;
    let normal_mat = normal_matrix(&transform);

    move |v: &Vertex| {
        if identity {
            return *v;
        }
        let mut out = *v;
        out.position = transform.transform_point3(v.position()).to_array();
        out.normal = (normal_mat * v.normal())
            .normalize_or_zero()
            .to_array();
        out
    }
}
