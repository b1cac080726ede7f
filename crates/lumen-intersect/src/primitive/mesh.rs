//! Indexed triangle meshes.

use log::debug;
use lumen_math::{Aabb3, Point2, Point3, Vec3};

use super::triangle::{moller_trumbore, Corners, Shading};
use super::Intersect;
use crate::config::{EpsilonPolicy, IntersectConfig};
use crate::error::{IntersectError, Result};
use crate::hit::{HitRecord, MaterialId, PrimitiveKind, TextureId};
use crate::Ray;

/// Triangle mesh over a shared vertex buffer.
///
/// Faces are tested one after another; the smallest `t` wins and an exact
/// tie goes to the lower face index. Put large meshes behind a
/// [`Bvh`](crate::Bvh) by splitting them into [`Triangle`](super::Triangle)s
/// when per-face culling matters.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Point3>,
    indices: Vec<[usize; 3]>,
    normals: Option<Vec<Vec3>>,
    uvs: Option<Vec<Point2>>,
    /// Material key shared by all faces.
    pub material: MaterialId,
    /// Optional texture key.
    pub texture: Option<TextureId>,
    bounds: Aabb3,
    policy: EpsilonPolicy,
}

impl Mesh {
    /// Create a mesh from vertex positions and index triples.
    ///
    /// Degenerate faces are allowed; rays never hit them.
    pub fn new(
        vertices: Vec<Point3>,
        indices: Vec<[usize; 3]>,
        material: MaterialId,
        config: &IntersectConfig,
    ) -> Result<Self> {
        let len = vertices.len();
        if let Some(&index) = indices.iter().flatten().find(|&&i| i >= len) {
            return Err(IntersectError::MeshIndexOutOfBounds { index, len });
        }

        let mut bounds = Aabb3::from_points(&vertices);
        // Flat meshes give a zero-thickness box; pad it for the slab test.
        bounds.expand(config.tolerance.linear);

        debug!(
            "mesh with {} vertices, {} faces, {material}",
            len,
            indices.len()
        );
        Ok(Self {
            vertices,
            indices,
            normals: None,
            uvs: None,
            material,
            texture: None,
            bounds,
            policy: config.policy(),
        })
    }

    /// Attach one shading normal per vertex.
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Result<Self> {
        self.check_count("normals", normals.len())?;
        self.normals = Some(normals);
        Ok(self)
    }

    /// Attach one texture coordinate per vertex.
    pub fn with_uvs(mut self, uvs: Vec<Point2>) -> Result<Self> {
        self.check_count("uvs", uvs.len())?;
        self.uvs = Some(uvs);
        Ok(self)
    }

    /// Attach a texture.
    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    fn check_count(&self, what: &'static str, got: usize) -> Result<()> {
        let expected = self.vertices.len();
        if got != expected {
            return Err(IntersectError::AttributeCountMismatch {
                what,
                expected,
                got,
            });
        }
        Ok(())
    }

    /// Vertex positions.
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// Index triples, one per face.
    pub fn indices(&self) -> &[[usize; 3]] {
        &self.indices
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.indices.len()
    }

    fn corners(&self, face: usize) -> Corners<'_> {
        let [a, b, c] = self.indices[face];
        Corners {
            positions: [&self.vertices[a], &self.vertices[b], &self.vertices[c]],
            normals: self.normals.as_ref().map(|n| [&n[a], &n[b], &n[c]]),
            uvs: self.uvs.as_ref().map(|uv| [&uv[a], &uv[b], &uv[c]]),
        }
    }
}

impl Intersect for Mesh {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord> {
        ray.intersect_aabb(&self.bounds)?;

        let mut best: Option<(usize, f64, f64, f64)> = None;
        for (face, &[a, b, c]) in self.indices.iter().enumerate() {
            let v = [&self.vertices[a], &self.vertices[b], &self.vertices[c]];
            if let Some((t, w1, w2)) = moller_trumbore(ray, v, &self.policy) {
                if best.map_or(true, |(_, bt, _, _)| t < bt) {
                    best = Some((face, t, w1, w2));
                }
            }
        }

        let (face, t, w1, w2) = best?;
        self.corners(face).hit_record(
            ray,
            t,
            [1.0 - w1 - w2, w1, w2],
            Shading {
                material: self.material,
                texture: self.texture,
                kind: PrimitiveKind::Mesh,
                face: Some(face),
            },
        )
    }

    fn bounds(&self) -> Aabb3 {
        self.bounds
    }
}
