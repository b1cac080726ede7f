//! Ray-triangle intersection (Möller-Trumbore).
//!
//! The routines here are shared with [`Mesh`](super::Mesh), which stores its
//! corners in shared buffers instead of per triangle.

use lumen_math::{Aabb3, Dir3, Point2, Point3, Vec3};

use super::Intersect;
use crate::config::{EpsilonPolicy, IntersectConfig};
use crate::error::{IntersectError, Result};
use crate::frame::ShadingFrame;
use crate::hit::{HitRecord, MaterialId, PrimitiveKind, SurfaceData, TextureId, TriangleHit};
use crate::Ray;

/// Below this length an interpolated normal or UV tangent is unusable.
const DEGENERATE: f64 = 1e-12;

/// A single triangle with optional smooth-shading normals and texture coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Corner positions in counter-clockwise order (the outward side sees them CCW).
    pub vertices: [Point3; 3],
    /// Per-vertex shading normals.
    pub normals: Option<[Vec3; 3]>,
    /// Per-vertex texture coordinates.
    pub uvs: Option<[Point2; 3]>,
    /// Material key.
    pub material: MaterialId,
    /// Optional texture key.
    pub texture: Option<TextureId>,
    policy: EpsilonPolicy,
}

impl Triangle {
    /// Create a flat-shaded triangle.
    ///
    /// Fails with [`IntersectError::DegenerateTriangle`] when the corners are
    /// (nearly) collinear.
    pub fn new(
        v0: Point3,
        v1: Point3,
        v2: Point3,
        material: MaterialId,
        config: &IntersectConfig,
    ) -> Result<Self> {
        let area = (v1 - v0).cross(&(v2 - v0));
        if config.tolerance.is_degenerate(&area) {
            return Err(IntersectError::DegenerateTriangle);
        }
        Ok(Self {
            vertices: [v0, v1, v2],
            normals: None,
            uvs: None,
            material,
            texture: None,
            policy: config.policy(),
        })
    }

    /// Enable smooth shading with per-vertex normals.
    ///
    /// The normals need not be unit length; the interpolated normal is
    /// renormalized at every hit.
    pub fn with_normals(mut self, normals: [Vec3; 3]) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Attach per-vertex texture coordinates.
    pub fn with_uvs(mut self, uvs: [Point2; 3]) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Attach a texture.
    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Geometric normal, `(v1 - v0) × (v2 - v0)` normalized.
    pub fn normal(&self) -> Dir3 {
        let [v0, v1, v2] = &self.vertices;
        Dir3::new_normalize((v1 - v0).cross(&(v2 - v0)))
    }
}

impl Intersect for Triangle {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord> {
        let [v0, v1, v2] = &self.vertices;
        let (t, w1, w2) = moller_trumbore(ray, [v0, v1, v2], &self.policy)?;
        let corners = Corners {
            positions: [v0, v1, v2],
            normals: self.normals.as_ref().map(|[a, b, c]| [a, b, c]),
            uvs: self.uvs.as_ref().map(|[a, b, c]| [a, b, c]),
        };
        corners.hit_record(
            ray,
            t,
            [1.0 - w1 - w2, w1, w2],
            Shading {
                material: self.material,
                texture: self.texture,
                kind: PrimitiveKind::Triangle,
                face: None,
            },
        )
    }

    fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(&self.vertices)
    }
}

/// Möller-Trumbore test against the triangle `v`.
///
/// Returns `(t, w1, w2)` where `w1`, `w2` are the barycentric weights of
/// `v[1]` and `v[2]`. Edges are inclusive, so a ray through a shared mesh edge
/// hits both faces and the tie rule decides.
pub(super) fn moller_trumbore(
    ray: &Ray,
    v: [&Point3; 3],
    policy: &EpsilonPolicy,
) -> Option<(f64, f64, f64)> {
    let d = ray.direction().as_ref();
    let edge1 = v[1] - v[0];
    let edge2 = v[2] - v[0];

    let h = d.cross(&edge2);
    let a = edge1.dot(&h);
    if policy.is_parallel(a) {
        // Ray lies in (or parallel to) the triangle plane.
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin() - v[0];
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let w = f * d.dot(&q);
    if w < 0.0 || u + w > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    policy.accepts(t).then_some((t, u, w))
}

/// Borrowed corner attributes of one triangle.
pub(super) struct Corners<'a> {
    pub positions: [&'a Point3; 3],
    pub normals: Option<[&'a Vec3; 3]>,
    pub uvs: Option<[&'a Point2; 3]>,
}

/// Per-primitive data copied into the record.
pub(super) struct Shading {
    pub material: MaterialId,
    pub texture: Option<TextureId>,
    pub kind: PrimitiveKind,
    pub face: Option<usize>,
}

impl Corners<'_> {
    /// Build the record for a hit at `t` with barycentric weights `w`.
    ///
    /// Returns `None` only for a zero-area triangle, which has no normal.
    pub(super) fn hit_record(
        &self,
        ray: &Ray,
        t: f64,
        w: [f64; 3],
        shading: Shading,
    ) -> Option<HitRecord> {
        let [p0, p1, p2] = self.positions;
        let edge1 = p1 - p0;
        let edge2 = p2 - p0;
        let geometric = Dir3::try_new(edge1.cross(&edge2), DEGENERATE)?;
        let (geometric, face) = HitRecord::orient(ray, geometric);

        let normal = match self.normals {
            Some([n0, n1, n2]) => {
                let n = n0 * w[0] + n1 * w[1] + n2 * w[2];
                match Dir3::try_new(n, DEGENERATE) {
                    // Keep the shading normal on the same side as the ray.
                    Some(n) if n.dot(geometric.as_ref()) < 0.0 => -n,
                    Some(n) => n,
                    None => geometric,
                }
            }
            None => geometric,
        };

        let (uv, tangent) = match self.uvs {
            Some([uv0, uv1, uv2]) => {
                let uv = Point2::from(uv0.coords * w[0] + uv1.coords * w[1] + uv2.coords * w[2]);
                (uv, uv_tangent(&edge1, &edge2, [uv0, uv1, uv2]))
            }
            None => (Point2::new(w[1], w[2]), edge1),
        };

        Some(HitRecord {
            t,
            position: ray.at(t),
            normal,
            face,
            material: shading.material,
            texture: shading.texture,
            kind: shading.kind,
            primitive: None,
            frame: ShadingFrame::from_normal_and_tangent(&normal, &tangent),
            surface: SurfaceData::Triangle(TriangleHit {
                barycentric: w,
                uv,
                face: shading.face,
            }),
        })
    }
}

/// Direction of increasing `u` on the triangle, `dP/du`.
///
/// Falls back to the first edge when the UV mapping is degenerate.
fn uv_tangent(edge1: &Vec3, edge2: &Vec3, uv: [&Point2; 3]) -> Vec3 {
    let du1 = uv[1] - uv[0];
    let du2 = uv[2] - uv[0];
    let det = du1.x * du2.y - du2.x * du1.y;
    if det.abs() < DEGENERATE {
        return *edge1;
    }
    (edge1 * du2.y - edge2 * du1.y) / det
}
