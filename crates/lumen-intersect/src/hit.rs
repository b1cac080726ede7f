//! Intersection records handed to the shading stage.
//!
//! A [`HitRecord`] carries the data every primitive produces (position,
//! oriented normal, material, shading frame) plus a [`SurfaceData`] payload
//! that only exists for the primitive type that was hit. A miss is `None`
//! at the call site; there is no "empty" record.

use std::fmt;

use lumen_math::{Dir3, Point2, Point3, Vec3};
use serde::{Deserialize, Serialize};

use crate::frame::ShadingFrame;
use crate::Ray;

/// Key into the external material table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// Key selecting a texture map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureId(pub u32);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture#{}", self.0)
    }
}

/// The kind of primitive (for match-based dispatch and diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Sphere.
    Sphere,
    /// Cylinder (equal radii).
    Cylinder,
    /// Cone (one radius zero).
    Cone,
    /// Truncated cone (two different non-zero radii).
    Frustum,
    /// Single triangle.
    Triangle,
    /// Indexed triangle mesh.
    Mesh,
}

/// Which side of the surface the ray arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceSide {
    /// The outward geometric normal faced the ray origin.
    Front,
    /// The ray hit the inside; the reported normal was flipped.
    Back,
}

/// Region of a quadric that was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadricRegion {
    /// Curved side surface.
    Lateral,
    /// Disc at height 0.
    BottomCap,
    /// Disc at full height.
    TopCap,
}

/// Sphere-specific hit data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereHit {
    /// Sphere center.
    pub center: Point3,
    /// Sphere radius.
    pub radius: f64,
    /// Azimuth in `[0, 2π)`.
    pub gama: f64,
    /// Elevation in `[-π/2, π/2]`.
    pub beta: f64,
}

/// Cylinder/cone hit data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadricHit {
    /// Center of the bottom disc (on the axis).
    pub base_center: Point3,
    /// Radius of the surface at the hit height.
    pub radius: f64,
    /// Azimuth in `[0, 2π)` around the axis.
    pub gama: f64,
    /// Distance along the axis from the base, in `[0, height]`.
    pub height: f64,
    /// Lateral surface or one of the caps.
    pub region: QuadricRegion,
}

/// Triangle hit data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Barycentric weights `(w0, w1, w2)` of the three vertices; they sum to 1.
    pub barycentric: [f64; 3],
    /// Interpolated texture coordinates, or `(w1, w2)` when the triangle has none.
    pub uv: Point2,
    /// Face index inside a mesh, `None` for a free-standing triangle.
    pub face: Option<usize>,
}

/// Primitive-specific part of a hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceData {
    /// Hit on a sphere.
    Sphere(SphereHit),
    /// Hit on a cylinder, cone or frustum.
    Quadric(QuadricHit),
    /// Hit on a triangle or mesh face.
    Triangle(TriangleHit),
}

/// Result of a successful ray-primitive intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Parameter along the ray; always greater than the configured epsilon.
    pub t: f64,
    /// World-space intersection point.
    pub position: Point3,
    /// Unit normal, oriented toward the side the ray came from.
    pub normal: Dir3,
    /// Whether the ray struck the outside or the inside.
    pub face: FaceSide,
    /// Material of the primitive.
    pub material: MaterialId,
    /// Texture of the primitive, if any.
    pub texture: Option<TextureId>,
    /// Type of the primitive that was hit.
    pub kind: PrimitiveKind,
    /// Index of the primitive in the queried collection (set by the scene intersector).
    pub primitive: Option<usize>,
    /// Local shading frame; `frame.normal == normal`.
    pub frame: ShadingFrame,
    /// Primitive-specific data.
    pub surface: SurfaceData,
}

impl HitRecord {
    /// Orient an outward normal against the ray.
    ///
    /// Returns the normal to report and which face was hit.
    pub fn orient(ray: &Ray, outward: Dir3) -> (Dir3, FaceSide) {
        if ray.direction().dot(outward.as_ref()) <= 0.0 {
            (outward, FaceSide::Front)
        } else {
            (-outward, FaceSide::Back)
        }
    }

    /// Texture coordinates for the hit.
    ///
    /// `(gama, beta)` for spheres, `(gama, height)` for quadrics and the
    /// interpolated UV for triangles.
    pub fn texture_coords(&self) -> Point2 {
        match &self.surface {
            SurfaceData::Sphere(s) => Point2::new(s.gama, s.beta),
            SurfaceData::Quadric(q) => Point2::new(q.gama, q.height),
            SurfaceData::Triangle(tri) => tri.uv,
        }
    }

    /// Center of a sphere, or the base center of a quadric.
    pub fn center(&self) -> Option<Point3> {
        match &self.surface {
            SurfaceData::Sphere(s) => Some(s.center),
            SurfaceData::Quadric(q) => Some(q.base_center),
            SurfaceData::Triangle(_) => None,
        }
    }

    /// Radius at the hit point for curved primitives.
    pub fn radius(&self) -> Option<f64> {
        match &self.surface {
            SurfaceData::Sphere(s) => Some(s.radius),
            SurfaceData::Quadric(q) => Some(q.radius),
            SurfaceData::Triangle(_) => None,
        }
    }

    /// Secondary ray starting at this hit.
    ///
    /// The origin is the hit position itself; the epsilon policy keeps the
    /// ray from re-hitting the same surface at `t ≈ 0`.
    pub fn spawn_ray(&self, direction: Vec3) -> Ray {
        Ray::new(self.position, direction)
    }

    /// Mirror reflection of the incoming direction about the normal.
    pub fn reflect(&self, incoming: &Vec3) -> Vec3 {
        let n = self.normal.as_ref();
        incoming - 2.0 * incoming.dot(n) * n
    }
}
