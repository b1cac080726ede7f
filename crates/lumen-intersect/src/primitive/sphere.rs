//! Ray-sphere intersection (quadratic equation).

use log::debug;
use lumen_math::{Aabb3, Dir3, Point3, Vec3};

use super::{axis_frame, solve_quadratic, Intersect};
use crate::config::{EpsilonPolicy, IntersectConfig};
use crate::error::{IntersectError, Result};
use crate::frame::{spherical_coords, ShadingFrame};
use crate::hit::{HitRecord, MaterialId, PrimitiveKind, SphereHit, SurfaceData, TextureId};
use crate::Ray;

/// A sphere with an orientation frame for angular texture coordinates.
///
/// `gama` is measured around `axis` starting at `ref_dir`, `beta` is the
/// elevation above the plane perpendicular to `axis`. The geometry is fixed
/// at construction, where it is validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    center: Point3,
    radius: f64,
    axis: Dir3,
    ref_dir: Dir3,
    /// Material key.
    pub material: MaterialId,
    /// Optional texture key.
    pub texture: Option<TextureId>,
    policy: EpsilonPolicy,
}

impl Sphere {
    /// Create a sphere with the default orientation (`+Z` axis, `+X` reference).
    pub fn new(
        center: Point3,
        radius: f64,
        material: MaterialId,
        config: &IntersectConfig,
    ) -> Result<Self> {
        Self::oriented(center, radius, Vec3::z(), Vec3::x(), material, config)
    }

    /// Create a sphere with an explicit polar axis and reference direction.
    ///
    /// `ref_dir` does not need to be perpendicular to `axis`; only its
    /// component perpendicular to the axis is used.
    pub fn oriented(
        center: Point3,
        radius: f64,
        axis: Vec3,
        ref_dir: Vec3,
        material: MaterialId,
        config: &IntersectConfig,
    ) -> Result<Self> {
        if !radius.is_finite() || radius <= config.tolerance.linear {
            return Err(IntersectError::InvalidRadius(radius));
        }
        let (axis, ref_dir) = axis_frame(&axis, Some(&ref_dir), &config.tolerance)?;
        debug!("sphere at {center:?} r={radius} {material}");
        Ok(Self {
            center,
            radius,
            axis,
            ref_dir,
            material,
            texture: None,
            policy: config.policy(),
        })
    }

    /// Attach a texture.
    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Center point in world coordinates.
    pub fn center(&self) -> Point3 {
        self.center
    }

    /// Radius (positive).
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Polar axis (`beta = π/2` direction).
    pub fn axis(&self) -> &Dir3 {
        &self.axis
    }

    /// Direction of `gama = 0`, perpendicular to `axis`.
    pub fn ref_dir(&self) -> &Dir3 {
        &self.ref_dir
    }
}

impl Intersect for Sphere {
    /// Solves `|O + tD − C|² = R²`; `D` is unit length so the leading
    /// coefficient is 1. The smaller accepted root wins.
    fn intersect(&self, ray: &Ray) -> Option<HitRecord> {
        let oc = ray.origin() - self.center;
        let d = ray.direction().as_ref();

        let b = 2.0 * oc.dot(d);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let (t1, t2) = solve_quadratic(1.0, b, c)?;
        let t = if self.policy.accepts(t1) {
            t1
        } else if self.policy.accepts(t2) {
            t2
        } else {
            return None;
        };

        let position = ray.at(t);
        let outward = Dir3::new_normalize(position - self.center);
        let (gama, beta) = spherical_coords(&outward, &self.axis, &self.ref_dir);
        let (normal, face) = HitRecord::orient(ray, outward);
        let frame = ShadingFrame::from_azimuth(&normal, &self.axis, &self.ref_dir, gama);

        Some(HitRecord {
            t,
            position,
            normal,
            face,
            material: self.material,
            texture: self.texture,
            kind: PrimitiveKind::Sphere,
            primitive: None,
            frame,
            surface: SurfaceData::Sphere(SphereHit {
                center: self.center,
                radius: self.radius,
                gama,
                beta,
            }),
        })
    }

    fn bounds(&self) -> Aabb3 {
        let r = Vec3::repeat(self.radius);
        Aabb3::new(self.center - r, self.center + r)
    }
}
