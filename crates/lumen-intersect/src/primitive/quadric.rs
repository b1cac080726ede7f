//! Ray intersection with finite quadrics of revolution (cylinder, cone, frustum).
//!
//! The surface is described in a local frame with the base disc centered at
//! the origin and the axis along `+z`:
//!
//! ```text
//! x² + y² = (r0 + k z)²,   0 <= z <= h,   k = (r1 - r0) / h
//! ```
//!
//! A cylinder has `k = 0`; a cone has one radius equal to zero.

use log::debug;
use lumen_math::{Aabb3, Dir3, Point3, Tolerance, Vec3};

use super::{axis_frame, solve_quadratic, Intersect};
use crate::config::{EpsilonPolicy, IntersectConfig};
use crate::error::{IntersectError, Result};
use crate::frame::{azimuth, ShadingFrame};
use crate::hit::{
    HitRecord, MaterialId, PrimitiveKind, QuadricHit, QuadricRegion, SurfaceData, TextureId,
};
use crate::Ray;

/// A capped or open quadric of revolution between two discs.
///
/// Dimensions are validated at construction and read back through accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadric {
    base_center: Point3,
    axis: Dir3,
    ref_dir: Dir3,
    height: f64,
    bottom_radius: f64,
    top_radius: f64,
    capped: bool,
    /// Material key.
    pub material: MaterialId,
    /// Optional texture key.
    pub texture: Option<TextureId>,
    tolerance: Tolerance,
    policy: EpsilonPolicy,
}

impl Quadric {
    /// General frustum from the base center to the top center.
    ///
    /// Capped by default; radii must be non-negative with at least one
    /// of them positive.
    pub fn new(
        base: Point3,
        top: Point3,
        bottom_radius: f64,
        top_radius: f64,
        material: MaterialId,
        config: &IntersectConfig,
    ) -> Result<Self> {
        let tol = &config.tolerance;
        for r in [bottom_radius, top_radius] {
            if !r.is_finite() || r < 0.0 {
                return Err(IntersectError::InvalidRadius(r));
            }
        }
        if bottom_radius <= tol.linear && top_radius <= tol.linear {
            return Err(IntersectError::InvalidRadius(bottom_radius.max(top_radius)));
        }
        let span = top - base;
        let height = span.norm();
        if !height.is_finite() || height <= tol.linear {
            return Err(IntersectError::InvalidHeight(height));
        }
        let (axis, ref_dir) = axis_frame(&span, None, tol)?;
        debug!(
            "quadric base={base:?} h={height} r0={bottom_radius} r1={top_radius} {material}"
        );
        Ok(Self {
            base_center: base,
            axis,
            ref_dir,
            height,
            bottom_radius,
            top_radius,
            capped: true,
            material,
            texture: None,
            tolerance: *tol,
            policy: config.policy(),
        })
    }

    /// Cylinder of constant `radius` between two points.
    pub fn cylinder(
        base: Point3,
        top: Point3,
        radius: f64,
        material: MaterialId,
        config: &IntersectConfig,
    ) -> Result<Self> {
        Self::new(base, top, radius, radius, material, config)
    }

    /// Cone with a base disc of `radius` and its tip at `apex`.
    pub fn cone(
        base: Point3,
        apex: Point3,
        radius: f64,
        material: MaterialId,
        config: &IntersectConfig,
    ) -> Result<Self> {
        Self::new(base, apex, radius, 0.0, material, config)
    }

    /// Include or drop the end discs.
    pub fn with_caps(mut self, capped: bool) -> Self {
        self.capped = capped;
        self
    }

    /// Set the direction of `gama = 0`.
    ///
    /// Only the component perpendicular to the axis is used.
    pub fn with_reference(mut self, ref_dir: Vec3) -> Result<Self> {
        let (_, r) = axis_frame(self.axis.as_ref(), Some(&ref_dir), &self.tolerance)?;
        self.ref_dir = r;
        Ok(self)
    }

    /// Attach a texture.
    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Center of the bottom disc.
    pub fn base_center(&self) -> Point3 {
        self.base_center
    }

    /// Unit axis from the bottom disc toward the top disc.
    pub fn axis(&self) -> &Dir3 {
        &self.axis
    }

    /// Direction of `gama = 0`, perpendicular to `axis`.
    pub fn ref_dir(&self) -> &Dir3 {
        &self.ref_dir
    }

    /// Distance between the discs along the axis.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Radius at the base (`z = 0`).
    pub fn bottom_radius(&self) -> f64 {
        self.bottom_radius
    }

    /// Radius at the top (`z = height`).
    pub fn top_radius(&self) -> f64 {
        self.top_radius
    }

    /// Whether the end discs are part of the surface.
    pub fn is_capped(&self) -> bool {
        self.capped
    }

    /// Cylinder, cone or frustum.
    pub fn kind(&self) -> PrimitiveKind {
        let eps = self.tolerance.linear;
        if self.bottom_radius == self.top_radius {
            PrimitiveKind::Cylinder
        } else if self.bottom_radius <= eps || self.top_radius <= eps {
            PrimitiveKind::Cone
        } else {
            PrimitiveKind::Frustum
        }
    }

    /// Radius change per unit of height.
    fn slope(&self) -> f64 {
        (self.top_radius - self.bottom_radius) / self.height
    }

    fn radius_at(&self, z: f64) -> f64 {
        self.bottom_radius + self.slope() * z
    }

    /// Express a world vector in the local `(ref_dir, axis × ref_dir, axis)` frame.
    fn to_local(&self, v: &Vec3) -> Vec3 {
        let y_dir = self.axis.cross(self.ref_dir.as_ref());
        Vec3::new(
            v.dot(self.ref_dir.as_ref()),
            v.dot(&y_dir),
            v.dot(self.axis.as_ref()),
        )
    }

    /// Smallest accepted `t` on the lateral surface within `0 <= z <= h`.
    fn intersect_lateral(&self, o: &Vec3, d: &Vec3) -> Option<f64> {
        let k = self.slope();
        let rz0 = self.bottom_radius + k * o.z;

        let a = d.x * d.x + d.y * d.y - k * k * d.z * d.z;
        let b = 2.0 * (o.x * d.x + o.y * d.y - k * d.z * rz0);
        let c = o.x * o.x + o.y * o.y - rz0 * rz0;

        let in_bounds = |t: f64| {
            let z = o.z + t * d.z;
            self.policy.accepts(t) && (0.0..=self.height).contains(&z)
        };

        if self.policy.is_parallel(a) {
            // Ray parallel to a generator (cone) or to the axis (cylinder).
            if self.policy.is_parallel(b) {
                return None;
            }
            let t = -c / b;
            return in_bounds(t).then_some(t);
        }

        let (t1, t2) = solve_quadratic(a, b, c)?;
        [t1, t2].into_iter().find(|&t| in_bounds(t))
    }

    /// Accepted `t` on the disc at height `z` with radius `r`.
    fn intersect_cap(&self, o: &Vec3, d: &Vec3, z: f64, r: f64) -> Option<f64> {
        if r <= self.tolerance.linear || self.policy.is_parallel(d.z) {
            return None;
        }
        let t = (z - o.z) / d.z;
        if !self.policy.accepts(t) {
            return None;
        }
        let x = o.x + t * d.x;
        let y = o.y + t * d.y;
        (x * x + y * y <= r * r).then_some(t)
    }
}

impl Intersect for Quadric {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord> {
        let o = self.to_local(&(ray.origin() - self.base_center));
        let d = self.to_local(ray.direction().as_ref());

        let mut best: Option<(f64, QuadricRegion)> = None;
        let mut consider = |t: Option<f64>, region: QuadricRegion| {
            if let Some(t) = t {
                if best.map_or(true, |(bt, _)| t < bt) {
                    best = Some((t, region));
                }
            }
        };

        consider(self.intersect_lateral(&o, &d), QuadricRegion::Lateral);
        if self.capped {
            consider(
                self.intersect_cap(&o, &d, 0.0, self.bottom_radius),
                QuadricRegion::BottomCap,
            );
            consider(
                self.intersect_cap(&o, &d, self.height, self.top_radius),
                QuadricRegion::TopCap,
            );
        }

        let (t, region) = best?;
        let position = ray.at(t);
        let rel = position - self.base_center;
        let gama = azimuth(&rel, &self.axis, &self.ref_dir);

        let (height, radius, outward) = match region {
            QuadricRegion::Lateral => {
                let z = (o.z + t * d.z).clamp(0.0, self.height);
                let r = self.radius_at(z);
                let radial = rel - self.axis.as_ref() * rel.dot(self.axis.as_ref());
                // Gradient of x² + y² - (r0 + k z)², scaled by 1/2.
                let grad = radial - self.axis.as_ref() * (self.slope() * r);
                let outward = if grad.norm() > self.tolerance.linear {
                    Dir3::new_normalize(grad)
                } else if self.top_radius < self.bottom_radius {
                    // At the apex the surface has no tangent plane.
                    self.axis
                } else {
                    -self.axis
                };
                (z, r, outward)
            }
            QuadricRegion::BottomCap => (0.0, self.bottom_radius, -self.axis),
            QuadricRegion::TopCap => (self.height, self.top_radius, self.axis),
        };

        let (normal, face) = HitRecord::orient(ray, outward);
        let frame = ShadingFrame::from_azimuth(&normal, &self.axis, &self.ref_dir, gama);

        Some(HitRecord {
            t,
            position,
            normal,
            face,
            material: self.material,
            texture: self.texture,
            kind: self.kind(),
            primitive: None,
            frame,
            surface: SurfaceData::Quadric(QuadricHit {
                base_center: self.base_center,
                radius,
                gama,
                height,
                region,
            }),
        })
    }

    /// Union of the bounds of the two end discs (exact for the convex hull).
    fn bounds(&self) -> Aabb3 {
        let a = self.axis.as_ref();
        let spread = Vec3::new(
            (1.0 - a.x * a.x).max(0.0).sqrt(),
            (1.0 - a.y * a.y).max(0.0).sqrt(),
            (1.0 - a.z * a.z).max(0.0).sqrt(),
        );
        let top_center = self.base_center + a * self.height;
        let mut aabb = Aabb3::empty();
        for (c, r) in [
            (self.base_center, self.bottom_radius),
            (top_center, self.top_radius),
        ] {
            aabb.include_point(&(c - spread * r));
            aabb.include_point(&(c + spread * r));
        }
        aabb
    }
}
