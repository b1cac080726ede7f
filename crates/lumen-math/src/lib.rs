#![warn(missing_docs)]

//! Math types for the lumen intersection core.
//!
//! Thin wrappers around nalgebra providing the value types every primitive
//! works with: points, vectors, unit directions, axis-aligned boxes and the
//! tolerance constants used to reject degenerate geometry.

use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D texture/parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// Pick a unit vector perpendicular to `n`.
///
/// The reference axis is `+X` unless `n` is within ~25° of it, in which case
/// `+Y` is used, so the cross product never degenerates. The result is a
/// pure function of `n`.
pub fn perpendicular(n: &Dir3) -> Dir3 {
    let reference = if n.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    Dir3::new_normalize(reference.cross(n.as_ref()))
}

/// Component `axis` (0 = x, 1 = y, 2 = z) of a point.
#[inline]
pub fn component(p: &Point3, axis: usize) -> f64 {
    match axis {
        0 => p.x,
        1 => p.y,
        _ => p.z,
    }
}

/// Tolerance constants for geometric validity checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tolerance {
    /// Linear distance tolerance (scene units).
    pub linear: f64,
}

impl Tolerance {
    /// Default tolerance (1e-9 scene units).
    pub const DEFAULT: Self = Self { linear: 1e-9 };

    /// Check if a vector is too short to define a direction.
    pub fn is_degenerate(&self, v: &Vec3) -> bool {
        let len = v.norm();
        !len.is_finite() || len < self.linear
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Smallest box containing all `points`.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include_point(p);
        }
        aabb
    }

    /// True if nothing has been included yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expand this AABB to include another box.
    pub fn include_aabb(&mut self, other: &Aabb3) {
        if other.is_empty() {
            return;
        }
        self.include_point(&other.min);
        self.include_point(&other.max);
    }

    /// Expand the AABB by a tolerance in all directions.
    pub fn expand(&mut self, tol: f64) {
        self.min.x -= tol;
        self.min.y -= tol;
        self.min.z -= tol;
        self.max.x += tol;
        self.max.y += tol;
        self.max.z += tol;
    }

    /// Center of the box.
    pub fn centroid(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Edge lengths along x, y, z.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Surface area, used by the SAH cost model.
    pub fn surface_area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}
