//! Ray representation and the ray-box slab test.

use lumen_math::{Aabb3, Dir3, Point3, Vec3};

use crate::error::{IntersectError, Result};

/// A ray in 3D space: `P(t) = origin + t * direction`, `t >= 0`.
///
/// The direction is normalized at construction, so `t` is always a world-space
/// distance regardless of which primitive is queried. The fields are read-only
/// because the slab test caches values derived from the direction; build a
/// new ray to change either one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: Point3,
    direction: Dir3,
    /// Precomputed reciprocal of direction components for fast AABB tests.
    inv_direction: Vec3,
    /// Sign of direction components (0 if positive, 1 if negative).
    sign: [usize; 3],
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized.
    ///
    /// # Panics
    ///
    /// Panics if `direction` is zero-length or not finite. Use
    /// [`Ray::try_new`] when the direction comes from untrusted data.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        match Self::try_new(origin, direction) {
            Ok(ray) => ray,
            Err(_) => panic!("ray direction must be finite and non-zero, got {direction:?}"),
        }
    }

    /// Create a new ray, rejecting a zero or non-finite direction.
    ///
    /// Any finite non-zero direction is accepted, however small or large its
    /// components are.
    pub fn try_new(origin: Point3, direction: Vec3) -> Result<Self> {
        if !direction.iter().all(|c| c.is_finite()) {
            return Err(IntersectError::ZeroDirection);
        }
        // Scale the largest component to 1 first so the norm cannot
        // underflow or overflow.
        let scale = direction.amax();
        if scale == 0.0 {
            return Err(IntersectError::ZeroDirection);
        }
        let dir = Dir3::new_normalize(direction / scale);
        let inv = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        let sign = [
            usize::from(inv.x < 0.0),
            usize::from(inv.y < 0.0),
            usize::from(inv.z < 0.0),
        ];
        Ok(Self {
            origin,
            direction: dir,
            inv_direction: inv,
            sign,
        })
    }

    /// Origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    /// Unit direction of the ray.
    #[inline]
    pub fn direction(&self) -> &Dir3 {
        &self.direction
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction.as_ref()
    }

    /// Test ray-AABB intersection using the slab method.
    ///
    /// Returns `Some((t_min, t_max))` if the ray intersects the box,
    /// where `t_min` and `t_max` are the entry and exit parameters
    /// (`t_min` clamped to 0 when the origin is inside).
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        let bounds = [aabb.min, aabb.max];

        let tx1 = (bounds[self.sign[0]].x - self.origin.x) * self.inv_direction.x;
        let tx2 = (bounds[1 - self.sign[0]].x - self.origin.x) * self.inv_direction.x;

        let mut t_min = tx1;
        let mut t_max = tx2;

        let ty1 = (bounds[self.sign[1]].y - self.origin.y) * self.inv_direction.y;
        let ty2 = (bounds[1 - self.sign[1]].y - self.origin.y) * self.inv_direction.y;

        // f64::max/min ignore a NaN operand, which appears when the origin
        // lies exactly on a slab plane of an axis the ray is parallel to.
        t_min = t_min.max(ty1);
        t_max = t_max.min(ty2);

        let tz1 = (bounds[self.sign[2]].z - self.origin.z) * self.inv_direction.z;
        let tz2 = (bounds[1 - self.sign[2]].z - self.origin.z) * self.inv_direction.z;

        t_min = t_min.max(tz1);
        t_max = t_max.min(tz2);

        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        let p = ray.at(5.0);
        assert!((p.x - 5.0).abs() < 1e-12);
        assert!(p.y.abs() < 1e-12);
        assert!(p.z.abs() < 1e-12);
    }

    #[test]
    fn test_direction_is_normalized() {
        let ray = Ray::new(Point3::origin(), Vec3::new(0.0, 3.0, 4.0));
        assert_relative_eq!(ray.direction().norm(), 1.0, epsilon = 1e-15);
        let p = ray.at(5.0);
        assert_relative_eq!(p.y, 3.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_direction_rejected() {
        assert!(matches!(
            Ray::try_new(Point3::origin(), Vec3::zeros()),
            Err(IntersectError::ZeroDirection)
        ));
        assert!(Ray::try_new(Point3::origin(), Vec3::new(f64::NAN, 1.0, 0.0)).is_err());
        assert!(Ray::try_new(Point3::origin(), Vec3::new(f64::INFINITY, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_extreme_directions_normalize() {
        let ray = Ray::new(Point3::origin(), Vec3::new(1e-200, 0.0, 0.0));
        assert_relative_eq!(*ray.direction().as_ref(), Vec3::x(), epsilon = 1e-15);

        let ray = Ray::new(Point3::origin(), Vec3::new(1e200, 1e200, 0.0));
        let diag = Vec3::new(1.0, 1.0, 0.0).normalize();
        assert_relative_eq!(*ray.direction().as_ref(), diag, epsilon = 1e-15);
        assert_relative_eq!(ray.at(2.0_f64.sqrt()).x, 1.0, epsilon = 1e-12);

        // Subnormal components still give a usable direction.
        let ray = Ray::try_new(Point3::origin(), Vec3::new(0.0, -1e-320, 0.0)).unwrap();
        assert_eq!(*ray.direction().as_ref(), -Vec3::y());
        let aabb = Aabb3::new(Point3::new(-1.0, -3.0, -1.0), Point3::new(1.0, -2.0, 1.0));
        let (t_min, _) = ray.intersect_aabb(&aabb).unwrap();
        assert_relative_eq!(t_min, 2.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "ray direction")]
    fn test_zero_direction_panics() {
        let _ = Ray::new(Point3::origin(), Vec3::zeros());
    }

    #[test]
    fn test_ray_aabb_hit() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let aabb = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let (t_min, t_max) = ray.intersect_aabb(&aabb).unwrap();
        assert!((t_min - 5.0).abs() < 1e-10);
        assert!((t_max - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_ray_aabb_miss() {
        let ray = Ray::new(Point3::new(-5.0, 5.0, 5.0), Vec3::new(1.0, 0.0, 0.0));
        let aabb = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(ray.intersect_aabb(&aabb).is_none());
    }

    #[test]
    fn test_ray_inside_aabb() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let aabb = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let (t_min, t_max) = ray.intersect_aabb(&aabb).unwrap();
        assert!(t_min >= 0.0);
        assert!((t_max - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_ray_aabb_behind() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        let aabb = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(ray.intersect_aabb(&aabb).is_none());
    }

    #[test]
    fn test_ray_aabb_flat_box() {
        // Zero-thickness box, as produced by an axis-aligned triangle.
        let ray = Ray::new(Point3::new(0.5, 0.5, -3.0), Vec3::new(0.0, 0.0, 1.0));
        let aabb = Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0));
        let (t_min, t_max) = ray.intersect_aabb(&aabb).unwrap();
        assert_relative_eq!(t_min, 3.0, epsilon = 1e-12);
        assert_relative_eq!(t_max, 3.0, epsilon = 1e-12);
    }
}
