//! Ray-primitive intersection algorithms.
//!
//! Each primitive type has a dedicated closed-form intersector. They all
//! apply the same [`EpsilonPolicy`](crate::config::EpsilonPolicy): only hits
//! with `t > epsilon` are reported, and the smallest such `t` wins.

mod mesh;
mod quadric;
mod sphere;
mod triangle;

pub use mesh::Mesh;
pub use quadric::Quadric;
pub use sphere::Sphere;
pub use triangle::Triangle;

use std::fmt::Debug;

use lumen_math::{perpendicular, Aabb3, Dir3, Tolerance, Vec3};

use crate::error::{IntersectError, Result};
use crate::hit::{HitRecord, MaterialId, PrimitiveKind};
use crate::Ray;

/// Anything a ray can be intersected with.
///
/// Implementations must be pure: the same ray and primitive state always
/// produce bit-identical results, which makes them safe to query from many
/// threads at once.
pub trait Intersect: Send + Sync + Debug {
    /// Closest valid hit of `ray` with this primitive, or `None`.
    fn intersect(&self, ray: &Ray) -> Option<HitRecord>;

    /// World-space bounds, used by the BVH.
    fn bounds(&self) -> Aabb3;
}

/// The built-in primitive set.
#[derive(Debug, Clone)]
pub enum Primitive {
    /// Sphere.
    Sphere(Sphere),
    /// Cylinder, cone or frustum.
    Quadric(Quadric),
    /// Single triangle.
    Triangle(Triangle),
    /// Indexed triangle mesh.
    Mesh(Mesh),
}

impl Primitive {
    /// The kind of this primitive.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Sphere(_) => PrimitiveKind::Sphere,
            Primitive::Quadric(q) => q.kind(),
            Primitive::Triangle(_) => PrimitiveKind::Triangle,
            Primitive::Mesh(_) => PrimitiveKind::Mesh,
        }
    }

    /// Material assigned to this primitive.
    pub fn material(&self) -> MaterialId {
        match self {
            Primitive::Sphere(s) => s.material,
            Primitive::Quadric(q) => q.material,
            Primitive::Triangle(t) => t.material,
            Primitive::Mesh(m) => m.material,
        }
    }
}

impl Intersect for Primitive {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord> {
        match self {
            Primitive::Sphere(s) => s.intersect(ray),
            Primitive::Quadric(q) => q.intersect(ray),
            Primitive::Triangle(t) => t.intersect(ray),
            Primitive::Mesh(m) => m.intersect(ray),
        }
    }

    fn bounds(&self) -> Aabb3 {
        match self {
            Primitive::Sphere(s) => s.bounds(),
            Primitive::Quadric(q) => q.bounds(),
            Primitive::Triangle(t) => t.bounds(),
            Primitive::Mesh(m) => m.bounds(),
        }
    }
}

impl<T: Intersect + ?Sized> Intersect for Box<T> {
    fn intersect(&self, ray: &Ray) -> Option<HitRecord> {
        (**self).intersect(ray)
    }

    fn bounds(&self) -> Aabb3 {
        (**self).bounds()
    }
}

impl From<Sphere> for Primitive {
    fn from(s: Sphere) -> Self {
        Primitive::Sphere(s)
    }
}

impl From<Quadric> for Primitive {
    fn from(q: Quadric) -> Self {
        Primitive::Quadric(q)
    }
}

impl From<Triangle> for Primitive {
    fn from(t: Triangle) -> Self {
        Primitive::Triangle(t)
    }
}

impl From<Mesh> for Primitive {
    fn from(m: Mesh) -> Self {
        Primitive::Mesh(m)
    }
}

/// Normalized `(axis, ref_dir)` pair for primitives with a rotational frame.
///
/// `ref_hint` is made perpendicular to the axis; without a hint a
/// perpendicular direction is chosen with the fixed reference-axis rule.
pub(crate) fn axis_frame(
    axis: &Vec3,
    ref_hint: Option<&Vec3>,
    tolerance: &Tolerance,
) -> Result<(Dir3, Dir3)> {
    if tolerance.is_degenerate(axis) {
        return Err(IntersectError::DegenerateAxis);
    }
    let axis = Dir3::new_normalize(*axis);
    let ref_dir = match ref_hint {
        Some(hint) => {
            let projected = hint - axis.as_ref() * axis.dot(hint);
            if tolerance.is_degenerate(&projected) {
                return Err(IntersectError::DegenerateAxis);
            }
            Dir3::new_normalize(projected)
        }
        None => perpendicular(&axis),
    };
    Ok((axis, ref_dir))
}

/// Real roots of `a t² + b t + c = 0` in ascending order.
///
/// Uses the numerically stable form that avoids cancellation between `-b`
/// and the square root. Callers handle `a ≈ 0` themselves.
pub(crate) fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 || a == 0.0 {
        return None;
    }
    let sqrt_disc = discriminant.sqrt();
    let q = if b < 0.0 {
        -0.5 * (b - sqrt_disc)
    } else {
        -0.5 * (b + sqrt_disc)
    };
    let (t1, t2) = if q == 0.0 {
        // b == 0 and c == 0: double root at zero.
        (0.0, 0.0)
    } else {
        (q / a, c / q)
    };
    if t1 <= t2 {
        Some((t1, t2))
    } else {
        Some((t2, t1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntersectConfig;
    use approx::assert_relative_eq;
    use lumen_math::{Point3, Vec3};

    #[test]
    fn test_solve_quadratic() {
        // (t - 1)(t - 3) = t² - 4t + 3
        let (t1, t2) = solve_quadratic(1.0, -4.0, 3.0).unwrap();
        assert_relative_eq!(t1, 1.0);
        assert_relative_eq!(t2, 3.0);

        // Negative leading coefficient keeps ascending order.
        let (t1, t2) = solve_quadratic(-1.0, 4.0, -3.0).unwrap();
        assert_relative_eq!(t1, 1.0);
        assert_relative_eq!(t2, 3.0);

        assert!(solve_quadratic(1.0, 0.0, 1.0).is_none());
        assert_eq!(solve_quadratic(1.0, 0.0, 0.0), Some((0.0, 0.0)));
    }

    #[test]
    fn test_solve_quadratic_cancellation() {
        // Roots 1e-8 and 1e8: the naive formula loses the small root.
        let (t1, t2) = solve_quadratic(1.0, -(1e8 + 1e-8), 1.0).unwrap();
        assert_relative_eq!(t1, 1e-8, max_relative = 1e-9);
        assert_relative_eq!(t2, 1e8, max_relative = 1e-9);
    }

    #[test]
    fn test_axis_frame() {
        let tol = Tolerance::DEFAULT;
        let (axis, ref_dir) =
            axis_frame(&Vec3::new(0.0, 0.0, 2.0), Some(&Vec3::new(1.0, 0.0, 1.0)), &tol).unwrap();
        assert_relative_eq!(*axis.as_ref(), Vec3::z());
        assert_relative_eq!(*ref_dir.as_ref(), Vec3::x(), epsilon = 1e-12);

        let (axis, ref_dir) = axis_frame(&Vec3::x(), None, &tol).unwrap();
        assert!(axis.dot(ref_dir.as_ref()).abs() < 1e-12);

        assert!(matches!(
            axis_frame(&Vec3::zeros(), None, &tol),
            Err(IntersectError::DegenerateAxis)
        ));
        assert!(matches!(
            axis_frame(&Vec3::z(), Some(&Vec3::new(0.0, 0.0, -3.0)), &tol),
            Err(IntersectError::DegenerateAxis)
        ));
    }

    #[test]
    fn test_enum_dispatch() {
        let config = IntersectConfig::default();
        let prim: Primitive = Sphere::new(Point3::origin(), 1.0, MaterialId(5), &config)
            .unwrap()
            .into();
        assert_eq!(prim.kind(), PrimitiveKind::Sphere);
        assert_eq!(prim.material(), MaterialId(5));
        let ray = Ray::new(Point3::new(0.0, 0.0, -10.0), Vec3::z());
        let hit = prim.intersect(&ray).unwrap();
        assert_eq!(hit.kind, PrimitiveKind::Sphere);
        assert_relative_eq!(hit.t, 9.0, epsilon = 1e-12);

        let boxed: Box<dyn Intersect> = Box::new(prim.clone());
        assert_eq!(boxed.intersect(&ray), prim.intersect(&ray));
        assert_eq!(boxed.bounds(), prim.bounds());
    }
}
