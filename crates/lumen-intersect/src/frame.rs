//! Local shading frames and angular texture coordinates.
//!
//! Every primitive builds its frame through this module so that tangent
//! directions follow one convention across all surface types:
//!
//! - curved surfaces use the azimuthal tangent `dP/dgama`, which varies
//!   continuously over the surface (no seams in bump-mapped renders);
//! - flat surfaces use a supplied edge or texture direction;
//! - anything degenerate falls back to [`ShadingFrame::from_normal`].
//!
//! Angular convention: `gama` is the azimuth in `[0, 2π)`, measured from the
//! reference direction toward `axis × ref_dir`; `beta` is the elevation above
//! the equatorial plane in `[-π/2, π/2]`. The branch cut is the half-plane
//! `gama = 0`. On the axis itself `gama` is defined as 0.

use std::f64::consts::TAU;

use lumen_math::{perpendicular, Dir3, Vec3};

/// A projected tangent hint shorter than this fraction of the original hint
/// is considered parallel to the normal.
const DEGENERATE_HINT: f64 = 1e-6;

/// Below this distance from the axis the azimuth is defined as 0.
const ON_AXIS: f64 = 1e-12;

/// Orthonormal right-handed frame `(x_s, y_s, z_s)` at a hit point.
///
/// `normal` (`z_s`) always equals the hit record's oriented normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingFrame {
    /// `x_s`: tangent direction.
    pub tangent: Dir3,
    /// `y_s`: `normal × tangent`.
    pub bitangent: Dir3,
    /// `z_s`: surface normal.
    pub normal: Dir3,
}

impl ShadingFrame {
    /// Frame from a normal alone, using a fixed world reference axis.
    ///
    /// The reference is `+X`, switched to `+Y` when the normal is close to
    /// `±X`, so axis-aligned normals never produce a zero cross product.
    pub fn from_normal(normal: &Dir3) -> Self {
        let tangent = perpendicular(normal);
        Self::complete(normal, tangent.as_ref())
    }

    /// Frame whose tangent is `hint` made orthogonal to `normal`.
    ///
    /// Falls back to [`ShadingFrame::from_normal`] if the hint is (nearly)
    /// parallel to the normal or not finite.
    pub fn from_normal_and_tangent(normal: &Dir3, hint: &Vec3) -> Self {
        let n = normal.as_ref();
        let projected = hint - n * n.dot(hint);
        let len = projected.norm();
        if !len.is_finite() || len <= DEGENERATE_HINT * hint.norm() {
            return Self::from_normal(normal);
        }
        Self::complete(normal, &projected)
    }

    /// Frame for a surface of revolution at azimuth `gama`.
    ///
    /// The tangent is the direction of increasing `gama`:
    /// `-sin(gama) * ref_dir + cos(gama) * (axis × ref_dir)`.
    pub fn from_azimuth(normal: &Dir3, axis: &Dir3, ref_dir: &Dir3, gama: f64) -> Self {
        let (s, c) = gama.sin_cos();
        let y_dir = axis.cross(ref_dir.as_ref());
        let hint = -s * ref_dir.as_ref() + c * y_dir;
        Self::from_normal_and_tangent(normal, &hint)
    }

    /// Finish the frame from a tangent direction roughly orthogonal to `normal`.
    ///
    /// The tangent is rebuilt from the bitangent, so both are orthogonal to
    /// the normal to rounding error even when `tangent` was not.
    fn complete(normal: &Dir3, tangent: &Vec3) -> Self {
        let bitangent = Dir3::new_normalize(normal.cross(tangent));
        let tangent = Dir3::new_normalize(bitangent.cross(normal.as_ref()));
        Self {
            tangent,
            bitangent,
            normal: *normal,
        }
    }

    /// Map a tangent-space vector (e.g. a perturbed bump-map normal) to world space.
    pub fn to_world(&self, v: &Vec3) -> Vec3 {
        v.x * self.tangent.as_ref() + v.y * self.bitangent.as_ref() + v.z * self.normal.as_ref()
    }

    /// Map a world-space vector into tangent space.
    pub fn to_local(&self, v: &Vec3) -> Vec3 {
        Vec3::new(
            v.dot(self.tangent.as_ref()),
            v.dot(self.bitangent.as_ref()),
            v.dot(self.normal.as_ref()),
        )
    }
}

/// Wrap an `atan2` result into `[0, 2π)`.
pub(crate) fn wrap_angle(angle: f64) -> f64 {
    let a = if angle < 0.0 { angle + TAU } else { angle };
    // A tiny negative angle rounds up to exactly 2π.
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Azimuth of `v` around `axis`, measured from `ref_dir`, in `[0, 2π)`.
///
/// Returns 0 when `v` is (nearly) parallel to the axis.
pub fn azimuth(v: &Vec3, axis: &Dir3, ref_dir: &Dir3) -> f64 {
    let y_dir = axis.cross(ref_dir.as_ref());
    let x = v.dot(ref_dir.as_ref());
    let y = v.dot(&y_dir);
    if x.hypot(y) < ON_AXIS {
        return 0.0;
    }
    wrap_angle(y.atan2(x))
}

/// Spherical coordinates `(gama, beta)` of the unit vector `dir`.
pub fn spherical_coords(dir: &Dir3, axis: &Dir3, ref_dir: &Dir3) -> (f64, f64) {
    let z = dir.dot(axis.as_ref()).clamp(-1.0, 1.0);
    let beta = z.asin();
    let gama = azimuth(dir.as_ref(), axis, ref_dir);
    (gama, beta)
}
