#![warn(missing_docs)]

//! Ray/primitive intersection core for the lumen ray tracer.
//!
//! Given a ray and a collection of geometric primitives (spheres, cylinders,
//! cones, triangles and triangle meshes), this crate finds the nearest
//! intersection and produces a [`HitRecord`] with everything the shading
//! stage needs: position, oriented normal, material, texture coordinates and
//! a local shading frame for bump mapping.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray with a normalized direction and a slab test
//! - [`primitive`] - Per-primitive intersection algorithms behind [`Intersect`]
//! - [`SceneIntersector`] - Closest-hit selection, batch and occlusion queries
//! - [`Bvh`] - Bounding volume hierarchy for acceleration
//! - [`ShadingFrame`] - Orthonormal tangent frames with one convention for all surfaces
//! - [`IntersectConfig`] - Epsilon policy, loadable from TOML
//!
//! # Example
//!
//! ```
//! use lumen_intersect::{IntersectConfig, MaterialId, Primitive, Ray, SceneIntersector, Sphere};
//! use lumen_math::{Point3, Vec3};
//!
//! let config = IntersectConfig::default();
//! let sphere = Sphere::new(Point3::origin(), 1.0, MaterialId(0), &config)?;
//! let scene = SceneIntersector::new(vec![Primitive::from(sphere)], config)?;
//!
//! let ray = Ray::new(Point3::new(0.0, 0.0, -10.0), Vec3::new(0.0, 0.0, 1.0));
//! let hit = scene.find_closest_hit(&ray).expect("ray hits the sphere");
//! assert!((hit.t - 9.0).abs() < 1e-10);
//! # Ok::<(), lumen_intersect::IntersectError>(())
//! ```

mod ray;
pub mod bvh;
pub mod config;
pub mod error;
pub mod frame;
pub mod hit;
pub mod primitive;
pub mod scene;

pub use bvh::Bvh;
pub use config::{EpsilonPolicy, IntersectConfig};
pub use error::{IntersectError, Result};
pub use frame::{spherical_coords, ShadingFrame};
pub use hit::{
    FaceSide, HitRecord, MaterialId, PrimitiveKind, QuadricHit, QuadricRegion, SphereHit,
    SurfaceData, TextureId, TriangleHit,
};
pub use primitive::{Intersect, Mesh, Primitive, Quadric, Sphere, Triangle};
pub use ray::Ray;
pub use scene::{find_closest_hit, par_find_closest_hit, SceneIntersector};
