//! Closest-hit queries over a collection of primitives.
//!
//! Every query uses the same selection rule: let `t*` be the smallest `t`
//! among all valid hits; the winner is the lowest-index primitive whose hit
//! lies within `t* + tie_tolerance`. The rule depends only on the set of
//! hits, so the sequential, parallel and BVH paths return the same record.

use float_ord::FloatOrd;
use log::debug;
use rayon::prelude::*;

use crate::bvh::Bvh;
use crate::config::IntersectConfig;
use crate::error::Result;
use crate::hit::HitRecord;
use crate::primitive::{Intersect, Primitive};
use crate::Ray;

/// Pick the winning hit from `(index, hit)` candidates.
///
/// The returned record has `primitive` set to the winning index.
pub(crate) fn select_closest(
    candidates: Vec<(usize, HitRecord)>,
    tie_tolerance: f64,
) -> Option<HitRecord> {
    let t_min = candidates.iter().map(|(_, hit)| FloatOrd(hit.t)).min()?.0;
    let limit = t_min + tie_tolerance;
    candidates
        .into_iter()
        .filter(|(_, hit)| hit.t <= limit)
        .min_by_key(|(index, _)| *index)
        .map(|(index, mut hit)| {
            hit.primitive = Some(index);
            hit
        })
}

/// Closest hit of `ray` over `primitives`, evaluated sequentially.
///
/// Returns `None` if nothing is hit (including for an empty slice).
pub fn find_closest_hit<P: Intersect>(
    ray: &Ray,
    primitives: &[P],
    tie_tolerance: f64,
) -> Option<HitRecord> {
    let candidates = primitives
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.intersect(ray).map(|hit| (i, hit)))
        .collect();
    select_closest(candidates, tie_tolerance)
}

/// Same as [`find_closest_hit`], with the primitives tested in parallel.
pub fn par_find_closest_hit<P: Intersect>(
    ray: &Ray,
    primitives: &[P],
    tie_tolerance: f64,
) -> Option<HitRecord> {
    let candidates = primitives
        .par_iter()
        .enumerate()
        .filter_map(|(i, p)| p.intersect(ray).map(|hit| (i, hit)))
        .collect();
    select_closest(candidates, tie_tolerance)
}

/// An immutable primitive collection with its intersection configuration.
///
/// Build it once per frame (or whenever the scene changes); queries take
/// `&self` and can run from many threads.
#[derive(Debug, Clone)]
pub struct SceneIntersector<P = Primitive> {
    primitives: Vec<P>,
    config: IntersectConfig,
    bvh: Option<Bvh>,
}

impl<P: Intersect> SceneIntersector<P> {
    /// Wrap `primitives` after validating `config`.
    pub fn new(primitives: Vec<P>, config: IntersectConfig) -> Result<Self> {
        config.validate()?;
        debug!("scene intersector over {} primitives", primitives.len());
        Ok(Self {
            primitives,
            config,
            bvh: None,
        })
    }

    /// Build a BVH and use it for closest-hit and occlusion queries.
    ///
    /// Results are identical to the brute-force path.
    pub fn with_bvh(mut self) -> Self {
        self.bvh = Some(Bvh::build(&self.primitives, &self.config.tolerance));
        self
    }

    /// The primitives, in index order.
    pub fn primitives(&self) -> &[P] {
        &self.primitives
    }

    /// The configuration this scene was built with.
    pub fn config(&self) -> &IntersectConfig {
        &self.config
    }

    /// The acceleration structure, if one was built.
    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    /// Number of primitives.
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// True if the scene holds no primitives.
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Closest hit of `ray`, using the BVH when one was built.
    pub fn find_closest_hit(&self, ray: &Ray) -> Option<HitRecord> {
        let tie = self.config.tie_tolerance;
        match &self.bvh {
            Some(bvh) => bvh.find_closest_hit(ray, &self.primitives, tie),
            None => find_closest_hit(ray, &self.primitives, tie),
        }
    }

    /// Closest hit of `ray`, testing every primitive in parallel.
    pub fn par_find_closest_hit(&self, ray: &Ray) -> Option<HitRecord> {
        par_find_closest_hit(ray, &self.primitives, self.config.tie_tolerance)
    }

    /// Closest hits for many rays at once.
    ///
    /// Rays are distributed across the rayon pool; `result[i]` belongs to
    /// `rays[i]`.
    pub fn trace_batch(&self, rays: &[Ray]) -> Vec<Option<HitRecord>> {
        rays.par_iter()
            .map(|ray| self.find_closest_hit(ray))
            .collect()
    }

    /// True if anything is hit with `epsilon < t < max_distance`.
    ///
    /// Intended for shadow rays; stops at the first blocker found.
    pub fn occluded(&self, ray: &Ray, max_distance: f64) -> bool {
        match &self.bvh {
            Some(bvh) => bvh.any_hit(ray, &self.primitives, max_distance),
            None => self
                .primitives
                .iter()
                .any(|p| p.intersect(ray).is_some_and(|hit| hit.t < max_distance)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::{MaterialId, PrimitiveKind};
    use crate::primitive::{Quadric, Sphere, Triangle};
    use approx::assert_relative_eq;
    use lumen_math::{Point3, Vec3};

    fn config() -> IntersectConfig {
        IntersectConfig::default()
    }

    fn sphere(x: f64, y: f64, z: f64, r: f64, material: u32) -> Primitive {
        Sphere::new(Point3::new(x, y, z), r, MaterialId(material), &config())
            .unwrap()
            .into()
    }

    /// A small mixed scene: spheres along +Z, a cylinder and a floor triangle.
    fn mixed_scene() -> Vec<Primitive> {
        let cfg = config();
        let mut prims = vec![
            sphere(0.0, 0.0, 5.0, 1.0, 0),
            sphere(0.0, 0.0, 2.0, 0.5, 1),
            sphere(3.0, 0.0, 2.0, 1.0, 2),
        ];
        prims.push(
            Quadric::cylinder(
                Point3::new(-3.0, 0.0, 0.0),
                Point3::new(-3.0, 0.0, 4.0),
                1.0,
                MaterialId(3),
                &cfg,
            )
            .unwrap()
            .into(),
        );
        prims.push(
            Triangle::new(
                Point3::new(-10.0, -10.0, 10.0),
                Point3::new(10.0, -10.0, 10.0),
                Point3::new(0.0, 10.0, 10.0),
                MaterialId(4),
                &cfg,
            )
            .unwrap()
            .into(),
        );
        prims
    }

    #[test]
    fn test_closest_of_two_spheres() {
        let prims = mixed_scene();
        let ray = Ray::new(Point3::origin(), Vec3::z());
        let hit = find_closest_hit(&ray, &prims, 1e-9).unwrap();
        assert_eq!(hit.primitive, Some(1));
        assert_eq!(hit.material, MaterialId(1));
        assert_relative_eq!(hit.t, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_order_does_not_matter() {
        let mut prims = mixed_scene();
        prims.swap(0, 1);
        let ray = Ray::new(Point3::origin(), Vec3::z());
        let hit = find_closest_hit(&ray, &prims, 1e-9).unwrap();
        assert_eq!(hit.primitive, Some(0));
        assert_eq!(hit.material, MaterialId(1));
    }

    #[test]
    fn test_tie_goes_to_lower_index() {
        let prims = vec![
            sphere(0.0, 0.0, 5.0, 1.0, 7),
            sphere(0.0, 0.0, 5.0, 1.0, 8),
            sphere(0.0, 0.0, 5.0, 1.0, 9),
        ];
        let ray = Ray::new(Point3::origin(), Vec3::z());
        for hit in [
            find_closest_hit(&ray, &prims, 1e-9),
            par_find_closest_hit(&ray, &prims, 1e-9),
        ] {
            let hit = hit.unwrap();
            assert_eq!(hit.primitive, Some(0));
            assert_eq!(hit.material, MaterialId(7));
        }
    }

    #[test]
    fn test_tie_tolerance_window() {
        // The second sphere is nearer by less than the tolerance.
        let prims = vec![
            sphere(0.0, 0.0, 5.0, 1.0, 0),
            sphere(0.0, 0.0, 5.0 - 1e-7, 1.0, 1),
        ];
        let ray = Ray::new(Point3::origin(), Vec3::z());
        let loose = find_closest_hit(&ray, &prims, 1e-6).unwrap();
        assert_eq!(loose.primitive, Some(0));
        let strict = find_closest_hit(&ray, &prims, 0.0).unwrap();
        assert_eq!(strict.primitive, Some(1));
    }

    #[test]
    fn test_empty_and_miss() {
        let ray = Ray::new(Point3::origin(), Vec3::z());
        let empty: Vec<Primitive> = Vec::new();
        assert!(find_closest_hit(&ray, &empty, 1e-9).is_none());
        assert!(par_find_closest_hit(&ray, &empty, 1e-9).is_none());

        let scene = SceneIntersector::new(empty, config()).unwrap().with_bvh();
        assert!(scene.is_empty());
        assert!(scene.find_closest_hit(&ray).is_none());
        assert!(!scene.occluded(&ray, f64::INFINITY));

        let prims = mixed_scene();
        let away = Ray::new(Point3::origin(), -Vec3::z());
        assert!(find_closest_hit(&away, &prims, 1e-9).is_none());
    }

    #[test]
    fn test_sequential_parallel_bvh_agree() {
        let mut prims = mixed_scene();
        // A grid of small spheres, some overlapping exactly to force ties.
        for i in 0..6 {
            for j in 0..6 {
                let x = i as f64 - 2.5;
                let y = j as f64 - 2.5;
                prims.push(sphere(x, y, 7.0, 0.4, 10 + i * 6 + j));
                if (i + j) % 3 == 0 {
                    prims.push(sphere(x, y, 7.0, 0.4, 100 + i * 6 + j));
                }
            }
        }
        let flat = SceneIntersector::new(prims.clone(), config()).unwrap();
        let tree = SceneIntersector::new(prims, config()).unwrap().with_bvh();

        let mut rays = Vec::new();
        for i in 0..25 {
            for j in 0..25 {
                let target = Point3::new(
                    -4.0 + 8.0 * i as f64 / 24.0,
                    -4.0 + 8.0 * j as f64 / 24.0,
                    7.0,
                );
                let origin = Point3::new(0.1, -0.2, -2.0);
                rays.push(Ray::new(origin, target - origin));
            }
        }

        let batch = tree.trace_batch(&rays);
        assert_eq!(batch.len(), rays.len());
        let mut hits = 0;
        for (ray, batched) in rays.iter().zip(&batch) {
            let seq = flat.find_closest_hit(ray);
            let par = flat.par_find_closest_hit(ray);
            let bvh = tree.find_closest_hit(ray);
            assert_eq!(seq, par);
            assert_eq!(seq, bvh);
            assert_eq!(&seq, batched);
            hits += usize::from(seq.is_some());
        }
        assert!(hits > 100);
    }

    #[test]
    fn test_occluded() {
        let prims = mixed_scene();
        for scene in [
            SceneIntersector::new(prims.clone(), config()).unwrap(),
            SceneIntersector::new(prims, config()).unwrap().with_bvh(),
        ] {
            let ray = Ray::new(Point3::origin(), Vec3::z());
            // Nearest blocker is at t = 1.5.
            assert!(scene.occluded(&ray, 2.0));
            assert!(!scene.occluded(&ray, 1.4));
            let side = Ray::new(Point3::new(0.0, 5.0, 0.0), Vec3::y());
            assert!(!scene.occluded(&side, f64::INFINITY));
        }
    }

    #[test]
    fn test_secondary_ray_through_scene() {
        let scene = SceneIntersector::new(mixed_scene(), config()).unwrap();
        let ray = Ray::new(Point3::new(-3.0, 0.0, -5.0), Vec3::z());
        let hit = scene.find_closest_hit(&ray).unwrap();
        assert_eq!(hit.kind, PrimitiveKind::Cylinder);
        assert_eq!(hit.primitive, Some(3));
        // Continue straight through: next is the top cap, then the triangle.
        let dir = *ray.direction().as_ref();
        let next = scene.find_closest_hit(&hit.spawn_ray(dir)).unwrap();
        assert_eq!(next.primitive, Some(3));
        assert_relative_eq!(next.position.z, 4.0, epsilon = 1e-12);
        let last = scene.find_closest_hit(&next.spawn_ray(dir)).unwrap();
        assert_eq!(last.primitive, Some(4));
        assert_eq!(last.kind, PrimitiveKind::Triangle);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = IntersectConfig {
            epsilon: -1.0,
            ..IntersectConfig::default()
        };
        assert!(SceneIntersector::<Primitive>::new(Vec::new(), cfg).is_err());
    }
}
