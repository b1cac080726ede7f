use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lumen_intersect::{IntersectConfig, MaterialId, Primitive, Quadric, Ray, SceneIntersector, Sphere};
use lumen_math::{Point3, Vec3};

/// Grid of spheres with a cylinder in every other cell.
fn build_scene(n: usize) -> Vec<Primitive> {
    let config = IntersectConfig::default();
    let mut prims = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let x = i as f64 * 2.0;
            let y = j as f64 * 2.0;
            let material = MaterialId((i * n + j) as u32);
            if (i + j) % 2 == 0 {
                let s = Sphere::new(Point3::new(x, y, 10.0), 0.8, material, &config).unwrap();
                prims.push(s.into());
            } else {
                let q = Quadric::cylinder(
                    Point3::new(x, y, 9.0),
                    Point3::new(x, y, 11.0),
                    0.7,
                    material,
                    &config,
                )
                .unwrap();
                prims.push(q.into());
            }
        }
    }
    prims
}

fn camera_rays(n: usize, extent: f64) -> Vec<Ray> {
    let origin = Point3::new(extent / 2.0, extent / 2.0, -5.0);
    (0..n * n)
        .map(|k| {
            let target = Point3::new(
                (k % n) as f64 / n as f64 * extent,
                (k / n) as f64 / n as f64 * extent,
                10.0,
            );
            Ray::new(origin, target - origin)
        })
        .collect()
}

fn closest_hit_benchmark(c: &mut Criterion) {
    let _ = env_logger::try_init();

    let prims = build_scene(32);
    let rays = camera_rays(64, 64.0);
    let flat = SceneIntersector::new(prims.clone(), IntersectConfig::default()).unwrap();
    let tree = SceneIntersector::new(prims, IntersectConfig::default())
        .unwrap()
        .with_bvh();

    c.bench_function("closest hit brute force", |b| {
        b.iter(|| {
            for ray in &rays {
                black_box(flat.find_closest_hit(black_box(ray)));
            }
        })
    });

    c.bench_function("closest hit bvh", |b| {
        b.iter(|| {
            for ray in &rays {
                black_box(tree.find_closest_hit(black_box(ray)));
            }
        })
    });

    c.bench_function("trace batch bvh", |b| {
        b.iter(|| black_box(tree.trace_batch(black_box(&rays))))
    });

    let shadow = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 5.0));
    c.bench_function("occluded bvh", |b| {
        b.iter(|| black_box(tree.occluded(black_box(&shadow), 100.0)))
    });
}

criterion_group!(benches, closest_hit_benchmark);
criterion_main!(benches);
