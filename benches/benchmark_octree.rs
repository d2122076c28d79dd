#[macro_use]
extern crate slog;

use blobtracer_rs::*;
use criterion::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn particles(n: usize) -> common::ParticleSet {
    let mut rng = SmallRng::seed_from_u64(42);
    let positions = (0..n)
        .map(|_| {
            nalgebra::Point3::new(
                rng.gen_range(-20.0, 20.0),
                rng.gen_range(-20.0, 20.0),
                rng.gen_range(-20.0, 20.0),
            )
        })
        .collect();
    let radii = (0..n).map(|_| rng.gen_range(0.2, 1.0)).collect();
    common::ParticleSet::new(positions, radii)
}

fn rays(n: usize) -> Vec<common::Ray> {
    let mut rng = SmallRng::seed_from_u64(7);
    (0..n)
        .map(|_| {
            let o = nalgebra::Point3::new(
                rng.gen_range(-5.0, 5.0),
                rng.gen_range(-5.0, 5.0),
                -40.0,
            );
            let target = nalgebra::Point3::new(
                rng.gen_range(-15.0, 15.0),
                rng.gen_range(-15.0, 15.0),
                0.0,
            );
            common::Ray::new(o, target - o, rng.gen_range(0.0, 1.0), 0.0)
        })
        .collect()
}

fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("benchmark-octree");

    let drain = slog::Discard;
    let log = slog::Logger::root(drain, o!());
    let set = Arc::new(particles(20_000));
    let rays = rays(256);

    group.sampling_mode(SamplingMode::Flat).sample_size(10);
    group.bench_function("build", |b| {
        b.iter(|| octree::ParticleOctree::new(&log, set.clone(), octree::OctreeConfig::default()))
    });

    let index = octree::ParticleOctree::new(&log, set.clone(), octree::OctreeConfig::default());
    group.bench_function("query_all_hits", |b| {
        b.iter(|| {
            rays.iter()
                .map(|r| index.query_all_hits(r).len())
                .sum::<usize>()
        })
    });
    group.bench_function("query_implicit_surface", |b| {
        let settings = blobby::BlobbySettings::default();
        b.iter(|| {
            rays.iter()
                .filter(|r| index.query_implicit_surface(r, settings).is_some())
                .count()
        })
    });
    group.finish();
}

criterion_group!(benches, bench);
criterion_main!(benches);
