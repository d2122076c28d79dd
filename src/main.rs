#[macro_use]
extern crate slog;

extern crate nalgebra as na;

use anyhow::Context;
use blobtracer_rs::*;
use clap::clap_app;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use slog::Drain;
use std::path::Path;
use std::sync::Arc;

fn positive_arg(val: String) -> Result<(), String> {
    match val.parse::<f64>() {
        Ok(v) if v > 0.0 => Ok(()),
        Ok(_) => Err(String::from("arg must be positive")),
        Err(_) => Err(String::from("could not parse arg")),
    }
}

fn unit_arg(val: String) -> Result<(), String> {
    match val.parse::<f64>() {
        Ok(v) if (0.0..=1.0).contains(&v) => Ok(()),
        Ok(_) => Err(String::from("arg must be within [0, 1]")),
        Err(_) => Err(String::from("could not parse arg")),
    }
}

fn new_drain(level: slog::Level) -> slog::Fuse<slog::LevelFilter<slog::Fuse<slog_async::Async>>> {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    drain.filter_level(level).fuse()
}

fn parse<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = matches
        .value_of(name)
        .with_context(|| format!("missing argument {}", name))?;
    raw.parse::<T>()
        .with_context(|| format!("could not parse {} from {:?}", name, raw))
}

fn random_particles(
    count: usize,
    seed: u64,
    min_radius: f32,
    max_radius: f32,
    velocity_scale: f32,
) -> common::ParticleSet {
    let mut rng = SmallRng::seed_from_u64(seed);
    let extent = (count as f32).cbrt() * max_radius;
    let point = |rng: &mut SmallRng, scale: f32| {
        na::Vector3::new(
            rng.gen_range(-scale, scale),
            rng.gen_range(-scale, scale),
            rng.gen_range(-scale, scale),
        )
    };

    let positions = (0..count)
        .map(|_| na::Point3::from(point(&mut rng, extent)))
        .collect();
    let radii = (0..count)
        .map(|_| {
            if max_radius > min_radius {
                rng.gen_range(min_radius, max_radius)
            } else {
                min_radius
            }
        })
        .collect();
    let particles = common::ParticleSet::new(positions, radii);

    if velocity_scale > 0.0 {
        let velocities = (0..count)
            .map(|_| point(&mut rng, velocity_scale))
            .collect();
        particles.with_velocities(velocities)
    } else {
        particles
    }
}

fn main() -> anyhow::Result<()> {
    let matches = clap_app!(blobtracer =>
        (version: "1.0")
        (author: "Eric F. <eric1221bday@gmail.com>")
        (about: "Ray traces blobby particle clouds through an octree")
        (@arg output: -o --output +takes_value +required "Sets the path of the preview image")
        (@arg count: -n --count default_value("2000") validator(positive_arg) "Number of random particles")
        (@arg seed: --seed default_value("1") "Random seed for particle placement")
        (@arg min_radius: --("min-radius") default_value("0.2") validator(positive_arg) "Smallest particle radius")
        (@arg max_radius: --("max-radius") default_value("1.0") validator(positive_arg) "Largest particle radius")
        (@arg velocity: --velocity default_value("0") "Largest per-axis particle displacement over the shutter")
        (@arg time: -t --time default_value("0") validator(unit_arg) "Normalized shutter time of the camera rays")
        (@arg threshold: --threshold default_value("0.5") validator(positive_arg) "Iso-surface threshold")
        (@arg kind: -k --kind default_value("blobby") possible_values(&["spheres", "blobby", "cloud", "tube"]) "Primitive to render")
        (@arg leaf_size: --("leaf-size") default_value("20") "Most particles per octree leaf (0 for default)")
        (@arg depth: --depth default_value("8") "Deepest octree level (0 for default)")
        (@arg width: --width default_value("640") validator(positive_arg) "Image width")
        (@arg height: --height default_value("480") validator(positive_arg) "Image height")
        (@arg verbose: -v --verbose "Print debug information")
    )
    .get_matches();

    let level = if matches.is_present("verbose") {
        slog::Level::Debug
    } else {
        slog::Level::Info
    };
    let log = slog::Logger::root(new_drain(level), o!());

    let count: usize = parse(&matches, "count")?;
    let max_radius: f32 = parse(&matches, "max_radius")?;
    let particles = random_particles(
        count,
        parse(&matches, "seed")?,
        parse(&matches, "min_radius")?,
        max_radius,
        parse(&matches, "velocity")?,
    );
    let config =
        octree::OctreeConfig::new(parse(&matches, "leaf_size")?, parse(&matches, "depth")?);
    let octree = octree::ParticleOctree::new(&log, Arc::new(particles), config);

    let threshold: f32 = parse(&matches, "threshold")?;
    let mode = match matches.value_of("kind").unwrap_or("blobby") {
        "spheres" => headless::PreviewMode::Spheres,
        "cloud" => headless::PreviewMode::Surface(blobby::BlobbySettings {
            threshold,
            kind: blobby::PrimitiveKind::Cloud,
        }),
        "tube" => headless::PreviewMode::Surface(blobby::BlobbySettings {
            threshold,
            kind: blobby::PrimitiveKind::Tube,
        }),
        _ => headless::PreviewMode::Surface(blobby::BlobbySettings {
            threshold,
            kind: blobby::PrimitiveKind::Blobby,
        }),
    };

    let bounds = *octree.bounds();
    let eye = bounds.center + na::Vector3::new(0.0, 0.0, bounds.size.max() * 1.5);
    let camera = common::Camera::look_at(
        &eye,
        &bounds.center,
        std::f32::consts::FRAC_PI_3,
        &na::Vector2::new(parse(&matches, "width")?, parse(&matches, "height")?),
    );
    debug!(log, "camera starting at: {:?}", camera.cam_to_world);

    let renderer = headless::PreviewRenderer::new(&log, mode, parse(&matches, "time")?);
    let output_path = Path::new(matches.value_of("output").unwrap_or("preview.png"));
    headless::run(&log, &octree, &camera, &renderer, output_path)
}
