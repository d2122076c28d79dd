use crate::blobby::BlobbySettings;
use crate::common::{math::gamma_correct, Camera};
use crate::octree::ParticleOctree;
use anyhow::Context;
#[cfg(not(feature = "disable_rayon"))]
use indicatif::ParallelProgressIterator;
#[cfg(feature = "disable_rayon")]
use indicatif::ProgressIterator;
use itertools::Itertools;
#[cfg(not(feature = "disable_rayon"))]
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

const TILE_SIZE: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviewMode {
    /// Shade the nearest particle sphere.
    Spheres,
    /// Shade the blended iso-surface.
    Surface(BlobbySettings),
}

struct Tile {
    x0: u32,
    y0: u32,
    width: u32,
    pixels: Vec<[u8; 3]>,
}

/// Renders a normal-shaded preview of a particle index.
pub struct PreviewRenderer {
    mode: PreviewMode,
    time: f32,
    log: slog::Logger,
}

impl PreviewRenderer {
    pub fn new(log: &slog::Logger, mode: PreviewMode, time: f32) -> Self {
        let log = log.new(o!("module" => "preview"));
        PreviewRenderer { mode, time, log }
    }

    /// Shading normal seen through a raster position, if anything is hit.
    pub fn shade_pixel(
        &self,
        camera: &Camera,
        octree: &ParticleOctree,
        pixel: &na::Point2<f32>,
    ) -> Option<na::Vector3<f32>> {
        let ray = camera.generate_ray(pixel, self.time);
        match self.mode {
            PreviewMode::Spheres => octree.query_nearest_hit(&ray).map(|sphere| sphere.n),
            PreviewMode::Surface(settings) => octree
                .query_implicit_surface(&ray, settings)
                .map(|surface| surface.n),
        }
    }

    fn render_tile(&self, camera: &Camera, octree: &ParticleOctree, tile: &(u32, u32)) -> Tile {
        let x0 = tile.0 * TILE_SIZE;
        let y0 = tile.1 * TILE_SIZE;
        let x1 = (x0 + TILE_SIZE).min(camera.resolution.x);
        let y1 = (y0 + TILE_SIZE).min(camera.resolution.y);

        let pixels = (y0..y1)
            .cartesian_product(x0..x1)
            .map(|(y, x)| {
                let pixel = na::Point2::new(x as f32 + 0.5, y as f32 + 0.5);
                match self.shade_pixel(camera, octree, &pixel) {
                    Some(n) => {
                        let c = n * 0.5 + na::Vector3::repeat(0.5);
                        [
                            (gamma_correct(c.x) * 255.0).clamp(0.0, 255.0) as u8,
                            (gamma_correct(c.y) * 255.0).clamp(0.0, 255.0) as u8,
                            (gamma_correct(c.z) * 255.0).clamp(0.0, 255.0) as u8,
                        ]
                    }
                    None => [0, 0, 0],
                }
            })
            .collect();

        Tile {
            x0,
            y0,
            width: x1 - x0,
            pixels,
        }
    }

    pub fn render(&self, camera: &Camera, octree: &ParticleOctree) -> image::RgbImage {
        debug!(self.log, "start rendering image of size: {:?}", camera.resolution);
        let start = Instant::now();
        let num_tiles = na::Vector2::new(
            (camera.resolution.x + TILE_SIZE - 1) / TILE_SIZE,
            (camera.resolution.y + TILE_SIZE - 1) / TILE_SIZE,
        );
        let tiles = (0..num_tiles.x)
            .cartesian_product(0..num_tiles.y)
            .collect_vec();
        let count = tiles.len() as u64;

        #[cfg(not(feature = "disable_rayon"))]
        let rendered: Vec<Tile> = tiles
            .par_iter()
            .progress_count(count)
            .map(|tile| self.render_tile(camera, octree, tile))
            .collect();
        #[cfg(feature = "disable_rayon")]
        let rendered: Vec<Tile> = tiles
            .iter()
            .progress_count(count)
            .map(|tile| self.render_tile(camera, octree, tile))
            .collect();

        let mut img = image::RgbImage::new(camera.resolution.x, camera.resolution.y);
        for tile in rendered {
            for (i, rgb) in tile.pixels.into_iter().enumerate() {
                let x = tile.x0 + i as u32 % tile.width;
                let y = tile.y0 + i as u32 / tile.width;
                img.put_pixel(x, y, image::Rgb(rgb));
            }
        }

        info!(self.log, "rendering took {:?}", start.elapsed());
        img
    }
}

pub fn run(
    log: &slog::Logger,
    octree: &ParticleOctree,
    camera: &Camera,
    renderer: &PreviewRenderer,
    output_path: &Path,
) -> anyhow::Result<()> {
    let img = renderer.render(camera, octree);
    img.save(output_path)
        .with_context(|| format!("could not save preview to {:?}", output_path))?;
    info!(log, "saved preview to {:?}", output_path);
    Ok(())
}
