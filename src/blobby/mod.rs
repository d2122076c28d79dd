//! Implicit surface of summed particle fields, found by exact quartic root
//! finding between consecutive particle boundary crossings.

pub mod field;

use crate::common::math::{to_f32, to_f64, vec_to_f32, vec_to_f64};
use crate::common::roots::solve_polynomial;
use crate::common::Ray;
use crate::octree::{Hit, HitKind, ParticleOctree};
use field::FieldCoefficients;
use std::collections::{BTreeMap, HashMap};

/// Thresholds below this would make the surface hug every particle boundary.
pub const MIN_THRESHOLD: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Blobby,
    /// Same field as [`PrimitiveKind::Blobby`]; shading differs downstream.
    Cloud,
    Tube,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobbySettings {
    pub threshold: f32,
    pub kind: PrimitiveKind,
}

impl Default for BlobbySettings {
    fn default() -> Self {
        BlobbySettings {
            threshold: 0.5,
            kind: PrimitiveKind::Blobby,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit {
    pub t: f32,
    pub p: na::Point3<f32>,
    /// Unit normal facing the ray origin.
    pub n: na::Vector3<f32>,
    /// The field normal pointed away from the viewer and was flipped.
    pub inverted: bool,
    /// The field gradient vanished; `n` is a fallback direction.
    pub degenerate_normal: bool,
}

pub struct BlobbyFieldEvaluator<'a> {
    octree: &'a ParticleOctree,
    settings: BlobbySettings,
}

impl<'a> BlobbyFieldEvaluator<'a> {
    pub fn new(octree: &'a ParticleOctree, settings: BlobbySettings) -> Self {
        BlobbyFieldEvaluator { octree, settings }
    }

    fn threshold(&self) -> f64 {
        self.settings.threshold.max(MIN_THRESHOLD) as f64
    }

    fn particle_field(
        &self,
        hit: &Hit,
        origin: &na::Point3<f64>,
        dir: &na::Vector3<f64>,
    ) -> FieldCoefficients {
        let shape = self.octree.shape(hit.index);
        let center = to_f64(&hit.center);
        match self.settings.kind {
            PrimitiveKind::Tube => {
                let to_local: na::Rotation3<f64> =
                    na::convert(self.octree.particles().rotation(hit.index).inverse());
                let local_origin = na::Point3::from(to_local * (origin - center));
                FieldCoefficients::tube(shape, &local_origin, &(to_local * dir))
            }
            PrimitiveKind::Blobby | PrimitiveKind::Cloud => {
                FieldCoefficients::sphere(shape, origin, dir, &center)
            }
        }
    }

    /// First crossing of the iso-surface along `ray`, given the ray's
    /// sorted particle hits.
    pub fn evaluate(&self, ray: &Ray, hits: &[Hit]) -> Option<SurfaceHit> {
        let crossings: Vec<&Hit> = hits
            .iter()
            .filter(|h| h.kind != HitKind::Tangent)
            .collect();
        if crossings.is_empty() {
            return None;
        }

        // a particle whose first crossing is an exit contains the origin
        let mut first_kind = HashMap::new();
        for hit in crossings.iter() {
            first_kind.entry(hit.index).or_insert(hit.kind);
        }
        let seeded: Vec<&Hit> = crossings
            .iter()
            .copied()
            .filter(|h| {
                h.kind == HitKind::Exit && first_kind.get(&h.index) == Some(&HitKind::Exit)
            })
            .collect();

        // root finding runs in a frame shifted to the first crossing
        let start = if seeded.is_empty() {
            crossings[0].t as f64
        } else {
            0.0
        };
        let dir = vec_to_f64(&ray.d);
        let origin = to_f64(&ray.o) + dir * start;
        let max_dist = ray.t_max as f64 - start;

        let mut poly = FieldCoefficients::threshold(self.threshold());
        let mut active: HashMap<usize, FieldCoefficients> = HashMap::new();

        for hit in seeded.iter() {
            let f = self.particle_field(hit, &origin, &dir);
            poly += f;
            active.insert(hit.index, f);
        }
        if !active.is_empty() {
            let end = crossings[0].t as f64 - start;
            if let Some(t) = first_root(&poly, 0.0, end) {
                return Some(self.surface_hit(ray, hits, start + t));
            }
        }

        for (i, hit) in crossings.iter().enumerate() {
            match hit.kind {
                HitKind::Entry => {
                    let f = self.particle_field(hit, &origin, &dir);
                    poly += f;
                    active.insert(hit.index, f);
                }
                HitKind::Exit => match active.remove(&hit.index) {
                    Some(f) => poly -= f,
                    None => continue,
                },
                HitKind::Tangent => continue,
            }

            if active.is_empty() {
                // drop accumulated rounding error between disjoint spans
                poly = FieldCoefficients::threshold(self.threshold());
                continue;
            }

            let seg_start = hit.t as f64 - start;
            let seg_end = match crossings.get(i + 1) {
                Some(next) => next.t as f64 - start,
                None => max_dist,
            };
            if let Some(t) = first_root(&poly, seg_start, seg_end) {
                return Some(self.surface_hit(ray, hits, start + t));
            }
        }

        None
    }

    fn surface_hit(&self, ray: &Ray, hits: &[Hit], t: f64) -> SurfaceHit {
        let p = to_f64(&ray.o) + vec_to_f64(&ray.d) * t;
        let (n, degenerate_normal) = self.normal_at(&p, ray, hits);

        let inverted = n.dot(&ray.d) > 0.0;
        SurfaceHit {
            t: t as f32,
            p: to_f32(&p),
            n: if inverted { -n } else { n },
            inverted,
            degenerate_normal,
        }
    }

    /// Sums the outward gradient of every particle influencing `p`. Falls back
    /// to the direction from the nearest influencing center, then to the
    /// reversed ray direction, when the sum vanishes.
    fn normal_at(&self, p: &na::Point3<f64>, ray: &Ray, hits: &[Hit]) -> (na::Vector3<f32>, bool) {
        let mut unique = BTreeMap::new();
        for hit in hits {
            unique.entry(hit.index).or_insert(hit);
        }

        let mut n = na::Vector3::<f64>::zeros();
        let mut nearest: Option<(f64, na::Vector3<f64>)> = None;
        for (&index, hit) in unique.iter() {
            let v = p - to_f64(&hit.center);
            let dist_sq = v.norm_squared();
            if dist_sq > hit.radius_sq as f64 {
                continue;
            }
            if nearest.map_or(true, |(best, _)| dist_sq < best) {
                nearest = Some((dist_sq, v));
            }

            let shape = self.octree.shape(index);
            n += match self.settings.kind {
                PrimitiveKind::Tube => {
                    let rotation: na::Rotation3<f64> =
                        na::convert(self.octree.particles().rotation(index));
                    let mut local = rotation.inverse() * v;
                    local.z = 0.0;
                    rotation * local * shape.gradient_scale(local.norm_squared())
                }
                PrimitiveKind::Blobby | PrimitiveKind::Cloud => v * shape.gradient_scale(dist_sq),
            };
        }

        if let Some(n) = n.try_normalize(1e-12) {
            return (vec_to_f32(&n), false);
        }

        let fallback = nearest
            .and_then(|(_, v)| v.try_normalize(1e-12))
            .map(|v| vec_to_f32(&v))
            .unwrap_or(-ray.d);
        (fallback, true)
    }
}

fn first_root(poly: &FieldCoefficients, seg_start: f64, seg_end: f64) -> Option<f64> {
    if seg_end <= seg_start {
        return None;
    }
    solve_polynomial(&poly.0)
        .into_iter()
        .filter(|t| *t >= seg_start && *t < seg_end)
        .fold(None, |best: Option<f64>, t| match best {
            Some(b) if b <= t => Some(b),
            _ => Some(t),
        })
}

impl ParticleOctree {
    /// First point where the summed particle field reaches
    /// `settings.threshold` along the ray.
    pub fn query_implicit_surface(
        &self,
        ray: &Ray,
        settings: BlobbySettings,
    ) -> Option<SurfaceHit> {
        let hits = self.query_all_hits(ray);
        if hits.is_empty() {
            return None;
        }
        BlobbyFieldEvaluator::new(self, settings).evaluate(ray, &hits)
    }
}
