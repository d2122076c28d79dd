use crate::common::math::face_forward;
use crate::common::{ParticleSet, Ray};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitKind {
    Entry,
    Exit,
    /// The ray grazes the sphere; reported once and never opens a span.
    Tangent,
}

/// One ray/particle boundary crossing.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub t: f32,
    pub kind: HitKind,
    /// Index into the particle arrays.
    pub index: usize,
    pub particle_id: u32,
    /// Particle center at the ray's time.
    pub center: na::Point3<f32>,
    pub radius_sq: f32,
}

pub type HitList = Vec<Hit>;

/// Nearest sphere hit with its surface geometry.
#[derive(Debug, Clone, Copy)]
pub struct SphereHit {
    pub hit: Hit,
    pub p: na::Point3<f32>,
    /// Geometric normal facing the ray origin.
    pub n: na::Vector3<f32>,
    /// The outward normal faced away from the ray and was flipped.
    pub inverted: bool,
}

impl SphereHit {
    pub fn new(ray: &Ray, hit: Hit) -> Self {
        let p = ray.point_at(hit.t);
        let outward = (p - hit.center)
            .try_normalize(0.0)
            .unwrap_or_else(|| -ray.d);
        let n = face_forward(&outward, &-ray.d);
        SphereHit {
            hit,
            p,
            n,
            inverted: n != outward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SphereRoots {
    Miss,
    Tangent(f32),
    Crossing(f32, f32),
}

/// Solves `|o + t d - c|^2 = r^2` for a unit direction `d`.
pub fn intersect_sphere(ray: &Ray, center: &na::Point3<f32>, radius: f32) -> SphereRoots {
    let diff = ray.o - center;
    let b = diff.dot(&ray.d);
    let c = diff.norm_squared() - radius * radius;
    let discr = b * b - c;

    if discr < 0.0 {
        SphereRoots::Miss
    } else if discr == 0.0 {
        SphereRoots::Tangent(-b)
    } else {
        let root = discr.sqrt();
        SphereRoots::Crossing(-b - root, -b + root)
    }
}

fn in_range(t: f32, ray: &Ray) -> bool {
    t >= 0.0 && t <= ray.t_max
}

/// Appends the in-range crossings of particle `index` to `hits`.
pub fn collect_particle_hits(particles: &ParticleSet, index: usize, ray: &Ray, hits: &mut HitList) {
    let center = particles.center_at(index, ray.time);
    let radius = particles.radius(index);

    let mut push = |t: f32, kind: HitKind| {
        if in_range(t, ray) {
            hits.push(Hit {
                t,
                kind,
                index,
                particle_id: particles.id(index),
                center,
                radius_sq: radius * radius,
            });
        }
    };

    match intersect_sphere(ray, &center, radius) {
        SphereRoots::Miss => {}
        SphereRoots::Tangent(t) => push(t, HitKind::Tangent),
        SphereRoots::Crossing(t0, t1) => {
            push(t0, HitKind::Entry);
            push(t1, HitKind::Exit);
        }
    }
}

/// Nearest in-range crossing of particle `index`, entry or exit.
pub fn nearest_particle_hit(particles: &ParticleSet, index: usize, ray: &Ray) -> Option<Hit> {
    let center = particles.center_at(index, ray.time);
    let radius = particles.radius(index);

    let (t, kind) = match intersect_sphere(ray, &center, radius) {
        SphereRoots::Miss => return None,
        SphereRoots::Tangent(t) => (t, HitKind::Tangent),
        SphereRoots::Crossing(t0, t1) => {
            if t0 >= 0.0 {
                (t0, HitKind::Entry)
            } else {
                (t1, HitKind::Exit)
            }
        }
    };

    if !in_range(t, ray) {
        return None;
    }

    Some(Hit {
        t,
        kind,
        index,
        particle_id: particles.id(index),
        center,
        radius_sq: radius * radius,
    })
}

pub fn sort_hits(hits: &mut HitList) {
    hits.sort_by(|a, b| {
        a.t.partial_cmp(&b.t)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.index.cmp(&b.index))
    });
}
