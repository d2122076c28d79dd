//! Parametric top-down traversal (Revelles, Urena and Lastra 2000).
//!
//! Negative direction components are mirrored about the root center and
//! recorded in a mask, so the child ordering tables below only ever handle
//! non-negative directions. The real child is `children[node ^ mask]`.

use super::leaf::{
    collect_particle_hits, nearest_particle_hit, sort_hits, Hit, HitList, SphereHit,
};
use super::{NodeId, OctreeNode, ParticleOctree};
use crate::common::{ParticleSet, Ray};

/// Stand-in for `±inf` on axes the ray runs parallel to.
const PARALLEL_T: f64 = 1e30;

/// Receives the leaves crossed by a ray, roughly front to back.
pub trait LeafVisitor {
    /// `true` if a subtree entered at `t_enter` cannot contribute anything.
    fn skip(&self, t_enter: f64) -> bool;
    fn visit_leaf(&mut self, particles: &ParticleSet, leaf: &[u32]);
}

/// Gathers the particles of every crossed leaf. A particle may sit in many
/// leaves, so the list is deduplicated before any sphere is intersected.
struct AllHitsVisitor<'r> {
    ray: &'r Ray,
    candidates: Vec<u32>,
}

impl<'r> LeafVisitor for AllHitsVisitor<'r> {
    fn skip(&self, t_enter: f64) -> bool {
        t_enter > self.ray.t_max as f64
    }

    fn visit_leaf(&mut self, _particles: &ParticleSet, leaf: &[u32]) {
        self.candidates.extend_from_slice(leaf);
    }
}

struct NearestHitVisitor<'r> {
    ray: &'r Ray,
    best: Option<Hit>,
}

impl<'r> LeafVisitor for NearestHitVisitor<'r> {
    fn skip(&self, t_enter: f64) -> bool {
        match &self.best {
            Some(best) => t_enter > best.t as f64,
            None => t_enter > self.ray.t_max as f64,
        }
    }

    fn visit_leaf(&mut self, particles: &ParticleSet, leaf: &[u32]) {
        for &index in leaf {
            if let Some(hit) = nearest_particle_hit(particles, index as usize, self.ray) {
                let closer = match &self.best {
                    Some(best) => hit.t < best.t || (hit.t == best.t && hit.index < best.index),
                    None => true,
                };
                if closer {
                    self.best = Some(hit);
                }
            }
        }
    }
}

/// Ray mirrored into the all-positive octant of the root.
struct MirroredRay {
    o: na::Point3<f64>,
    d: na::Vector3<f64>,
    mask: usize,
}

impl MirroredRay {
    fn new(ray: &Ray, root_center: &na::Point3<f32>) -> Self {
        let mut o: na::Point3<f64> = na::convert(ray.o);
        let mut d: na::Vector3<f64> = na::convert(ray.d);
        let mut mask = 0;

        for (axis, bit) in [(0, 4), (1, 2), (2, 1)] {
            if d[axis] < 0.0 {
                o[axis] = 2.0 * root_center[axis] as f64 - o[axis];
                d[axis] = -d[axis];
                mask |= bit;
            }
        }

        MirroredRay { o, d, mask }
    }
}

fn first_node(t0: &na::Vector3<f64>, tm: &na::Vector3<f64>) -> usize {
    let mut node = 0;
    if t0.x > t0.y {
        if t0.x > t0.z {
            // entry through the YZ plane
            if tm.y < t0.x {
                node |= 2;
            }
            if tm.z < t0.x {
                node |= 1;
            }
            return node;
        }
    } else if t0.y > t0.z {
        // XZ plane
        if tm.x < t0.y {
            node |= 4;
        }
        if tm.z < t0.y {
            node |= 1;
        }
        return node;
    }

    // XY plane
    if tm.x < t0.z {
        node |= 4;
    }
    if tm.y < t0.z {
        node |= 2;
    }
    node
}

fn next_node(tx: f64, nx: usize, ty: f64, ny: usize, tz: f64, nz: usize) -> usize {
    if tx < ty {
        if tx < tz {
            return nx;
        }
    } else if ty < tz {
        return ny;
    }
    nz
}

impl ParticleOctree {
    /// Every entry, exit and tangent point along the ray within
    /// `[0, ray.t_max]`, sorted by distance.
    pub fn query_all_hits(&self, ray: &Ray) -> HitList {
        let mut visitor = AllHitsVisitor {
            ray,
            candidates: Vec::new(),
        };
        self.traverse(ray, &mut visitor);

        let mut candidates = visitor.candidates;
        candidates.sort_unstable();
        candidates.dedup();

        let mut hits = HitList::with_capacity(2 * candidates.len());
        for index in candidates {
            collect_particle_hits(&self.particles, index as usize, ray, &mut hits);
        }
        sort_hits(&mut hits);
        trace!(self.log, "ray {:?} produced {} hits", ray.o, hits.len());
        hits
    }

    /// The closest boundary crossing along the ray, if any.
    pub fn query_nearest_hit(&self, ray: &Ray) -> Option<SphereHit> {
        let mut visitor = NearestHitVisitor { ray, best: None };
        self.traverse(ray, &mut visitor);
        visitor.best.map(|hit| SphereHit::new(ray, hit))
    }

    pub fn traverse<V: LeafVisitor>(&self, ray: &Ray, visitor: &mut V) {
        let root = match self.root {
            Some(root) => root,
            None => return,
        };

        let mirrored = MirroredRay::new(ray, &self.bounds.center);
        let b_min = self.bounds.min();
        let b_max = self.bounds.max();

        let mut t0 = na::Vector3::zeros();
        let mut t1 = na::Vector3::zeros();
        for axis in 0..3 {
            let lo = b_min[axis] as f64 - mirrored.o[axis];
            let hi = b_max[axis] as f64 - mirrored.o[axis];
            if mirrored.d[axis] == 0.0 {
                t0[axis] = if lo > 0.0 { PARALLEL_T } else { -PARALLEL_T };
                t1[axis] = if hi >= 0.0 { PARALLEL_T } else { -PARALLEL_T };
            } else {
                let inv = 1.0 / mirrored.d[axis];
                t0[axis] = lo * inv;
                t1[axis] = hi * inv;
            }
        }

        if t0.max() <= t1.min() {
            self.process_subtree(root, &t0, &t1, &mirrored, visitor);
        }
    }

    fn process_subtree<V: LeafVisitor>(
        &self,
        id: NodeId,
        t0: &na::Vector3<f64>,
        t1: &na::Vector3<f64>,
        ray: &MirroredRay,
        visitor: &mut V,
    ) {
        if t1.x < 0.0 || t1.y < 0.0 || t1.z < 0.0 {
            return;
        }
        if visitor.skip(t0.max()) {
            return;
        }

        let (bounds, children) = match &self.nodes[id] {
            OctreeNode::Leaf { particles, .. } => {
                visitor.visit_leaf(&self.particles, particles);
                return;
            }
            OctreeNode::Interior { bounds, children } => (bounds, children),
        };

        let mut tm = na::Vector3::zeros();
        for axis in 0..3 {
            // parallel axes are never mirrored, so the unmirrored center applies
            tm[axis] = if ray.d[axis] == 0.0 {
                if ray.o[axis] > bounds.center[axis] as f64 {
                    -PARALLEL_T
                } else {
                    PARALLEL_T
                }
            } else {
                0.5 * (t0[axis] + t1[axis])
            };
        }

        let mut node = first_node(t0, &tm);
        while node < 8 {
            let (c0, c1, next) = match node {
                0 => (
                    na::Vector3::new(t0.x, t0.y, t0.z),
                    na::Vector3::new(tm.x, tm.y, tm.z),
                    next_node(tm.x, 4, tm.y, 2, tm.z, 1),
                ),
                1 => (
                    na::Vector3::new(t0.x, t0.y, tm.z),
                    na::Vector3::new(tm.x, tm.y, t1.z),
                    next_node(tm.x, 5, tm.y, 3, t1.z, 8),
                ),
                2 => (
                    na::Vector3::new(t0.x, tm.y, t0.z),
                    na::Vector3::new(tm.x, t1.y, tm.z),
                    next_node(tm.x, 6, t1.y, 8, tm.z, 3),
                ),
                3 => (
                    na::Vector3::new(t0.x, tm.y, tm.z),
                    na::Vector3::new(tm.x, t1.y, t1.z),
                    next_node(tm.x, 7, t1.y, 8, t1.z, 8),
                ),
                4 => (
                    na::Vector3::new(tm.x, t0.y, t0.z),
                    na::Vector3::new(t1.x, tm.y, tm.z),
                    next_node(t1.x, 8, tm.y, 6, tm.z, 5),
                ),
                5 => (
                    na::Vector3::new(tm.x, t0.y, tm.z),
                    na::Vector3::new(t1.x, tm.y, t1.z),
                    next_node(t1.x, 8, tm.y, 7, t1.z, 8),
                ),
                6 => (
                    na::Vector3::new(tm.x, tm.y, t0.z),
                    na::Vector3::new(t1.x, t1.y, tm.z),
                    next_node(t1.x, 8, t1.y, 8, tm.z, 7),
                ),
                _ => (
                    na::Vector3::new(tm.x, tm.y, tm.z),
                    na::Vector3::new(t1.x, t1.y, t1.z),
                    8,
                ),
            };

            if let Some(child) = children[node ^ ray.mask] {
                self.process_subtree(child, &c0, &c1, ray, visitor);
            }
            node = next;
        }
    }
}
