//! Sparse octree over a set of (possibly moving) spherical particles.
//!
//! Interior nodes own up to eight children; leaves hold indices into the
//! shared [`ParticleSet`]. A particle is stored in every leaf whose box its
//! bounding sphere overlaps, so queries must deduplicate per particle.

mod builder;
pub mod leaf;
mod traversal;

pub use builder::OctreeBuilder;
pub use leaf::{Hit, HitKind, HitList, SphereHit};

use crate::blobby::field::ShapeCoefficients;
use crate::common::{BoundingVolume, ParticleSet};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_MAX_LEAF_SIZE: usize = 20;
pub const DEFAULT_MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OctreeConfig {
    pub max_leaf_size: usize,
    pub max_depth: usize,
}

impl OctreeConfig {
    /// Zero values fall back to the defaults.
    pub fn new(max_leaf_size: usize, max_depth: usize) -> Self {
        OctreeConfig {
            max_leaf_size: if max_leaf_size > 0 {
                max_leaf_size
            } else {
                DEFAULT_MAX_LEAF_SIZE
            },
            max_depth: if max_depth > 0 {
                max_depth
            } else {
                DEFAULT_MAX_DEPTH
            },
        }
    }
}

impl Default for OctreeConfig {
    fn default() -> Self {
        OctreeConfig::new(DEFAULT_MAX_LEAF_SIZE, DEFAULT_MAX_DEPTH)
    }
}

pub type NodeId = usize;

#[derive(Debug)]
pub enum OctreeNode {
    Interior {
        bounds: BoundingVolume,
        children: [Option<NodeId>; 8],
    },
    Leaf {
        bounds: BoundingVolume,
        particles: Box<[u32]>,
    },
}

impl OctreeNode {
    pub fn bounds(&self) -> &BoundingVolume {
        match self {
            OctreeNode::Interior { bounds, .. } => bounds,
            OctreeNode::Leaf { bounds, .. } => bounds,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    pub interior_nodes: usize,
    pub leaf_nodes: usize,
    /// Sum of leaf sizes; particles straddling cells count more than once.
    pub leaf_entries: usize,
    pub max_level: usize,
}

/// Spatial index handle. Immutable once built and safe to query from many
/// threads at once.
pub struct ParticleOctree {
    log: slog::Logger,
    particles: Arc<ParticleSet>,
    shapes: Vec<ShapeCoefficients>,
    nodes: Vec<OctreeNode>,
    root: Option<NodeId>,
    bounds: BoundingVolume,
    config: OctreeConfig,
    stats: OctreeStats,
}

impl ParticleOctree {
    pub fn new(log: &slog::Logger, particles: Arc<ParticleSet>, config: OctreeConfig) -> Self {
        let log = log.new(o!("module" => "octree"));
        let start = Instant::now();

        let shapes = (0..particles.len())
            .map(|i| ShapeCoefficients::from_radius(particles.radius(i)))
            .collect();
        let built = OctreeBuilder::new(&particles, config).build();

        let duration = start.elapsed();
        debug!(log, "octree took {:?} to construct", duration);
        info!(
            log,
            "octree over {} particles: {} interior nodes, {} leaves, {} leaf entries, depth {}",
            particles.len(),
            built.stats.interior_nodes,
            built.stats.leaf_nodes,
            built.stats.leaf_entries,
            built.stats.max_level,
        );

        ParticleOctree {
            log,
            particles,
            shapes,
            nodes: built.nodes,
            root: built.root,
            bounds: built.bounds,
            config,
            stats: built.stats,
        }
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub(crate) fn shape(&self, index: usize) -> &ShapeCoefficients {
        &self.shapes[index]
    }

    pub fn bounds(&self) -> &BoundingVolume {
        &self.bounds
    }

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    pub fn stats(&self) -> &OctreeStats {
        &self.stats
    }

    pub fn root(&self) -> Option<&OctreeNode> {
        self.root.map(|id| &self.nodes[id])
    }

    pub fn node(&self, id: NodeId) -> &OctreeNode {
        &self.nodes[id]
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

/// Builds an index from raw particle arrays. Empty `radii` means unit radii
/// and empty `velocities` means static particles. Arrays of differing
/// lengths are truncated to the shortest with a warning.
pub fn build_index(
    log: &slog::Logger,
    mut positions: Vec<na::Point3<f32>>,
    mut radii: Vec<f32>,
    mut velocities: Vec<na::Vector3<f32>>,
    config: OctreeConfig,
) -> ParticleOctree {
    let n = [radii.len(), velocities.len()]
        .iter()
        .filter(|len| **len > 0)
        .fold(positions.len(), |n, len| n.min(*len));
    if positions.len() != n
        || (!radii.is_empty() && radii.len() != n)
        || (!velocities.is_empty() && velocities.len() != n)
    {
        warn!(
            log,
            "particle arrays differ in length, truncating";
            "positions" => positions.len(),
            "radii" => radii.len(),
            "velocities" => velocities.len(),
        );
        positions.truncate(n);
        radii.truncate(n);
        velocities.truncate(n);
    }

    let particles = ParticleSet::new(positions, radii).with_velocities(velocities);
    ParticleOctree::new(log, Arc::new(particles), config)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::Ray;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Mutex;

    pub fn test_logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, o!())
    }

    pub fn random_particles(rng: &mut SmallRng, n: usize, moving: bool) -> ParticleSet {
        let positions = (0..n)
            .map(|_| {
                na::Point3::new(
                    rng.gen_range(-10.0, 10.0),
                    rng.gen_range(-10.0, 10.0),
                    rng.gen_range(-10.0, 10.0),
                )
            })
            .collect();
        let radii = (0..n).map(|_| rng.gen_range(0.1, 1.5)).collect();
        let set = ParticleSet::new(positions, radii);
        if moving {
            let velocities = (0..n)
                .map(|_| {
                    na::Vector3::new(
                        rng.gen_range(-2.0, 2.0),
                        rng.gen_range(-2.0, 2.0),
                        rng.gen_range(-2.0, 2.0),
                    )
                })
                .collect();
            set.with_velocities(velocities)
        } else {
            set
        }
    }

    pub fn random_ray(rng: &mut SmallRng) -> Ray {
        let o = na::Point3::new(
            rng.gen_range(-15.0, 15.0),
            rng.gen_range(-15.0, 15.0),
            rng.gen_range(-15.0, 15.0),
        );
        let target = na::Point3::new(
            rng.gen_range(-8.0, 8.0),
            rng.gen_range(-8.0, 8.0),
            rng.gen_range(-8.0, 8.0),
        );
        let mut d = target - o;
        // exercise the axis-parallel paths of the traversal
        match rng.gen_range(0, 4) {
            0 => d.x = 0.0,
            1 => {
                d.y = 0.0;
                d.z = 0.0;
            }
            _ => {}
        }
        if d.norm_squared() == 0.0 {
            d = na::Vector3::new(0.0, 0.0, 1.0);
        }
        Ray::new(o, d, rng.gen_range(0.0, 1.0), 0.0)
    }

    fn count_leaf_depths(
        octree: &ParticleOctree,
        id: NodeId,
        level: usize,
        out: &mut Vec<(usize, usize)>,
    ) {
        match octree.node(id) {
            OctreeNode::Interior { children, .. } => {
                for child in children.iter().flatten() {
                    count_leaf_depths(octree, *child, level + 1, out);
                }
            }
            OctreeNode::Leaf { particles, .. } => out.push((level, particles.len())),
        }
    }

    #[test]
    fn test_config_defaults() {
        assert_eq!(OctreeConfig::new(0, 0), OctreeConfig::default());
        assert_eq!(OctreeConfig::default().max_leaf_size, 20);
        assert_eq!(OctreeConfig::default().max_depth, 8);
        assert_eq!(OctreeConfig::new(4, 0).max_depth, 8);
    }

    #[test]
    fn test_empty_set() {
        let octree = build_index(&test_logger(), vec![], vec![], vec![], OctreeConfig::default());
        assert!(octree.is_empty());
        assert_eq!(octree.stats().leaf_nodes, 0);
    }

    #[test]
    fn test_single_particle_root_is_interior() {
        let octree = build_index(
            &test_logger(),
            vec![na::Point3::origin()],
            vec![1.0],
            vec![],
            OctreeConfig::default(),
        );
        assert!(matches!(octree.root(), Some(OctreeNode::Interior { .. })));
        assert_eq!(octree.stats().interior_nodes, 1);
        assert_eq!(octree.stats().leaf_nodes, 8);
        approx::assert_relative_eq!(octree.bounds().size, na::Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_depth_and_leaf_size_limits() {
        let mut rng = SmallRng::seed_from_u64(7);
        let particles = random_particles(&mut rng, 2000, false);
        let config = OctreeConfig::new(4, 5);
        let octree = ParticleOctree::new(&test_logger(), Arc::new(particles), config);

        let mut leaves = vec![];
        count_leaf_depths(&octree, octree.root.unwrap(), 0, &mut leaves);
        assert_eq!(leaves.len(), octree.stats().leaf_nodes);
        assert!(leaves.iter().all(|(level, _)| *level <= config.max_depth));
        assert!(octree.stats().max_level <= config.max_depth);
        assert_eq!(
            leaves.iter().map(|(_, n)| *n).sum::<usize>(),
            octree.stats().leaf_entries
        );
        // small leaves stopped on size, deep leaves may exceed it
        assert!(leaves
            .iter()
            .any(|(level, n)| *level < config.max_depth && *n <= config.max_leaf_size));
    }

    #[test]
    fn test_every_particle_is_stored() {
        let mut rng = SmallRng::seed_from_u64(11);
        let particles = random_particles(&mut rng, 500, true);
        let n = particles.len();
        let octree =
            ParticleOctree::new(&test_logger(), Arc::new(particles), OctreeConfig::new(6, 6));

        let mut seen = vec![false; n];
        for node in octree.nodes.iter() {
            if let OctreeNode::Leaf { particles, .. } = node {
                for i in particles.iter() {
                    seen[*i as usize] = true;
                }
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    struct CaptureDrain(Arc<Mutex<Vec<(slog::Level, String)>>>);

    impl slog::Drain for CaptureDrain {
        type Ok = ();
        type Err = slog::Never;

        fn log(&self, record: &slog::Record, _: &slog::OwnedKVList) -> Result<(), slog::Never> {
            self.0
                .lock()
                .unwrap()
                .push((record.level(), record.msg().to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_mismatched_arrays_truncate() {
        let records = Arc::new(Mutex::new(vec![]));
        let log = slog::Logger::root(CaptureDrain(records.clone()), o!());

        let octree = build_index(
            &log,
            vec![na::Point3::origin(); 3],
            vec![1.0, 1.0],
            vec![na::Vector3::zeros(); 4],
            OctreeConfig::default(),
        );
        assert_eq!(octree.particles().len(), 2);
        assert!(octree.particles().has_motion());
        assert!(records
            .lock()
            .unwrap()
            .iter()
            .any(|(level, msg)| *level == slog::Level::Warning && msg.contains("truncating")));

        let octree = build_index(
            &test_logger(),
            vec![na::Point3::origin(); 3],
            vec![],
            vec![na::Vector3::zeros()],
            OctreeConfig::default(),
        );
        assert_eq!(octree.particles().len(), 1);
    }

    #[test]
    fn test_matching_arrays_do_not_warn() {
        let records = Arc::new(Mutex::new(vec![]));
        let log = slog::Logger::root(CaptureDrain(records.clone()), o!());
        build_index(
            &log,
            vec![na::Point3::origin(); 3],
            vec![],
            vec![],
            OctreeConfig::default(),
        );
        assert!(records
            .lock()
            .unwrap()
            .iter()
            .all(|(level, _)| *level != slog::Level::Warning));
    }

    #[test]
    fn test_octree_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ParticleOctree>();
    }
}
