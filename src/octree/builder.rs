use super::{NodeId, OctreeConfig, OctreeNode, OctreeStats};
use crate::common::{Bounds3, BoundingVolume, ParticleSet};

#[derive(Debug, Default)]
struct ChildBucket {
    particles: Vec<u32>,
    /// A particle centered outside the cell is larger than the cell itself;
    /// splitting further would only duplicate it.
    has_big: bool,
}

pub struct BuiltOctree {
    pub nodes: Vec<OctreeNode>,
    pub root: Option<NodeId>,
    pub bounds: BoundingVolume,
    pub stats: OctreeStats,
}

/// Recursive top-down construction into a flat node arena.
pub struct OctreeBuilder<'a> {
    particles: &'a ParticleSet,
    config: OctreeConfig,
    nodes: Vec<OctreeNode>,
    stats: OctreeStats,
}

impl<'a> OctreeBuilder<'a> {
    pub fn new(particles: &'a ParticleSet, config: OctreeConfig) -> Self {
        OctreeBuilder {
            particles,
            config,
            nodes: Vec::new(),
            stats: OctreeStats::default(),
        }
    }

    pub fn build(mut self) -> BuiltOctree {
        if self.particles.is_empty() {
            return BuiltOctree {
                nodes: self.nodes,
                root: None,
                bounds: BoundingVolume::empty(),
                stats: self.stats,
            };
        }

        let bounds = self.root_bounds();
        let all: Vec<u32> = (0..self.particles.len() as u32).collect();
        let root = self.build_interior(0, bounds, &all);

        BuiltOctree {
            nodes: self.nodes,
            root: Some(root),
            bounds,
            stats: self.stats,
        }
    }

    /// Union of every particle's box at shutter open and close.
    pub fn root_bounds(&self) -> BoundingVolume {
        let mut bounds = self.particles.swept_bounds(0);
        for i in 1..self.particles.len() {
            bounds = Bounds3::union(&bounds, &self.particles.swept_bounds(i));
        }
        bounds.into()
    }

    fn subdivide(&self, bounds: &BoundingVolume, particles: &[u32]) -> [ChildBucket; 8] {
        let mut buckets: [ChildBucket; 8] = Default::default();

        for (child, bucket) in buckets.iter_mut().enumerate() {
            let child_bounds = bounds.octant(child);
            let half = child_bounds.half_size();

            for &index in particles {
                let (center, radius) = self.particles.placement_sphere(index as usize);
                if !child_bounds.overlaps_sphere(&center, radius) {
                    continue;
                }

                bucket.particles.push(index);
                if !child_bounds.contains(&center)
                    && radius > half.x
                    && radius > half.y
                    && radius > half.z
                {
                    bucket.has_big = true;
                }
            }
        }

        buckets
    }

    fn build_interior(
        &mut self,
        level: usize,
        bounds: BoundingVolume,
        particles: &[u32],
    ) -> NodeId {
        let buckets = self.subdivide(&bounds, particles);
        let mut children = [None; 8];

        for (child, bucket) in buckets.iter().enumerate() {
            if bucket.particles.is_empty() {
                continue;
            }

            let child_level = level + 1;
            let child_bounds = bounds.octant(child);
            let id = if bucket.particles.len() <= self.config.max_leaf_size
                || child_level >= self.config.max_depth
                || bucket.has_big
            {
                self.push_leaf(child_level, child_bounds, &bucket.particles)
            } else {
                self.build_interior(child_level, child_bounds, &bucket.particles)
            };
            children[child] = Some(id);
        }

        self.stats.interior_nodes += 1;
        self.stats.max_level = self.stats.max_level.max(level);
        self.nodes.push(OctreeNode::Interior { bounds, children });
        self.nodes.len() - 1
    }

    fn push_leaf(&mut self, level: usize, bounds: BoundingVolume, particles: &[u32]) -> NodeId {
        self.stats.leaf_nodes += 1;
        self.stats.leaf_entries += particles.len();
        self.stats.max_level = self.stats.max_level.max(level);
        self.nodes.push(OctreeNode::Leaf {
            bounds,
            particles: particles.into(),
        });
        self.nodes.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_root_bounds_cover_motion() {
        let set = ParticleSet::new(
            vec![na::Point3::new(0.0, 0.0, 0.0), na::Point3::new(4.0, 0.0, 0.0)],
            vec![1.0, 0.5],
        )
        .with_velocities(vec![na::Vector3::new(0.0, 3.0, 0.0), na::Vector3::zeros()]);
        let bounds = OctreeBuilder::new(&set, OctreeConfig::default()).root_bounds();
        assert_relative_eq!(bounds.min(), na::Point3::new(-1.0, -1.0, -1.0));
        assert_relative_eq!(bounds.max(), na::Point3::new(4.5, 4.0, 1.0));
    }

    #[test]
    fn test_straddling_particle_lands_in_both_children() {
        let set = ParticleSet::new(
            vec![
                na::Point3::new(-4.0, -4.0, -4.0),
                na::Point3::new(4.0, 4.0, 4.0),
                na::Point3::new(0.0, -3.0, -3.0),
            ],
            vec![1.0, 1.0, 0.5],
        );
        let builder = OctreeBuilder::new(&set, OctreeConfig::default());
        let bounds = builder.root_bounds();
        let buckets = builder.subdivide(&bounds, &[0, 1, 2]);

        assert_eq!(buckets[0].particles, vec![0, 2]);
        assert_eq!(buckets[4].particles, vec![2]);
        assert_eq!(buckets[7].particles, vec![1]);
        assert!(buckets[1].particles.is_empty());
        assert!(buckets.iter().all(|b| !b.has_big));
    }

    #[test]
    fn test_big_particle_stops_recursion() {
        let mut positions = vec![na::Point3::new(0.0, 0.0, 0.0)];
        let mut radii = vec![6.0];
        for i in 0..30 {
            positions.push(na::Point3::new(-5.0 + 0.01 * i as f32, -5.0, -5.0));
            radii.push(0.1);
        }
        let set = ParticleSet::new(positions, radii);
        let builder = OctreeBuilder::new(&set, OctreeConfig::new(2, 8));
        let bounds = builder.root_bounds();
        let buckets = builder.subdivide(&bounds, &(0..31).collect::<Vec<u32>>());
        // the big particle's center sits on the shared corner of every child
        assert!(buckets.iter().all(|b| !b.has_big));

        let grandchild = bounds.octant(0).octant(7);
        let sub = builder.subdivide(&bounds.octant(0), &buckets[0].particles);
        assert!(sub[7].particles.contains(&0));
        assert!(grandchild.contains(&na::Point3::origin()));

        let far_child = bounds.octant(0).octant(0);
        assert!(!far_child.contains(&na::Point3::origin()));
        assert!(sub[0].particles.contains(&0));
        assert!(sub[0].has_big);
    }

    #[test]
    fn test_stats_track_arena() {
        let set = ParticleSet::new(
            (0..50)
                .map(|i| na::Point3::new(i as f32, (i % 7) as f32, (i % 3) as f32))
                .collect(),
            vec![0.3; 50],
        );
        let built = OctreeBuilder::new(&set, OctreeConfig::new(3, 6)).build();
        assert_eq!(
            built.nodes.len(),
            built.stats.interior_nodes + built.stats.leaf_nodes
        );
        assert_eq!(built.root, Some(built.nodes.len() - 1));
        assert!(built.stats.leaf_entries >= 50);
        assert!(built.stats.max_level <= 6);
    }
}
