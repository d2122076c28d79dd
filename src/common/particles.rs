use super::bounds::Bounds3;
use super::math::rotation_from_euler;

/// Which instant of the exposure the stored positions describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterOffset {
    /// Positions are at shutter open, particles move along `+velocity`.
    Forward,
    /// Positions are mid exposure.
    Center,
    /// Positions are at shutter close.
    Backward,
}

impl ShutterOffset {
    fn velocity_fraction(self) -> f32 {
        match self {
            ShutterOffset::Forward => 0.0,
            ShutterOffset::Center => 0.5,
            ShutterOffset::Backward => 1.0,
        }
    }
}

/// Read-only particle arrays shared by the octree and the field evaluator.
///
/// Velocities are expressed as the displacement over the whole exposure, so a
/// particle is at `position + time * velocity` for a normalized ray time.
#[derive(Debug, Clone, Default)]
pub struct ParticleSet {
    positions: Vec<na::Point3<f32>>,
    radii: Vec<f32>,
    velocities: Vec<na::Vector3<f32>>,
    rotations: Vec<na::Vector3<f32>>,
    ids: Vec<u32>,
}

impl ParticleSet {
    /// An empty `radii` gives every particle a radius of 1. Mismatched array
    /// lengths are truncated to the shortest one.
    pub fn new(positions: Vec<na::Point3<f32>>, radii: Vec<f32>) -> Self {
        let radii = if radii.is_empty() {
            vec![1.0; positions.len()]
        } else {
            debug_assert_eq!(positions.len(), radii.len(), "positions and radii differ");
            radii
        };
        debug_assert!(radii.iter().all(|r| *r >= 0.0), "negative particle radius");

        let mut set = ParticleSet {
            positions,
            radii,
            velocities: Vec::new(),
            rotations: Vec::new(),
            ids: Vec::new(),
        };
        set.truncate_to_shortest();
        set
    }

    pub fn with_velocities(mut self, velocities: Vec<na::Vector3<f32>>) -> Self {
        debug_assert!(
            velocities.is_empty() || velocities.len() == self.positions.len(),
            "velocities and positions differ"
        );
        self.velocities = velocities;
        self.truncate_to_shortest();
        self
    }

    /// Euler XYZ angles in radians. Only tube primitives read these.
    pub fn with_rotations(mut self, rotations: Vec<na::Vector3<f32>>) -> Self {
        debug_assert!(
            rotations.is_empty() || rotations.len() == self.positions.len(),
            "rotations and positions differ"
        );
        self.rotations = rotations;
        self.truncate_to_shortest();
        self
    }

    pub fn with_ids(mut self, ids: Vec<u32>) -> Self {
        debug_assert!(
            ids.is_empty() || ids.len() == self.positions.len(),
            "ids and positions differ"
        );
        self.ids = ids;
        self.truncate_to_shortest();
        self
    }

    /// Converts per-second velocities into per-exposure displacements.
    pub fn with_frame_rate(mut self, frames_per_second: f32) -> Self {
        if frames_per_second > 0.0 {
            let inv = 1.0 / frames_per_second;
            for v in self.velocities.iter_mut() {
                *v *= inv;
            }
        }
        self
    }

    /// Rebases positions so that ray time 0 is shutter open.
    pub fn with_shutter_offset(mut self, offset: ShutterOffset) -> Self {
        let fraction = offset.velocity_fraction();
        if fraction != 0.0 {
            for (p, v) in self.positions.iter_mut().zip(self.velocities.iter()) {
                *p -= v * fraction;
            }
        }
        self
    }

    /// Applies an affine transform. Radii scale with the length of the
    /// transformed X basis vector.
    pub fn transformed(&self, m: &na::Affine3<f32>) -> Self {
        let scale = m.transform_vector(&na::Vector3::x()).norm();
        ParticleSet {
            positions: self.positions.iter().map(|p| m.transform_point(p)).collect(),
            radii: self.radii.iter().map(|r| r * scale).collect(),
            velocities: self
                .velocities
                .iter()
                .map(|v| m.transform_vector(v))
                .collect(),
            rotations: self.rotations.clone(),
            ids: self.ids.clone(),
        }
    }

    fn truncate_to_shortest(&mut self) {
        let mut n = self.positions.len().min(self.radii.len());
        for len in [self.velocities.len(), self.rotations.len(), self.ids.len()] {
            if len > 0 {
                n = n.min(len);
            }
        }
        self.positions.truncate(n);
        self.radii.truncate(n);
        self.velocities.truncate(n);
        self.rotations.truncate(n);
        self.ids.truncate(n);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn has_motion(&self) -> bool {
        !self.velocities.is_empty()
    }

    pub fn position(&self, index: usize) -> &na::Point3<f32> {
        &self.positions[index]
    }

    pub fn radius(&self, index: usize) -> f32 {
        self.radii[index]
    }

    pub fn velocity(&self, index: usize) -> na::Vector3<f32> {
        self.velocities
            .get(index)
            .copied()
            .unwrap_or_else(na::Vector3::zeros)
    }

    pub fn id(&self, index: usize) -> u32 {
        self.ids.get(index).copied().unwrap_or(index as u32)
    }

    pub fn rotation(&self, index: usize) -> na::Rotation3<f32> {
        self.rotations
            .get(index)
            .map(rotation_from_euler)
            .unwrap_or_else(na::Rotation3::identity)
    }

    pub fn center_at(&self, index: usize, time: f32) -> na::Point3<f32> {
        match self.velocities.get(index) {
            Some(v) => self.positions[index] + v * time,
            None => self.positions[index],
        }
    }

    /// Box covering the particle over the whole exposure.
    pub fn swept_bounds(&self, index: usize) -> Bounds3 {
        let r = self.radii[index];
        let start = Bounds3::around_sphere(&self.positions[index], r);
        if self.has_motion() {
            let end = Bounds3::around_sphere(&self.center_at(index, 1.0), r);
            Bounds3::union(&start, &end)
        } else {
            start
        }
    }

    /// Sphere used for octree placement: the motion midpoint, padded by half
    /// the travelled distance.
    pub fn placement_sphere(&self, index: usize) -> (na::Point3<f32>, f32) {
        let v = self.velocity(index);
        (
            self.positions[index] + v * 0.5,
            self.radii[index] + v.norm() * 0.5,
        )
    }
}
