#[derive(Debug, Clone, Copy)]
pub struct TBounds3<T: na::RealField> {
    pub p_min: na::Point3<T>,
    pub p_max: na::Point3<T>,
}

pub fn min_p<T: na::RealField>(p1: &na::Point3<T>, p2: &na::Point3<T>) -> na::Point3<T> {
    na::Point3::new(
        na::RealField::min(p1.x.clone(), p2.x.clone()),
        na::RealField::min(p1.y.clone(), p2.y.clone()),
        na::RealField::min(p1.z.clone(), p2.z.clone()),
    )
}

pub fn max_p<T: na::RealField>(p1: &na::Point3<T>, p2: &na::Point3<T>) -> na::Point3<T> {
    na::Point3::new(
        na::RealField::max(p1.x.clone(), p2.x.clone()),
        na::RealField::max(p1.y.clone(), p2.y.clone()),
        na::RealField::max(p1.z.clone(), p2.z.clone()),
    )
}

impl<T: na::RealField> TBounds3<T> {
    pub fn new(p1: na::Point3<T>, p2: na::Point3<T>) -> Self {
        TBounds3 {
            p_min: min_p(&p1, &p2),
            p_max: max_p(&p1, &p2),
        }
    }

    pub fn union(b1: &TBounds3<T>, b2: &TBounds3<T>) -> TBounds3<T> {
        TBounds3 {
            p_min: min_p(&b1.p_min, &b2.p_min),
            p_max: max_p(&b1.p_max, &b2.p_max),
        }
    }

    pub fn diagonal(&self) -> na::Vector3<T> {
        &self.p_max - &self.p_min
    }
}

pub type Bounds3 = TBounds3<f32>;

impl Bounds3 {
    /// Box around a sphere.
    pub fn around_sphere(center: &na::Point3<f32>, radius: f32) -> Self {
        let r = na::Vector3::repeat(radius.abs());
        Bounds3 {
            p_min: center - r,
            p_max: center + r,
        }
    }
}

/// Axis aligned box stored as a center and full per-axis extents, the way
/// octree nodes describe their cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    pub center: na::Point3<f32>,
    pub size: na::Vector3<f32>,
}

impl BoundingVolume {
    pub fn new(center: na::Point3<f32>, size: na::Vector3<f32>) -> Self {
        BoundingVolume { center, size }
    }

    pub fn empty() -> Self {
        BoundingVolume {
            center: na::Point3::origin(),
            size: na::Vector3::zeros(),
        }
    }

    pub fn half_size(&self) -> na::Vector3<f32> {
        self.size * 0.5
    }

    pub fn min(&self) -> na::Point3<f32> {
        self.center - self.half_size()
    }

    pub fn max(&self) -> na::Point3<f32> {
        self.center + self.half_size()
    }

    pub fn contains(&self, p: &na::Point3<f32>) -> bool {
        let b_min = self.min();
        let b_max = self.max();
        (0..3).all(|i| p[i] >= b_min[i] && p[i] <= b_max[i])
    }

    /// Center of octant `child` (bit 4: +x, bit 2: +y, bit 1: +z).
    pub fn octant_center(&self, child: usize) -> na::Point3<f32> {
        let quarter = self.size * 0.25;
        let sign = |bit: usize| if child & bit != 0 { 1.0 } else { -1.0 };
        na::Point3::new(
            self.center.x + sign(4) * quarter.x,
            self.center.y + sign(2) * quarter.y,
            self.center.z + sign(1) * quarter.z,
        )
    }

    pub fn octant(&self, child: usize) -> BoundingVolume {
        BoundingVolume {
            center: self.octant_center(child),
            size: self.size * 0.5,
        }
    }

    /// Squared distance from `p` to the closest point of the box.
    pub fn distance_squared(&self, p: &na::Point3<f32>) -> f32 {
        let b_min = self.min();
        let b_max = self.max();
        let mut d_min = 0.0;
        for i in 0..3 {
            if p[i] < b_min[i] {
                let t = p[i] - b_min[i];
                d_min += t * t;
            } else if p[i] > b_max[i] {
                let t = p[i] - b_max[i];
                d_min += t * t;
            }
        }
        d_min
    }

    pub fn overlaps_sphere(&self, center: &na::Point3<f32>, radius: f32) -> bool {
        self.distance_squared(center) <= radius * radius
    }
}

impl From<Bounds3> for BoundingVolume {
    fn from(b: Bounds3) -> Self {
        BoundingVolume {
            center: na::center(&b.p_min, &b.p_max),
            size: b.diagonal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_from_center_size() {
        let b = BoundingVolume::new(
            na::Point3::new(1.0, 2.0, 3.0),
            na::Vector3::new(2.0, 4.0, 6.0),
        );
        assert_eq!(b.min(), na::Point3::new(0.0, 0.0, 0.0));
        assert_eq!(b.max(), na::Point3::new(2.0, 4.0, 6.0));
        assert!(b.contains(&na::Point3::new(2.0, 4.0, 6.0)));
        assert!(!b.contains(&na::Point3::new(2.1, 4.0, 6.0)));
    }

    #[test]
    fn test_octants_tile_parent() {
        let b = BoundingVolume::new(na::Point3::origin(), na::Vector3::new(4.0, 4.0, 4.0));
        assert_eq!(b.octant(0).min(), na::Point3::new(-2.0, -2.0, -2.0));
        assert_eq!(b.octant(7).max(), na::Point3::new(2.0, 2.0, 2.0));
        assert_eq!(b.octant_center(4), na::Point3::new(1.0, -1.0, -1.0));
        assert_eq!(b.octant_center(2), na::Point3::new(-1.0, 1.0, -1.0));
        assert_eq!(b.octant_center(1), na::Point3::new(-1.0, -1.0, 1.0));
        for child in 0..8 {
            assert_eq!(b.octant(child).size, na::Vector3::new(2.0, 2.0, 2.0));
        }
    }

    #[test]
    fn test_sphere_overlap() {
        let b = BoundingVolume::new(na::Point3::origin(), na::Vector3::new(2.0, 2.0, 2.0));
        assert!(b.overlaps_sphere(&na::Point3::new(1.5, 0.0, 0.0), 0.5));
        assert!(!b.overlaps_sphere(&na::Point3::new(1.5, 1.5, 0.0), 0.5));
        assert!(b.overlaps_sphere(&na::Point3::new(0.0, 0.0, 0.0), 0.0));
    }

    #[test]
    fn test_from_bounds() {
        let b: BoundingVolume = Bounds3::new(
            na::Point3::new(-1.0, 0.0, 2.0),
            na::Point3::new(3.0, 2.0, -2.0),
        )
        .into();
        approx::assert_relative_eq!(b.center, na::Point3::new(1.0, 1.0, 0.0));
        approx::assert_relative_eq!(b.size, na::Vector3::new(4.0, 2.0, 4.0));
    }
}
