#[derive(Clone, Debug)]
pub struct Ray {
    pub o: na::Point3<f32>,
    pub d: na::Vector3<f32>,
    /// Normalized shutter time in `[0, 1]` used to interpolate moving particles.
    pub time: f32,
    pub t_max: f32,
}

impl Ray {
    /// Builds a ray with a normalized direction. A non-positive `t_max` means
    /// the ray is unbounded.
    pub fn new(o: na::Point3<f32>, d: na::Vector3<f32>, time: f32, t_max: f32) -> Self {
        debug_assert!(d.norm_squared() > 0.0, "ray direction must be non-zero");
        Self {
            o,
            d: d.normalize(),
            time: time.clamp(0.0, 1.0),
            t_max: if t_max > 0.0 { t_max } else { f32::INFINITY },
        }
    }

    pub fn point_at(&self, t: f32) -> na::Point3<f32> {
        self.o + self.d * t
    }
}
