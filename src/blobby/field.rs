use std::ops::{AddAssign, SubAssign};

/// Per-particle falloff `c2 * (c0 d^4 + c1 d^2 + 1)`, i.e. `(1 - d^2/r^2)^2`
/// inside the radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeCoefficients {
    pub c0: f64,
    pub c1: f64,
    /// Strength; zero for particles that cannot contribute.
    pub c2: f64,
}

impl ShapeCoefficients {
    pub fn from_radius(radius: f32) -> Self {
        if radius <= 0.0 {
            return ShapeCoefficients {
                c0: 0.0,
                c1: 0.0,
                c2: 0.0,
            };
        }
        let r2 = radius as f64 * radius as f64;
        ShapeCoefficients {
            c0: 1.0 / (r2 * r2),
            c1: -2.0 / r2,
            c2: 1.0,
        }
    }

    /// Field value at squared distance `dist_sq` from the center.
    pub fn value(&self, dist_sq: f64) -> f64 {
        self.c2 * (dist_sq * (self.c0 * dist_sq + self.c1) + 1.0)
    }

    /// Scale applied to `p - center` to get the outward surface normal
    /// contribution; the negated field gradient.
    pub fn gradient_scale(&self, dist_sq: f64) -> f64 {
        -2.0 * self.c2 * (2.0 * self.c0 * dist_sq + self.c1)
    }
}

/// Quartic in the ray parameter, lowest degree first.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldCoefficients(pub [f64; 5]);

impl FieldCoefficients {
    /// Constant polynomial `-threshold`; roots of the accumulated sum are
    /// iso-surface crossings.
    pub fn threshold(threshold: f64) -> Self {
        FieldCoefficients([-threshold, 0.0, 0.0, 0.0, 0.0])
    }

    /// Spherical particle seen from `origin` along unit `dir`.
    pub fn sphere(
        shape: &ShapeCoefficients,
        origin: &na::Point3<f64>,
        dir: &na::Vector3<f64>,
        center: &na::Point3<f64>,
    ) -> Self {
        let v = origin - center;
        FieldCoefficients::from_distance_terms(shape, v.norm_squared(), v.dot(dir), 1.0)
    }

    /// Tube particle: only the distance from the local Z axis counts. Both
    /// `origin` and `dir` are in the particle's frame.
    pub fn tube(
        shape: &ShapeCoefficients,
        local_origin: &na::Point3<f64>,
        local_dir: &na::Vector3<f64>,
    ) -> Self {
        let o = local_origin;
        let d = local_dir;
        FieldCoefficients::from_distance_terms(
            shape,
            o.x * o.x + o.y * o.y,
            o.x * d.x + o.y * d.y,
            d.x * d.x + d.y * d.y,
        )
    }

    /// Expands `F(dist^2(t))` with `dist^2(t) = t2 t^2 + 2 t1 t + t0`.
    fn from_distance_terms(shape: &ShapeCoefficients, t0: f64, t1: f64, t2: f64) -> Self {
        let ShapeCoefficients { c0, c1, c2 } = *shape;
        FieldCoefficients([
            c2 * (t0 * (c0 * t0 + c1) + 1.0),
            c2 * (2.0 * t1 * (2.0 * c0 * t0 + c1)),
            c2 * (2.0 * c0 * (2.0 * t1 * t1 + t0 * t2) + c1 * t2),
            c2 * (4.0 * c0 * t1 * t2),
            c2 * (c0 * t2 * t2),
        ])
    }

    pub fn eval(&self, t: f64) -> f64 {
        crate::common::roots::eval_polynomial(&self.0, t)
    }
}

impl AddAssign for FieldCoefficients {
    fn add_assign(&mut self, other: Self) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += b;
        }
    }
}

impl SubAssign for FieldCoefficients {
    fn sub_assign(&mut self, other: Self) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a -= b;
        }
    }
}
