/// Flips `n` so that it lies in the same hemisphere as `v`.
pub fn face_forward(n: &na::Vector3<f32>, v: &na::Vector3<f32>) -> na::Vector3<f32> {
    if n.dot(v) < 0.0 {
        -n
    } else {
        *n
    }
}

/// Rotation built from XYZ euler angles in radians, applied X first.
pub fn rotation_from_euler(angles: &na::Vector3<f32>) -> na::Rotation3<f32> {
    na::Rotation3::from_axis_angle(&na::Vector3::z_axis(), angles.z)
        * na::Rotation3::from_axis_angle(&na::Vector3::y_axis(), angles.y)
        * na::Rotation3::from_axis_angle(&na::Vector3::x_axis(), angles.x)
}

pub fn to_f64(p: &na::Point3<f32>) -> na::Point3<f64> {
    na::convert(*p)
}

pub fn vec_to_f64(v: &na::Vector3<f32>) -> na::Vector3<f64> {
    na::convert(*v)
}

pub fn to_f32(p: &na::Point3<f64>) -> na::Point3<f32> {
    p.map(|x| x as f32)
}

pub fn vec_to_f32(v: &na::Vector3<f64>) -> na::Vector3<f32> {
    v.map(|x| x as f32)
}

pub fn gamma_correct(value: f32) -> f32 {
    if value <= 0.0031308f32 {
        return 12.92 * value;
    }

    1.055 * value.powf(1.0 / 2.4) - 0.055
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_face_forward() {
        let n = na::Vector3::new(0.0, 0.0, 1.0);
        assert_eq!(face_forward(&n, &na::Vector3::new(0.0, 1.0, -1.0)), -n);
        assert_eq!(face_forward(&n, &na::Vector3::new(1.0, 0.0, 0.5)), n);
    }

    #[test]
    fn test_rotation_from_euler() {
        let r = rotation_from_euler(&na::Vector3::new(std::f32::consts::FRAC_PI_2, 0.0, 0.0));
        assert_relative_eq!(
            r * na::Vector3::z(),
            na::Vector3::new(0.0, -1.0, 0.0),
            epsilon = 1e-6
        );

        let r = rotation_from_euler(&na::Vector3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        assert_relative_eq!(
            r * na::Vector3::z(),
            na::Vector3::new(1.0, 0.0, 0.0),
            epsilon = 1e-6
        );

        assert_relative_eq!(
            rotation_from_euler(&na::Vector3::zeros()) * na::Vector3::z(),
            na::Vector3::z()
        );
    }

    #[test]
    fn test_gamma_correct_endpoints() {
        assert_relative_eq!(gamma_correct(0.0), 0.0);
        assert_relative_eq!(gamma_correct(1.0), 1.0, epsilon = 1e-6);
    }
}
