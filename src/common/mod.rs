pub mod bounds;
pub mod math;
pub mod particles;
pub mod ray;
pub mod roots;

pub use bounds::{Bounds3, BoundingVolume};
pub use particles::{ParticleSet, ShutterOffset};
pub use ray::Ray;

static DEFAULT_Z_NEAR: f32 = 0.01;
static DEFAULT_Z_FAR: f32 = 1000.0;

/// Pinhole camera used by the preview renderer.
pub struct Camera {
    pub cam_to_world: na::Isometry3<f32>,
    pub cam_to_screen: na::Perspective3<f32>,
    pub screen_to_raster: na::Affine3<f32>,
    pub raster_to_screen: na::Affine3<f32>,
    pub resolution: na::Vector2<u32>,
}

impl Camera {
    pub fn new(
        cam_to_world: &na::Isometry3<f32>,
        fov_y: f32,
        resolution: &na::Vector2<u32>,
    ) -> Camera {
        let res = glm::vec2(resolution.x as f32, resolution.y as f32);
        let cam_to_screen =
            na::Perspective3::new(res.x / res.y, fov_y, DEFAULT_Z_NEAR, DEFAULT_Z_FAR);
        let screen_to_raster = glm::scaling(&glm::vec3(res.x, res.y, 1.0))
            * glm::scaling(&glm::vec3(0.5, -0.5, 1.0))
            * glm::translation(&glm::vec3(1.0, -1.0, 0.0));
        let screen_to_raster = na::Affine3::from_matrix_unchecked(screen_to_raster);
        let raster_to_screen = screen_to_raster.inverse();

        Camera {
            cam_to_world: *cam_to_world,
            cam_to_screen,
            screen_to_raster,
            raster_to_screen,
            resolution: *resolution,
        }
    }

    pub fn look_at(
        eye: &na::Point3<f32>,
        target: &na::Point3<f32>,
        fov_y: f32,
        resolution: &na::Vector2<u32>,
    ) -> Camera {
        Camera::new(
            &na::Isometry3::look_at_rh(eye, target, &glm::vec3(0.0, 1.0, 0.0)).inverse(),
            fov_y,
            resolution,
        )
    }

    /// Primary ray through a raster position, at normalized shutter `time`.
    pub fn generate_ray(&self, p_raster: &na::Point2<f32>, time: f32) -> Ray {
        let p_screen = self.raster_to_screen * na::Point3::new(p_raster.x, p_raster.y, 0.0);
        let p_camera = self.cam_to_screen.unproject_point(&p_screen);
        let d = p_camera.coords.normalize();

        Ray::new(
            self.cam_to_world * na::Point3::origin(),
            self.cam_to_world * d,
            time,
            0.0,
        )
    }
}
