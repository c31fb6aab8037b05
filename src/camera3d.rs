use crate::config::CameraConfig;
use glam::{Mat4, Vec2, Vec3, Vec4};
use winit::dpi::PhysicalSize;

const DEFAULT_UP: Vec3 = Vec3::Y;

/// Perspective camera looking at a fixed target.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, aspect, near, far }
    }

    pub fn from_config(config: &CameraConfig, viewport: PhysicalSize<u32>) -> Self {
        let mut camera = Self::new(
            Vec3::from_array(config.position),
            Vec3::from_array(config.target),
            config.fov_y_degrees.to_radians(),
            1.0,
            config.near,
            config.far,
        );
        camera.set_viewport(viewport);
        camera
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Updates the aspect ratio. Zero-area viewports are skipped and leave the projection untouched.
    pub fn set_viewport(&mut self, viewport: PhysicalSize<u32>) -> bool {
        if viewport.width == 0 || viewport.height == 0 {
            return false;
        }
        self.aspect = viewport.width as f32 / viewport.height as f32;
        true
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, self.aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Generates a world-space ray originating from the camera through a screen-space position.
    pub fn screen_ray(&self, screen: Vec2, viewport: PhysicalSize<u32>) -> Option<(Vec3, Vec3)> {
        let ndc = screen_to_ndc(screen, viewport)?;
        let clip = Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let inv_view_proj = self.view_projection().inverse();
        let world = inv_view_proj * clip;
        if world.w.abs() < f32::EPSILON {
            return None;
        }
        let dir = ((world.truncate() / world.w) - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        Some((self.position, dir))
    }

    pub fn project_point(&self, point: Vec3, viewport: PhysicalSize<u32>) -> Option<Vec2> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w.abs() < f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let x = (ndc.x + 1.0) * 0.5 * viewport.width as f32;
        let y = (1.0 - ndc.y) * 0.5 * viewport.height as f32;
        Some(Vec2::new(x, y))
    }
}

/// `x' = (px / width) * 2 - 1`, `y' = -(py / height) * 2 + 1`.
pub fn screen_to_ndc(screen: Vec2, viewport: PhysicalSize<u32>) -> Option<Vec2> {
    if viewport.width == 0 || viewport.height == 0 {
        return None;
    }
    let x = (screen.x / viewport.width as f32) * 2.0 - 1.0;
    let y = -(screen.y / viewport.height as f32) * 2.0 + 1.0;
    Some(Vec2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera3D {
        Camera3D::from_config(&CameraConfig::default(), PhysicalSize::new(1280, 720))
    }

    #[test]
    fn view_projection_is_finite() {
        let vp = camera().view_projection();
        assert!(!vp.to_cols_array().iter().any(|v| v.is_nan() || v.is_infinite()));
    }

    #[test]
    fn ndc_maps_corners_and_centre() {
        let size = PhysicalSize::new(200, 100);
        assert_eq!(screen_to_ndc(Vec2::new(0.0, 0.0), size), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(screen_to_ndc(Vec2::new(100.0, 50.0), size), Some(Vec2::new(0.0, 0.0)));
        assert_eq!(screen_to_ndc(Vec2::new(200.0, 100.0), size), Some(Vec2::new(1.0, -1.0)));
        assert_eq!(screen_to_ndc(Vec2::ZERO, PhysicalSize::new(0, 100)), None);
    }

    #[test]
    fn centre_ray_points_at_target() {
        let camera = camera();
        let (origin, dir) = camera.screen_ray(Vec2::new(640.0, 360.0), PhysicalSize::new(1280, 720)).unwrap();
        let expected = (camera.target - camera.position).normalize();
        assert_eq!(origin, camera.position);
        assert!(dir.abs_diff_eq(expected, 1e-4), "dir {dir:?} expected {expected:?}");
    }

    #[test]
    fn projected_point_ray_passes_through_point() {
        let camera = camera();
        let size = PhysicalSize::new(1280, 720);
        let point = Vec3::new(0.5, 3.0, -0.25);
        let screen = camera.project_point(point, size).unwrap();
        let (origin, dir) = camera.screen_ray(screen, size).unwrap();
        let t = (point - origin).dot(dir);
        let closest = origin + dir * t;
        assert!(closest.distance(point) < 1e-3, "ray misses projected point by {}", closest.distance(point));
    }

    #[test]
    fn moved_camera_reaims_centre_ray() {
        let mut camera = camera();
        camera.set_position(Vec3::new(0.0, 2.0, 10.0));
        camera.look_at(Vec3::new(0.0, 2.0, 0.0));
        let (origin, dir) = camera.screen_ray(Vec2::new(640.0, 360.0), PhysicalSize::new(1280, 720)).unwrap();
        assert_eq!(origin, Vec3::new(0.0, 2.0, 10.0));
        assert!(dir.abs_diff_eq(Vec3::NEG_Z, 1e-4));
    }

    #[test]
    fn zero_viewport_keeps_previous_aspect() {
        let mut camera = camera();
        let before = camera.aspect;
        assert!(!camera.set_viewport(PhysicalSize::new(0, 480)));
        assert_eq!(camera.aspect, before);
        assert!(camera.set_viewport(PhysicalSize::new(400, 400)));
        assert_eq!(camera.aspect, 1.0);
    }
}
