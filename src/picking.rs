use crate::camera3d::Camera3D;
use crate::rig::{ArmRig, JointId};
use glam::{Vec2, Vec3};
use winit::dpi::PhysicalSize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub joint: JointId,
    pub distance: f32,
}

pub fn ray_sphere_intersection(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let mut t = -b - sqrt_d;
    if t < 0.0 {
        t = -b + sqrt_d;
    }
    if t < 0.0 {
        return None;
    }
    Some(t)
}

/// Nearest handle along the ray. Ties keep the earlier candidate so repeated picks agree.
pub fn pick_along_ray(origin: Vec3, direction: Vec3, rig: &ArmRig, candidates: &[JointId]) -> Option<PickHit> {
    let dir = direction.normalize_or_zero();
    if dir.length_squared() <= f32::EPSILON {
        return None;
    }
    let mut closest: Option<PickHit> = None;
    for &joint in candidates {
        let (Some(node), Some(center)) = (rig.joint(joint), rig.world_position(joint)) else {
            continue;
        };
        let radius = node.pick_radius();
        if radius <= 0.0 {
            continue;
        }
        let Some(distance) = ray_sphere_intersection(origin, dir, center, radius) else {
            continue;
        };
        match closest {
            Some(best) if distance >= best.distance => {}
            _ => closest = Some(PickHit { joint, distance }),
        }
    }
    closest
}

/// Projects `pointer` through `camera` and returns the nearest joint handle it intersects.
pub fn pick(
    pointer: Vec2,
    viewport: PhysicalSize<u32>,
    camera: &Camera3D,
    rig: &ArmRig,
    candidates: &[JointId],
) -> Option<PickHit> {
    let (origin, dir) = camera.screen_ray(pointer, viewport)?;
    pick_along_ray(origin, dir, rig, candidates)
}

/// Hover/selection front-end over [`pick`]. Owns the single highlighted handle.
#[derive(Debug, Clone, Default)]
pub struct Picker {
    highlighted: Option<JointId>,
}

impl Picker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlighted(&self) -> Option<JointId> {
        self.highlighted
    }

    /// Hover pass: clears the previous highlight, then highlights the new hit. Returns true when it changed.
    pub fn hover(
        &mut self,
        pointer: Vec2,
        viewport: PhysicalSize<u32>,
        camera: &Camera3D,
        rig: &ArmRig,
        candidates: &[JointId],
    ) -> bool {
        let hit = pick(pointer, viewport, camera, rig, candidates);
        let previous = self.highlighted.take();
        self.highlighted = hit.map(|hit| hit.joint);
        previous != self.highlighted
    }

    /// Selection pass for pointer-down. Leaves the highlight untouched.
    pub fn select(
        &self,
        pointer: Vec2,
        viewport: PhysicalSize<u32>,
        camera: &Camera3D,
        rig: &ArmRig,
        candidates: &[JointId],
    ) -> Option<PickHit> {
        pick(pointer, viewport, camera, rig, candidates)
    }

    pub fn highlight(&mut self, joint: JointId) {
        self.highlighted = Some(joint);
    }

    pub fn unhighlight(&mut self, joint: JointId) {
        if self.highlighted == Some(joint) {
            self.highlighted = None;
        }
    }

    pub fn clear_highlight(&mut self) -> bool {
        self.highlighted.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RigConfig;

    #[test]
    fn sphere_hit_reports_near_surface() {
        let t = ray_sphere_intersection(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, Vec3::ZERO, 1.0);
        assert_eq!(t, Some(4.0));
        let inside = ray_sphere_intersection(Vec3::ZERO, Vec3::X, Vec3::ZERO, 1.0);
        assert_eq!(inside, Some(1.0));
        assert!(ray_sphere_intersection(Vec3::new(0.0, 2.0, 5.0), Vec3::NEG_Z, Vec3::ZERO, 1.0).is_none());
        assert!(ray_sphere_intersection(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, Vec3::ZERO, 1.0).is_none());
    }

    #[test]
    fn ray_along_arm_prefers_nearer_handle() {
        let rig = ArmRig::new(&RigConfig::default());
        let candidates = rig.joint_ids();
        // straight down the arm from above: elbow (y=3) is hit before shoulder (y=1)
        let hit = pick_along_ray(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y, &rig, &candidates).unwrap();
        assert_eq!(hit.joint, rig.elbow());
        assert!((hit.distance - 6.7).abs() < 1e-4);
        let hit = pick_along_ray(Vec3::new(0.0, -10.0, 0.0), Vec3::Y, &rig, &candidates).unwrap();
        assert_eq!(hit.joint, rig.shoulder());
    }

    #[test]
    fn hover_keeps_at_most_one_highlight() {
        let rig = ArmRig::new(&RigConfig::default());
        let candidates = rig.joint_ids();
        let viewport = PhysicalSize::new(1280, 720);
        let camera = Camera3D::from_config(&crate::config::CameraConfig::default(), viewport);
        let over_elbow = camera.project_point(rig.world_position(rig.elbow()).unwrap(), viewport).unwrap();
        let mut picker = Picker::new();
        assert!(picker.hover(over_elbow, viewport, &camera, &rig, &candidates));
        assert_eq!(picker.highlighted(), Some(rig.elbow()));
        assert!(!picker.hover(over_elbow, viewport, &camera, &rig, &candidates));
        assert!(picker.hover(Vec2::new(5.0, 5.0), viewport, &camera, &rig, &candidates));
        assert_eq!(picker.highlighted(), None);
    }
}
