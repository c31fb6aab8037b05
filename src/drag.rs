//! Pointer drag state machine.
//!
//! `Idle --down(hit)--> Dragging --move--> Dragging --up/cancel--> Idle`. A pointer-down that misses every
//! handle leaves the controller idle, and a second pointer-down while dragging is ignored so only one joint
//! is ever manipulated per session.

use crate::constraint::{ConstraintEnforcer, RotationAxis};
use crate::host::{CursorFeedback, CursorStyle};
use crate::picking::{PickHit, Picker};
use crate::rig::{ArmRig, JointId};
use glam::Vec2;

pub const DEFAULT_DRAG_SENSITIVITY: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub target: JointId,
    pub last_pointer: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragUpdate {
    /// Nothing changed.
    None,
    /// The target joint rotated; the host should redraw immediately.
    Rotated,
    /// The session was dropped because its target disappeared.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    sensitivity: f32,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(DEFAULT_DRAG_SENSITIVITY)
    }
}

impl DragController {
    pub fn new(sensitivity: f32) -> Self {
        Self { state: DragState::Idle, sensitivity }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn target(&self) -> Option<JointId> {
        match self.state {
            DragState::Dragging(session) => Some(session.target),
            DragState::Idle => None,
        }
    }

    /// Starts a session when `hit` is present. Returns true if a drag began.
    pub fn pointer_down(&mut self, pointer: Vec2, hit: Option<PickHit>, cursor: &mut dyn CursorFeedback) -> bool {
        if self.is_dragging() {
            return false;
        }
        let Some(hit) = hit else {
            return false;
        };
        self.state = DragState::Dragging(DragSession { target: hit.joint, last_pointer: pointer });
        cursor.set_cursor(CursorStyle::Grabbing);
        tracing::debug!(joint = hit.joint.index(), distance = hit.distance, "drag started");
        true
    }

    pub fn pointer_move(
        &mut self,
        pointer: Vec2,
        rig: &mut ArmRig,
        constraints: &ConstraintEnforcer,
        picker: &mut Picker,
        cursor: &mut dyn CursorFeedback,
    ) -> DragUpdate {
        let DragState::Dragging(mut session) = self.state else {
            return DragUpdate::None;
        };
        if !rig.contains(session.target) {
            tracing::warn!(joint = session.target.index(), "drag target left the rig; cancelling drag");
            self.release(picker, cursor);
            return DragUpdate::Cancelled;
        }
        let delta = pointer - session.last_pointer;
        session.last_pointer = pointer;
        self.state = DragState::Dragging(session);
        apply_drag_delta(rig, session.target, delta, self.sensitivity, constraints);
        DragUpdate::Rotated
    }

    /// Ends the session: the target loses its highlight and the cursor returns to default.
    pub fn pointer_up(&mut self, picker: &mut Picker, cursor: &mut dyn CursorFeedback) -> bool {
        self.release(picker, cursor)
    }

    /// Pointer left the surface or the host is tearing down.
    pub fn cancel(&mut self, picker: &mut Picker, cursor: &mut dyn CursorFeedback) -> bool {
        self.release(picker, cursor)
    }

    fn release(&mut self, picker: &mut Picker, cursor: &mut dyn CursorFeedback) -> bool {
        let DragState::Dragging(session) = std::mem::take(&mut self.state) else {
            return false;
        };
        picker.unhighlight(session.target);
        cursor.set_cursor(CursorStyle::Default);
        tracing::debug!(joint = session.target.index(), "drag ended");
        true
    }
}

/// Horizontal motion yaws the joint freely; vertical motion pitches it around Z, clamped on assignment.
/// The elbow's yaw composes with the shoulder's world rotation, so both joints share the mapping and differ
/// only in their pitch range.
pub fn apply_drag_delta(
    rig: &mut ArmRig,
    joint: JointId,
    delta: Vec2,
    sensitivity: f32,
    constraints: &ConstraintEnforcer,
) -> bool {
    let limit = constraints.limits_for(joint, RotationAxis::Z).copied();
    let Some(node) = rig.joint_mut(joint) else {
        return false;
    };
    let rotation = &mut node.local_rotation;
    rotation.y += delta.x * sensitivity;
    let pitch = rotation.z - delta.y * sensitivity;
    rotation.z = match limit {
        Some(limit) => limit.clamp(pitch),
        None => pitch,
    };
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RigConfig;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[derive(Default)]
    struct FakeCursor {
        current: CursorStyle,
    }

    impl CursorFeedback for FakeCursor {
        fn set_cursor(&mut self, style: CursorStyle) {
            self.current = style;
        }
    }

    struct Fixture {
        rig: ArmRig,
        constraints: ConstraintEnforcer,
        picker: Picker,
        cursor: FakeCursor,
        drag: DragController,
    }

    impl Fixture {
        fn new() -> Self {
            let config = RigConfig::default();
            let rig = ArmRig::new(&config);
            let constraints = ConstraintEnforcer::for_rig(&rig, &config.limits).unwrap();
            Self {
                rig,
                constraints,
                picker: Picker::new(),
                cursor: FakeCursor::default(),
                drag: DragController::default(),
            }
        }

        fn grab(&mut self, joint: JointId, at: Vec2) {
            let hit = PickHit { joint, distance: 1.0 };
            assert!(self.drag.pointer_down(at, Some(hit), &mut self.cursor));
        }

        fn move_to(&mut self, at: Vec2) -> DragUpdate {
            self.drag.pointer_move(at, &mut self.rig, &self.constraints, &mut self.picker, &mut self.cursor)
        }
    }

    #[test]
    fn horizontal_drag_accumulates_yaw() {
        let mut fx = Fixture::new();
        let shoulder = fx.rig.shoulder();
        fx.grab(shoulder, Vec2::new(100.0, 100.0));
        assert_eq!(fx.move_to(Vec2::new(150.0, 100.0)), DragUpdate::Rotated);
        assert_eq!(fx.move_to(Vec2::new(200.0, 100.0)), DragUpdate::Rotated);
        let rotation = fx.rig.joint(shoulder).unwrap().local_rotation;
        assert!((rotation.y - 1.0).abs() < 1e-6, "yaw was {}", rotation.y);
        assert_eq!(rotation.z, 0.0);
        assert_eq!(rotation.x, 0.0);
    }

    #[test]
    fn vertical_drag_is_clamped_per_joint() {
        let mut fx = Fixture::new();
        let shoulder = fx.rig.shoulder();
        fx.grab(shoulder, Vec2::ZERO);
        fx.move_to(Vec2::new(0.0, -400.0));
        assert_eq!(fx.rig.joint(shoulder).unwrap().local_rotation.z, FRAC_PI_2);
        fx.drag.pointer_up(&mut fx.picker, &mut fx.cursor);

        let elbow = fx.rig.elbow();
        fx.grab(elbow, Vec2::ZERO);
        fx.move_to(Vec2::new(0.0, 300.0));
        assert_eq!(fx.rig.joint(elbow).unwrap().local_rotation.z, -0.8 * PI);
    }

    #[test]
    fn miss_keeps_controller_idle() {
        let mut fx = Fixture::new();
        assert!(!fx.drag.pointer_down(Vec2::new(3.0, 4.0), None, &mut fx.cursor));
        assert_eq!(fx.move_to(Vec2::new(90.0, 90.0)), DragUpdate::None);
        assert_eq!(fx.drag.state(), DragState::Idle);
        assert_eq!(fx.cursor.current, CursorStyle::Default);
        for (_, node) in fx.rig.joints() {
            assert_eq!(node.local_rotation, glam::Vec3::ZERO);
        }
    }

    #[test]
    fn second_pointer_down_cannot_switch_target() {
        let mut fx = Fixture::new();
        let (shoulder, elbow) = (fx.rig.shoulder(), fx.rig.elbow());
        fx.grab(shoulder, Vec2::ZERO);
        assert!(!fx.drag.pointer_down(Vec2::ZERO, Some(PickHit { joint: elbow, distance: 0.5 }), &mut fx.cursor));
        assert_eq!(fx.drag.target(), Some(shoulder));
    }

    #[test]
    fn vanished_target_forces_idle() {
        let mut fx = Fixture::new();
        let unknown = JointId::from_index(7);
        assert!(!fx.rig.contains(unknown));
        fx.grab(unknown, Vec2::ZERO);
        assert_eq!(fx.cursor.current, CursorStyle::Grabbing);

        assert_eq!(fx.move_to(Vec2::new(40.0, -25.0)), DragUpdate::Cancelled);
        assert!(!fx.drag.is_dragging());
        assert_eq!(fx.drag.state(), DragState::Idle);
        assert_eq!(fx.cursor.current, CursorStyle::Default);
        for (_, node) in fx.rig.joints() {
            assert_eq!(node.local_rotation, glam::Vec3::ZERO);
        }
        assert_eq!(fx.move_to(Vec2::new(80.0, 0.0)), DragUpdate::None);
    }

    #[test]
    fn pointer_up_restores_cursor_and_highlight() {
        let mut fx = Fixture::new();
        let elbow = fx.rig.elbow();
        fx.picker.highlight(elbow);
        fx.grab(elbow, Vec2::ZERO);
        assert_eq!(fx.cursor.current, CursorStyle::Grabbing);
        assert!(fx.drag.pointer_up(&mut fx.picker, &mut fx.cursor));
        assert_eq!(fx.cursor.current, CursorStyle::Default);
        assert_eq!(fx.picker.highlighted(), None);
        assert!(!fx.drag.is_dragging());
        assert!(!fx.drag.pointer_up(&mut fx.picker, &mut fx.cursor), "second release is a no-op");
    }
}
