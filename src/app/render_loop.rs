use super::session::RigSession;
use crate::host::{CursorFeedback, RenderBackend};

use anyhow::Result;
use std::time::Instant;

/// Per-frame driver. Each frame runs hover, then constraint enforcement, then the draw call, in that order.
pub struct RenderLoop {
    last_frame: Option<Instant>,
    frames: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub dt: f32,
    pub hover_changed: bool,
    /// Rotation components pulled back into range this frame.
    pub clamped: usize,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self { last_frame: None, frames: 0 }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Seconds since the previous frame; zero on the first one.
    fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = self.last_frame.map(|last| (now - last).as_secs_f32()).unwrap_or(0.0);
        self.last_frame = Some(now);
        dt
    }

    /// Runs one frame. A detached session draws nothing and reports an idle frame.
    pub fn frame(
        &mut self,
        session: &mut RigSession,
        backend: &mut dyn RenderBackend,
        cursor: &mut dyn CursorFeedback,
    ) -> Result<FrameReport> {
        let dt = self.tick();
        if !session.is_attached() {
            return Ok(FrameReport { frame: self.frames, dt, hover_changed: false, clamped: 0 });
        }
        let hover_changed = session.hover(cursor);
        let clamped = session.enforce_constraints();
        if clamped > 0 {
            tracing::debug!(clamped, "constraint pass pulled rotations back into range");
        }
        let scene = session.scene();
        backend.render(&scene, session.camera())?;
        self.frames = self.frames.saturating_add(1);
        Ok(FrameReport { frame: self.frames, dt, hover_changed, clamped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera3d::Camera3D;
    use crate::config::AppConfig;
    use crate::host::CursorStyle;
    use crate::scene::{MeshKind, Palette, SceneGraph};
    use anyhow::anyhow;
    use winit::dpi::PhysicalSize;

    struct NullCursor;

    impl CursorFeedback for NullCursor {
        fn set_cursor(&mut self, _style: CursorStyle) {}
    }

    #[derive(Default)]
    struct LastCursor(Option<CursorStyle>);

    impl CursorFeedback for LastCursor {
        fn set_cursor(&mut self, style: CursorStyle) {
            self.0 = Some(style);
        }
    }

    #[derive(Default)]
    struct CapturingBackend {
        draws: usize,
        last_shoulder_pitch: Option<f32>,
        handle_colors: Vec<[f32; 4]>,
        fail: bool,
    }

    impl RenderBackend for CapturingBackend {
        fn resize(&mut self, _size: PhysicalSize<u32>) {}

        fn render(&mut self, scene: &SceneGraph, _camera: &Camera3D) -> Result<()> {
            if self.fail {
                return Err(anyhow!("device lost"));
            }
            self.draws += 1;
            // first limb node is the upper arm; its Y axis tips over as the shoulder pitches
            let upper = scene.nodes().first().map(|node| node.model.y_axis.truncate().normalize());
            self.last_shoulder_pitch = upper.map(|axis| (-axis.x).atan2(axis.y));
            self.handle_colors = scene.nodes_of(MeshKind::Handle).map(|node| node.color).collect();
            Ok(())
        }
    }

    fn session() -> RigSession {
        RigSession::new(&AppConfig::default(), PhysicalSize::new(800, 600)).unwrap()
    }

    #[test]
    fn enforcement_runs_before_draw() {
        let mut session = session();
        let shoulder = session.rig().shoulder();
        session.rig_mut().joint_mut(shoulder).unwrap().local_rotation.z = 3.0;
        let mut backend = CapturingBackend::default();
        let mut render_loop = RenderLoop::new();
        let report = render_loop.frame(&mut session, &mut backend, &mut NullCursor).unwrap();
        assert_eq!(report.clamped, 1);
        assert_eq!(report.frame, 1);
        let drawn = backend.last_shoulder_pitch.unwrap();
        assert!((drawn - std::f32::consts::FRAC_PI_2).abs() < 1e-4, "drawn pitch {drawn}");
    }

    #[test]
    fn frame_rehovers_when_rig_moves_under_still_pointer() {
        let mut session = session();
        let palette = Palette::from_config(&AppConfig::default().palette).unwrap();
        let mut cursor = LastCursor::default();
        let elbow = session.rig().elbow();
        let world = session.rig().world_position(elbow).unwrap();
        let over = session.camera().project_point(world, session.viewport()).unwrap();
        session.pointer_move(over, &mut cursor);
        assert_eq!(session.picker().highlighted(), Some(elbow));

        let mut backend = CapturingBackend::default();
        let mut render_loop = RenderLoop::new();
        let report = render_loop.frame(&mut session, &mut backend, &mut cursor).unwrap();
        assert!(!report.hover_changed, "nothing moved yet");
        assert!(backend.handle_colors.contains(&palette.handle_highlight));

        // no pointer event: the frame itself must notice the elbow swung away
        let shoulder = session.rig().shoulder();
        session.rig_mut().joint_mut(shoulder).unwrap().local_rotation.z = std::f32::consts::FRAC_PI_2;
        let report = render_loop.frame(&mut session, &mut backend, &mut cursor).unwrap();
        assert!(report.hover_changed);
        assert_eq!(report.clamped, 0);
        assert_eq!(session.picker().highlighted(), None);
        assert_eq!(cursor.0, Some(CursorStyle::Default));
        assert_eq!(backend.handle_colors, vec![palette.handle; 2]);
    }

    #[test]
    fn detached_session_skips_drawing() {
        let mut session = session();
        session.teardown(&mut NullCursor);
        let mut backend = CapturingBackend::default();
        let mut render_loop = RenderLoop::new();
        let report = render_loop.frame(&mut session, &mut backend, &mut NullCursor).unwrap();
        assert_eq!(backend.draws, 0);
        assert_eq!(report.frame, 0);
    }

    #[test]
    fn backend_errors_propagate() {
        let mut session = session();
        let mut backend = CapturingBackend { fail: true, ..Default::default() };
        let mut render_loop = RenderLoop::new();
        let err = render_loop.frame(&mut session, &mut backend, &mut NullCursor).unwrap_err();
        assert!(err.to_string().contains("device lost"));
        assert_eq!(render_loop.frames(), 0);
    }
}
