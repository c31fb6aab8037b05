use crate::camera3d::Camera3D;
use crate::config::AppConfig;
use crate::constraint::ConstraintEnforcer;
use crate::drag::{DragController, DragUpdate};
use crate::host::{CursorFeedback, CursorStyle};
use crate::input::PointerEvent;
use crate::picking::Picker;
use crate::rig::{ArmRig, JointId};
use crate::scene::{Palette, SceneGraph};

use anyhow::{Context, Result};
use glam::Vec2;
use smallvec::SmallVec;
use winit::dpi::PhysicalSize;

/// What the host should do after an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionResponse {
    pub redraw: bool,
}

impl SessionResponse {
    const IDLE: Self = Self { redraw: false };
    const REDRAW: Self = Self { redraw: true };
}

/// Single owner of all rig state. Pointer, resize and frame handling all go through `&mut self`, so every
/// handler sees the state left by the previous one.
pub struct RigSession {
    rig: ArmRig,
    constraints: ConstraintEnforcer,
    picker: Picker,
    drag: DragController,
    camera: Camera3D,
    palette: Palette,
    viewport: PhysicalSize<u32>,
    pointer: Option<Vec2>,
    attached: bool,
}

impl RigSession {
    pub fn new(config: &AppConfig, viewport: PhysicalSize<u32>) -> Result<Self> {
        config.validate().context("Invalid rig configuration")?;
        let rig = ArmRig::new(&config.rig);
        let constraints = ConstraintEnforcer::for_rig(&rig, &config.rig.limits)?;
        let palette = Palette::from_config(&config.palette)?;
        let camera = Camera3D::from_config(&config.camera, viewport);
        Ok(Self {
            rig,
            constraints,
            picker: Picker::new(),
            drag: DragController::new(config.rig.sensitivity),
            camera,
            palette,
            viewport,
            pointer: None,
            attached: true,
        })
    }

    pub fn rig(&self) -> &ArmRig {
        &self.rig
    }

    pub fn rig_mut(&mut self) -> &mut ArmRig {
        &mut self.rig
    }

    pub fn constraints(&self) -> &ConstraintEnforcer {
        &self.constraints
    }

    pub fn picker(&self) -> &Picker {
        &self.picker
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn viewport(&self) -> PhysicalSize<u32> {
        self.viewport
    }

    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    fn candidates(&self) -> SmallVec<[JointId; 2]> {
        self.rig.joint_ids()
    }

    pub fn handle_pointer(&mut self, event: PointerEvent, cursor: &mut dyn CursorFeedback) -> SessionResponse {
        match event {
            PointerEvent::Down { position } => self.pointer_down(position, cursor),
            PointerEvent::Move { position } => self.pointer_move(position, cursor),
            PointerEvent::Up { .. } => self.pointer_up(cursor),
            PointerEvent::Left => self.pointer_left(cursor),
        }
    }

    pub fn pointer_down(&mut self, position: Vec2, cursor: &mut dyn CursorFeedback) -> SessionResponse {
        if !self.attached {
            return SessionResponse::IDLE;
        }
        self.pointer = Some(position);
        let candidates = self.candidates();
        let hit = self.picker.select(position, self.viewport, &self.camera, &self.rig, &candidates);
        if !self.drag.pointer_down(position, hit, cursor) {
            return SessionResponse::IDLE;
        }
        if let Some(hit) = hit {
            // the grabbed handle stays lit for the whole drag
            self.picker.highlight(hit.joint);
        }
        SessionResponse::REDRAW
    }

    pub fn pointer_move(&mut self, position: Vec2, cursor: &mut dyn CursorFeedback) -> SessionResponse {
        if !self.attached {
            return SessionResponse::IDLE;
        }
        self.pointer = Some(position);
        if self.drag.is_dragging() {
            let update =
                self.drag.pointer_move(position, &mut self.rig, &self.constraints, &mut self.picker, cursor);
            return SessionResponse { redraw: update != DragUpdate::None };
        }
        SessionResponse { redraw: self.hover(cursor) }
    }

    pub fn pointer_up(&mut self, cursor: &mut dyn CursorFeedback) -> SessionResponse {
        if !self.attached {
            return SessionResponse::IDLE;
        }
        if self.drag.pointer_up(&mut self.picker, cursor) {
            // re-evaluate so a release over a handle shows it as grabbable again
            self.hover(cursor);
            return SessionResponse::REDRAW;
        }
        SessionResponse::IDLE
    }

    pub fn pointer_left(&mut self, cursor: &mut dyn CursorFeedback) -> SessionResponse {
        if !self.attached {
            return SessionResponse::IDLE;
        }
        self.pointer = None;
        let cancelled = self.drag.cancel(&mut self.picker, cursor);
        let cleared = self.picker.clear_highlight();
        if cleared && !cancelled {
            cursor.set_cursor(CursorStyle::Default);
        }
        SessionResponse { redraw: cancelled || cleared }
    }

    /// Hover pass against the last known pointer position. Skipped while a drag owns the highlight.
    pub fn hover(&mut self, cursor: &mut dyn CursorFeedback) -> bool {
        if self.drag.is_dragging() {
            return false;
        }
        let Some(pointer) = self.pointer else {
            return false;
        };
        let candidates = self.candidates();
        let changed = self.picker.hover(pointer, self.viewport, &self.camera, &self.rig, &candidates);
        if changed {
            let style = if self.picker.highlighted().is_some() { CursorStyle::Grab } else { CursorStyle::Default };
            cursor.set_cursor(style);
        }
        changed
    }

    /// Clamps every constrained joint. Returns the number of values that moved.
    pub fn enforce_constraints(&mut self) -> usize {
        self.constraints.enforce(&mut self.rig)
    }

    /// Tracks the new viewport. A zero-area size keeps the previous camera aspect.
    pub fn resize(&mut self, size: PhysicalSize<u32>) -> SessionResponse {
        if !self.attached {
            return SessionResponse::IDLE;
        }
        self.viewport = size;
        if !self.camera.set_viewport(size) {
            tracing::debug!(width = size.width, height = size.height, "skipping camera aspect for empty viewport");
            return SessionResponse::IDLE;
        }
        SessionResponse::REDRAW
    }

    pub fn scene(&self) -> SceneGraph {
        SceneGraph::from_rig(&self.rig, self.picker.highlighted(), &self.palette)
    }

    /// Drops any drag in flight, restores the default cursor and stops reacting to further events.
    pub fn teardown(&mut self, cursor: &mut dyn CursorFeedback) {
        if !self.attached {
            return;
        }
        if self.drag.cancel(&mut self.picker, cursor) {
            tracing::info!("drag cancelled by teardown");
        }
        self.picker.clear_highlight();
        cursor.set_cursor(CursorStyle::Default);
        self.pointer = None;
        self.attached = false;
    }
}
