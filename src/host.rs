use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::window::{CursorIcon, Window};

use crate::camera3d::Camera3D;
use crate::scene::SceneGraph;

/// Pointer affordance shown by the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    /// Pointer rests over a handle that can be grabbed.
    Grab,
    /// A drag session is active.
    Grabbing,
}

impl CursorStyle {
    pub fn label(self) -> &'static str {
        match self {
            CursorStyle::Default => "default",
            CursorStyle::Grab => "grab",
            CursorStyle::Grabbing => "grabbing",
        }
    }
}

impl From<CursorStyle> for CursorIcon {
    fn from(style: CursorStyle) -> Self {
        match style {
            CursorStyle::Default => CursorIcon::Default,
            CursorStyle::Grab => CursorIcon::Grab,
            CursorStyle::Grabbing => CursorIcon::Grabbing,
        }
    }
}

/// Sink for the visible pointer affordance.
pub trait CursorFeedback {
    fn set_cursor(&mut self, style: CursorStyle);
}

/// Drawing collaborator: receives the frame's scene and camera.
pub trait RenderBackend {
    /// Zero-sized viewports must be tolerated (minimised windows).
    fn resize(&mut self, size: PhysicalSize<u32>);

    fn render(&mut self, scene: &SceneGraph, camera: &Camera3D) -> Result<()>;
}

/// [`CursorFeedback`] over a winit window. Without a window the affordance is dropped.
pub struct WindowCursor<'a> {
    window: Option<&'a Window>,
}

impl<'a> WindowCursor<'a> {
    pub fn new(window: Option<&'a Window>) -> Self {
        Self { window }
    }
}

impl CursorFeedback for WindowCursor<'_> {
    fn set_cursor(&mut self, style: CursorStyle) {
        if let Some(window) = self.window {
            tracing::trace!(cursor = style.label(), "cursor affordance");
            window.set_cursor(CursorIcon::from(style));
        }
    }
}
