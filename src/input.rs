use glam::Vec2;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};

/// Pointer input in client (physical pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { position: Vec2 },
    Move { position: Vec2 },
    Up { position: Option<Vec2> },
    /// The pointer left the interactive surface.
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Pointer(PointerEvent),
    Resized(PhysicalSize<u32>),
    Other,
}

/// Converts winit window events into [`HostEvent`]s.
///
/// winit reports button presses without a position, so the last `CursorMoved` location is remembered and
/// attached to `Down`. Only the primary button grabs handles.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    cursor_pos: Option<Vec2>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor_pos
    }

    pub fn translate(&mut self, ev: &WindowEvent) -> HostEvent {
        match ev {
            WindowEvent::CursorMoved { position, .. } => {
                HostEvent::Pointer(self.cursor_moved(position.x as f32, position.y as f32))
            }
            WindowEvent::CursorLeft { .. } => HostEvent::Pointer(self.cursor_left()),
            WindowEvent::MouseInput { state, button, .. } => self
                .button(*button, *state == ElementState::Pressed)
                .map(HostEvent::Pointer)
                .unwrap_or(HostEvent::Other),
            WindowEvent::Resized(size) => HostEvent::Resized(*size),
            _ => HostEvent::Other,
        }
    }

    pub fn cursor_moved(&mut self, x: f32, y: f32) -> PointerEvent {
        let position = Vec2::new(x, y);
        self.cursor_pos = Some(position);
        PointerEvent::Move { position }
    }

    pub fn cursor_left(&mut self) -> PointerEvent {
        self.cursor_pos = None;
        PointerEvent::Left
    }

    pub fn button(&mut self, button: MouseButton, pressed: bool) -> Option<PointerEvent> {
        if button != MouseButton::Left {
            return None;
        }
        if pressed {
            // a press before any CursorMoved has nowhere to pick
            self.cursor_pos.map(|position| PointerEvent::Down { position })
        } else {
            Some(PointerEvent::Up { position: self.cursor_pos })
        }
    }
}
