mod render_loop;
mod session;

pub use render_loop::{FrameReport, RenderLoop};
pub use session::{RigSession, SessionResponse};

use crate::config::{AppConfig, AppConfigOverrides};
use crate::host::{RenderBackend, WindowCursor};
use crate::input::{HostEvent, PointerTracker};
use crate::renderer::Renderer;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

pub fn run_with_overrides(config_path: &Path, overrides: AppConfigOverrides) -> Result<()> {
    let mut config = AppConfig::load_or_default(config_path);
    if !overrides.is_empty() {
        tracing::info!(fields = ?overrides.applied_fields(), "applying command line overrides");
        config.apply_overrides(&overrides);
    }
    let mut app = App::new(config)?;
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    event_loop.run_app(&mut app).context("Event loop execution failed")?;
    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// winit host: owns the window renderer and forwards pointer, resize and redraw events into the session.
pub struct App {
    renderer: Renderer,
    session: RigSession,
    render_loop: RenderLoop,
    pointer: PointerTracker,
    // second handle so the cursor can be set while the renderer is borrowed mutably
    window: Option<Arc<Window>>,
    should_close: bool,
    fatal: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let viewport = PhysicalSize::new(config.window.width, config.window.height);
        let session = RigSession::new(&config, viewport)?;
        Ok(Self {
            renderer: Renderer::new(&config.window),
            session,
            render_loop: RenderLoop::new(),
            pointer: PointerTracker::new(),
            window: None,
            should_close: false,
            fatal: None,
        })
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn redraw(&mut self) {
        let mut cursor = WindowCursor::new(self.window.as_deref());
        match self.render_loop.frame(&mut self.session, &mut self.renderer, &mut cursor) {
            Ok(report) => {
                tracing::trace!(frame = report.frame, dt = report.dt, clamped = report.clamped, "frame")
            }
            Err(err) => tracing::error!("Render error: {err:?}"),
        }
        if self.session.is_attached() {
            self.request_redraw();
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.renderer.resize(size);
        if self.session.resize(size).redraw {
            self.request_redraw();
        }
    }

    fn teardown(&mut self) {
        let mut cursor = WindowCursor::new(self.window.as_deref());
        self.session.teardown(&mut cursor);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.renderer.ensure_window(event_loop) {
            tracing::error!("Renderer initialization error: {err:?}");
            self.fatal = Some(err);
            self.should_close = true;
            event_loop.exit();
            return;
        }
        self.window = self.renderer.window().cloned();
        let size = self.renderer.size();
        if self.session.viewport() != size {
            self.session.resize(size);
        }
        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.window.as_ref().is_some_and(|window| window.id() != id) {
            return;
        }
        match &event {
            WindowEvent::CloseRequested => {
                self.should_close = true;
                event_loop.exit();
                return;
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                return;
            }
            WindowEvent::KeyboardInput { event: KeyEvent { logical_key, state, .. }, .. } => {
                if let Key::Named(NamedKey::Escape) = logical_key {
                    if *state == ElementState::Pressed {
                        self.should_close = true;
                    }
                }
                return;
            }
            _ => {}
        }
        match self.pointer.translate(&event) {
            HostEvent::Pointer(pointer_event) => {
                let mut cursor = WindowCursor::new(self.window.as_deref());
                let response = self.session.handle_pointer(pointer_event, &mut cursor);
                if response.redraw {
                    self.request_redraw();
                }
            }
            HostEvent::Resized(size) => self.resize(size),
            HostEvent::Other => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
        tracing::info!(frames = self.render_loop.frames(), "arm rig shut down");
    }
}
