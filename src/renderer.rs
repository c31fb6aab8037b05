mod mesh_pass;
mod window_surface;

use crate::camera3d::Camera3D;
use crate::config::WindowConfig;
use crate::host::RenderBackend;
use crate::scene::SceneGraph;

use anyhow::{Context, Result};
use std::sync::Arc;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::Window;

use self::mesh_pass::MeshPass;
use self::window_surface::WindowSurface;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// wgpu renderer for the arm rig: one surface, one lit instanced mesh pass.
pub struct Renderer {
    surface: WindowSurface,
    mesh_pass: Option<MeshPass>,
}

impl Renderer {
    pub fn new(window_cfg: &WindowConfig) -> Self {
        Self { surface: WindowSurface::new(window_cfg), mesh_pass: None }
    }

    pub fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        if self.surface.ensure_window(event_loop)? {
            tracing::info!(
                width = self.surface.size().width,
                height = self.surface.size().height,
                vsync = self.surface.vsync_enabled(),
                "window created"
            );
        }
        if self.mesh_pass.is_none() {
            let device = self.surface.device()?;
            let format = self.surface.surface_format()?;
            self.mesh_pass = Some(MeshPass::new(device, format));
        }
        Ok(())
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.surface.window()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.surface.size()
    }

    pub fn render_scene(&mut self, scene: &SceneGraph, camera: &Camera3D) -> Result<()> {
        let size = self.surface.size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        let frame = self.surface.acquire_surface_frame()?;
        let (device, queue) = self.surface.device_and_queue()?;
        let depth_view = self.surface.depth_view()?;
        let mesh_pass = self.mesh_pass.as_mut().context("Mesh pipeline not initialized")?;
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Rig Encoder") });
        mesh_pass.encode(device, queue, &mut encoder, frame.view(), depth_view, scene, camera.view_projection())?;
        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl RenderBackend for Renderer {
    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.surface.resize(size);
    }

    fn render(&mut self, scene: &SceneGraph, camera: &Camera3D) -> Result<()> {
        self.render_scene(scene, camera)
    }
}
