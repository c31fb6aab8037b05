use crate::mesh::{Mesh, MeshVertex};
use crate::scene::{MeshKind, SceneGraph, SceneLighting};
use anyhow::{Context, Result};
use glam::Mat4;
use wgpu::util::DeviceExt;

use super::DEPTH_FORMAT;

const LIMB_SEGMENTS: u32 = 24;
const HANDLE_RINGS: u32 = 16;
const HANDLE_SECTORS: u32 = 24;
const MIN_INSTANCE_CAPACITY: usize = 16;

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct FrameData {
    pub view_proj: [[f32; 4]; 4],
    pub light_dir: [f32; 4],
    pub lighting: [f32; 4],
}

impl FrameData {
    pub fn new(view_proj: Mat4, lighting: SceneLighting) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_dir: lighting.light_dir.extend(0.0).to_array(),
            lighting: [lighting.ambient, lighting.directional, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(super) struct InstanceData {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl InstanceData {
    fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            2 => Float32x4,
            3 => Float32x4,
            4 => Float32x4,
            5 => Float32x4,
            6 => Float32x4
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Instance ranges for one frame: all limbs first, then all handles.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct InstanceBatches {
    pub instances: Vec<InstanceData>,
    pub limbs: std::ops::Range<u32>,
    pub handles: std::ops::Range<u32>,
}

impl InstanceBatches {
    pub fn from_scene(scene: &SceneGraph) -> Self {
        let mut instances = Vec::with_capacity(scene.nodes().len());
        let mut push = |kind: MeshKind| -> std::ops::Range<u32> {
            let start = instances.len() as u32;
            instances.extend(
                scene
                    .nodes_of(kind)
                    .map(|node| InstanceData { model: node.model.to_cols_array_2d(), color: node.color }),
            );
            start..instances.len() as u32
        };
        let limbs = push(MeshKind::Limb);
        let handles = push(MeshKind::Handle);
        Self { instances, limbs, handles }
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self { vertex_buffer, index_buffer, index_count: mesh.indices.len() as u32 }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        if instances.is_empty() {
            return;
        }
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, instances);
    }
}

pub(super) struct MeshPass {
    pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    limb: GpuMesh,
    handle: GpuMesh,
    instance_buffer: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

impl MeshPass {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Rig Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../assets/shaders/rig_mesh.wgsl").into()),
        });

        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Rig Frame BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Rig Frame Buffer"),
            size: std::mem::size_of::<FrameData>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Rig Frame BG"),
            layout: &frame_bgl,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Rig Mesh Pipeline Layout"),
            bind_group_layouts: &[&frame_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Rig Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::layout(), InstanceData::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let limb = GpuMesh::upload(device, "Limb", &Mesh::cylinder(LIMB_SEGMENTS));
        let handle = GpuMesh::upload(device, "Handle", &Mesh::uv_sphere(HANDLE_RINGS, HANDLE_SECTORS));

        Self {
            pipeline,
            frame_buffer,
            frame_bind_group,
            limb,
            handle,
            instance_buffer: None,
            instance_capacity: 0,
        }
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, count: usize) {
        if self.instance_buffer.is_some() && self.instance_capacity >= count {
            return;
        }
        let new_cap = instance_capacity_for(self.instance_capacity, count);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Rig Instance Buffer"),
            size: (new_cap * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.instance_buffer = Some(buffer);
        self.instance_capacity = new_cap;
    }

    /// Uploads the frame uniform and instances, then records the draw into a pass that clears color and depth.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        scene: &SceneGraph,
        view_proj: Mat4,
    ) -> Result<()> {
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&FrameData::new(view_proj, scene.lighting())));
        let batches = InstanceBatches::from_scene(scene);
        self.ensure_instance_capacity(device, batches.instances.len());
        let instance_buffer = self.instance_buffer.as_ref().context("Instance buffer missing")?;
        if !batches.instances.is_empty() {
            queue.write_buffer(instance_buffer, 0, bytemuck::cast_slice(&batches.instances));
        }

        let [r, g, b, a] = scene.clear_color();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Rig Mesh Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: a as f64 }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_vertex_buffer(1, instance_buffer.slice(..));
        self.limb.draw(&mut pass, batches.limbs);
        self.handle.draw(&mut pass, batches.handles);
        Ok(())
    }
}

fn instance_capacity_for(current: usize, required: usize) -> usize {
    let mut capacity = current.max(MIN_INSTANCE_CAPACITY);
    while capacity < required {
        capacity *= 2;
    }
    capacity
}
