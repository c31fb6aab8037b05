use glam::Vec3;
use std::f32::consts::{PI, TAU};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position: position.to_array(), normal: normal.to_array() }
    }

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub bounds: MeshBounds,
}

#[derive(Clone, Debug)]
pub struct MeshBounds {
    pub min: Vec3,
    pub max: Vec3,
    pub center: Vec3,
    pub radius: f32,
}

impl Mesh {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        let bounds = MeshBounds::from_vertices(&vertices);
        Self { vertices, indices, bounds }
    }

    /// Capped cylinder of radius 1 and height 1, centred on the origin along +Y.
    ///
    /// Side and cap vertices are kept separate so the caps shade flat.
    pub fn cylinder(segments: u32) -> Self {
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity((segments as usize + 1) * 4 + 2);
        let mut indices = Vec::with_capacity(segments as usize * 12);

        for i in 0..=segments {
            let angle = i as f32 / segments as f32 * TAU;
            let (sin, cos) = angle.sin_cos();
            let normal = Vec3::new(cos, 0.0, sin);
            vertices.push(MeshVertex::new(Vec3::new(cos, -0.5, sin), normal));
            vertices.push(MeshVertex::new(Vec3::new(cos, 0.5, sin), normal));
        }
        for i in 0..segments {
            let base = i * 2;
            indices.extend_from_slice(&[base, base + 1, base + 3, base, base + 3, base + 2]);
        }

        for (y, normal) in [(0.5_f32, Vec3::Y), (-0.5_f32, Vec3::NEG_Y)] {
            let center = vertices.len() as u32;
            vertices.push(MeshVertex::new(Vec3::new(0.0, y, 0.0), normal));
            let rim = vertices.len() as u32;
            for i in 0..=segments {
                let angle = i as f32 / segments as f32 * TAU;
                let (sin, cos) = angle.sin_cos();
                vertices.push(MeshVertex::new(Vec3::new(cos, y, sin), normal));
            }
            for i in 0..segments {
                // counter-clockwise seen from outside the cap
                if normal.y > 0.0 {
                    indices.extend_from_slice(&[center, rim + i + 1, rim + i]);
                } else {
                    indices.extend_from_slice(&[center, rim + i, rim + i + 1]);
                }
            }
        }

        Self::new(vertices, indices)
    }

    /// Unit sphere built from latitude rings.
    pub fn uv_sphere(rings: u32, sectors: u32) -> Self {
        let rings = rings.max(2);
        let sectors = sectors.max(3);
        let mut vertices = Vec::with_capacity(((rings + 1) * (sectors + 1)) as usize);
        for ring in 0..=rings {
            let polar = ring as f32 / rings as f32 * PI;
            let (ring_sin, ring_cos) = polar.sin_cos();
            for sector in 0..=sectors {
                let azimuth = sector as f32 / sectors as f32 * TAU;
                let (sin, cos) = azimuth.sin_cos();
                let position = Vec3::new(ring_sin * cos, ring_cos, ring_sin * sin);
                vertices.push(MeshVertex::new(position, position));
            }
        }
        let stride = sectors + 1;
        let mut indices = Vec::with_capacity((rings * sectors * 6) as usize);
        for ring in 0..rings {
            for sector in 0..sectors {
                let a = ring * stride + sector;
                let b = a + stride;
                if ring != 0 {
                    indices.extend_from_slice(&[a, a + 1, b]);
                }
                if ring != rings - 1 {
                    indices.extend_from_slice(&[a + 1, b + 1, b]);
                }
            }
        }
        Self::new(vertices, indices)
    }
}

impl MeshBounds {
    pub fn from_vertices(vertices: &[MeshVertex]) -> Self {
        if vertices.is_empty() {
            return MeshBounds { min: Vec3::ZERO, max: Vec3::ZERO, center: Vec3::ZERO, radius: 0.0 };
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for vertex in vertices {
            let pos = Vec3::from_array(vertex.position);
            min = min.min(pos);
            max = max.max(pos);
        }
        let center = (min + max) * 0.5;
        let radius = vertices
            .iter()
            .map(|vertex| (Vec3::from_array(vertex.position) - center).length())
            .fold(0.0_f32, f32::max);
        MeshBounds { min, max, center, radius }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_normal(mesh: &Mesh, tri: &[u32]) -> Vec3 {
        let p = |i: u32| Vec3::from_array(mesh.vertices[i as usize].position);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]))
    }

    #[test]
    fn cylinder_spans_unit_height() {
        let mesh = Mesh::cylinder(16);
        assert!(mesh.bounds.min.abs_diff_eq(Vec3::new(-1.0, -0.5, -1.0), 1e-5));
        assert!(mesh.bounds.max.abs_diff_eq(Vec3::new(1.0, 0.5, 1.0), 1e-5));
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn sphere_vertices_lie_on_unit_radius() {
        let mesh = Mesh::uv_sphere(8, 12);
        for vertex in &mesh.vertices {
            let length = Vec3::from_array(vertex.position).length();
            assert!((length - 1.0).abs() < 1e-5);
        }
        assert!(mesh.bounds.center.length() < 1e-5);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn triangles_face_outwards() {
        for mesh in [Mesh::cylinder(12), Mesh::uv_sphere(6, 10)] {
            for tri in mesh.indices.chunks_exact(3) {
                let normal = triangle_normal(&mesh, tri);
                if normal.length_squared() < 1e-10 {
                    continue;
                }
                let stored = Vec3::from_array(mesh.vertices[tri[0] as usize].normal)
                    + Vec3::from_array(mesh.vertices[tri[1] as usize].normal)
                    + Vec3::from_array(mesh.vertices[tri[2] as usize].normal);
                assert!(normal.dot(stored) > 0.0, "triangle {tri:?} winds inwards");
            }
        }
    }

    #[test]
    fn degenerate_segment_counts_are_raised() {
        let mesh = Mesh::cylinder(1);
        assert_eq!(mesh.vertices.len(), 4 * 2 + 2 * (1 + 4));
    }
}
