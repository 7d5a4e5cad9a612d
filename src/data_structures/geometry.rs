//! CPU side geometry and the procedural shapes used by the built-in scenes.
//!
//! Geometry stays on the CPU until a mesh is drawn or pre-warmed for the first time, at
//! which point the renderer uploads it once.

use cgmath::{InnerSpace, Point3, Vector3};

use crate::light::hex_to_rgb;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    pub fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            color,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

#[derive(Debug, Clone)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Geometry {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, topology: Topology) -> Self {
        Self {
            vertices,
            indices,
            topology,
        }
    }

    /// Number of triangles or line segments.
    pub fn primitive_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::Lines => self.indices.len() / 2,
        }
    }

    /// Bounding sphere in local space, centered on the bounding box.
    pub fn bounding_sphere(&self) -> (Point3<f32>, f32) {
        if self.vertices.is_empty() {
            return (Point3::new(0.0, 0.0, 0.0), 0.0);
        }
        let mut min = Vector3::from(self.vertices[0].position);
        let mut max = min;
        for vertex in &self.vertices {
            let p = Vector3::from(vertex.position);
            min = Vector3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vector3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        let center = (min + max) * 0.5;
        let radius = self
            .vertices
            .iter()
            .map(|v| (Vector3::from(v.position) - center).magnitude())
            .fold(0.0, f32::max);
        (Point3::new(center.x, center.y, center.z), radius)
    }

    /// Flat ring in the XY plane facing +Z.
    pub fn ring(inner_radius: f32, outer_radius: f32, segments: u32, color: [f32; 3]) -> Self {
        let segments = segments.max(3);
        let normal = [0.0, 0.0, 1.0];
        let mut vertices = Vec::with_capacity(2 * (segments as usize + 1));
        for i in 0..=segments {
            let theta = i as f32 / segments as f32 * std::f32::consts::TAU;
            let (sin, cos) = theta.sin_cos();
            vertices.push(Vertex::new([cos * inner_radius, sin * inner_radius, 0.0], normal, color));
            vertices.push(Vertex::new([cos * outer_radius, sin * outer_radius, 0.0], normal, color));
        }
        let mut indices = Vec::with_capacity(6 * segments as usize);
        for i in 0..segments {
            let inner = 2 * i;
            let outer = inner + 1;
            let next_inner = inner + 2;
            let next_outer = inner + 3;
            indices.extend_from_slice(&[inner, outer, next_outer, inner, next_outer, next_inner]);
        }
        Self::new(vertices, indices, Topology::Triangles)
    }

    /// UV sphere around the origin.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32, color: [f32; 3]) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut vertices = Vec::new();
        for y in 0..=height_segments {
            let v = y as f32 / height_segments as f32;
            let phi = v * std::f32::consts::PI;
            for x in 0..=width_segments {
                let u = x as f32 / width_segments as f32;
                let theta = u * std::f32::consts::TAU;
                let normal = Vector3::new(-theta.cos() * phi.sin(), phi.cos(), theta.sin() * phi.sin());
                let position = normal * radius;
                vertices.push(Vertex::new(position.into(), normal.into(), color));
            }
        }
        let row = width_segments + 1;
        let mut indices = Vec::new();
        for y in 0..height_segments {
            for x in 0..width_segments {
                let a = y * row + x + 1;
                let b = y * row + x;
                let c = (y + 1) * row + x;
                let d = (y + 1) * row + x + 1;
                if y != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if y != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        Self::new(vertices, indices, Topology::Triangles)
    }

    /// Square line grid on the XZ plane with highlighted center lines.
    pub fn grid(size: f32, divisions: u32) -> Self {
        let divisions = divisions.max(1);
        let center_color = hex_to_rgb(0x444444);
        let line_color = hex_to_rgb(0x888888);
        let half = size / 2.0;
        let step = size / divisions as f32;
        let normal = [0.0, 1.0, 0.0];
        let mut vertices = Vec::new();
        for i in 0..=divisions {
            let k = -half + i as f32 * step;
            let color = if i == divisions / 2 { center_color } else { line_color };
            vertices.push(Vertex::new([-half, 0.0, k], normal, color));
            vertices.push(Vertex::new([half, 0.0, k], normal, color));
            vertices.push(Vertex::new([k, 0.0, -half], normal, color));
            vertices.push(Vertex::new([k, 0.0, half], normal, color));
        }
        let indices = (0..vertices.len() as u32).collect();
        Self::new(vertices, indices, Topology::Lines)
    }

    /// Red/green/blue lines along +X/+Y/+Z.
    pub fn axes(size: f32) -> Self {
        let axes = [
            ([size, 0.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, size, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, size], [0.0, 0.0, 1.0]),
        ];
        let mut vertices = Vec::with_capacity(6);
        for (end, color) in axes {
            vertices.push(Vertex::new([0.0; 3], [0.0, 1.0, 0.0], color));
            vertices.push(Vertex::new(end, [0.0, 1.0, 0.0], color));
        }
        Self::new(vertices, (0..6).collect(), Topology::Lines)
    }
}
