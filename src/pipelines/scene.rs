use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        geometry::{Geometry, Vertex},
        scene_graph::{GpuMesh, MeshUniform},
        texture::Texture,
    },
    pipelines::{mk_render_pipeline, uniform_entry},
};

/// Scene pipelines. Group 0 holds the camera and lights, group 1 the mesh uniform.
pub struct ScenePipelines {
    pub frame_layout: wgpu::BindGroupLayout,
    pub mesh_layout: wgpu::BindGroupLayout,
    pub triangles: wgpu::RenderPipeline,
    pub lines: wgpu::RenderPipeline,
}

impl ScenePipelines {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame bind group layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let mesh_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mesh bind group layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[Some(&frame_layout), Some(&mesh_layout)],
            immediate_size: 0,
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });

        let blend = Some(wgpu::BlendState::ALPHA_BLENDING);
        let triangles = mk_render_pipeline(
            device,
            "scene triangles",
            &layout,
            color_format,
            blend,
            Some(Texture::DEPTH_FORMAT),
            &[Vertex::desc()],
            wgpu::PrimitiveTopology::TriangleList,
            &shader,
            "fs_main",
        );
        let lines = mk_render_pipeline(
            device,
            "scene lines",
            &layout,
            color_format,
            blend,
            Some(Texture::DEPTH_FORMAT),
            &[Vertex::desc()],
            wgpu::PrimitiveTopology::LineList,
            &shader,
            "fs_unlit",
        );

        Self {
            frame_layout,
            mesh_layout,
            triangles,
            lines,
        }
    }
}

/// Upload a mesh's geometry and create its uniform buffer and bind group.
pub fn upload_mesh(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, geometry: &Geometry) -> GpuMesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh vertices"),
        contents: bytemuck::cast_slice(&geometry.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("mesh indices"),
        contents: bytemuck::cast_slice(&geometry.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("mesh uniform"),
        size: std::mem::size_of::<MeshUniform>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("mesh bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });
    GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: geometry.indices.len() as u32,
        uniform_buffer,
        bind_group,
    }
}
