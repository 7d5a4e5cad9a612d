use crate::{
    data_structures::texture::{Texture, create_clamped_sampler},
    pipelines::{mk_render_pipeline, uniform_entry},
    post_processing::final_pass::FinalUniforms,
};

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    color_format: wgpu::TextureFormat,
    source: &str,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[Some(layout)],
        immediate_size: 0,
    });
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    mk_render_pipeline(
        device,
        label,
        &pipeline_layout,
        color_format,
        Some(wgpu::BlendState::REPLACE),
        None,
        &[],
        wgpu::PrimitiveTopology::TriangleList,
        &shader,
        "fs_main",
    )
}

/// The crossfade and final screen passes. Both draw one fullscreen triangle.
pub struct PostPipelines {
    transition_layout: wgpu::BindGroupLayout,
    transition: wgpu::RenderPipeline,
    factor_buffer: wgpu::Buffer,
    final_layout: wgpu::BindGroupLayout,
    final_pipeline: wgpu::RenderPipeline,
    final_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
}

impl PostPipelines {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let transition_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("transition bind group layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                sampler_entry(2),
                uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let final_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("final bind group layout"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let transition = fullscreen_pipeline(
            device,
            "transition pass",
            &transition_layout,
            color_format,
            include_str!("transition.wgsl"),
        );
        let final_pipeline = fullscreen_pipeline(
            device,
            "final pass",
            &final_layout,
            color_format,
            include_str!("final.wgsl"),
        );
        // vec4 so the buffer satisfies the 16 byte minimum of WebGL2 uniform blocks.
        let factor_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("transition uniform"),
            size: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let final_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("final uniform"),
            size: std::mem::size_of::<FinalUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            transition_layout,
            transition,
            factor_buffer,
            final_layout,
            final_pipeline,
            final_buffer,
            sampler: create_clamped_sampler(device),
        }
    }

    /// Write the factor and bind both inputs. Returns the pipeline and bind group to draw.
    pub fn prepare_transition(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        a: &Texture,
        b: &Texture,
        factor: f32,
    ) -> (&wgpu::RenderPipeline, wgpu::BindGroup) {
        queue.write_buffer(&self.factor_buffer, 0, bytemuck::cast_slice(&[factor, 0.0, 0.0, 0.0]));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("transition bind group"),
            layout: &self.transition_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&a.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&b.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.factor_buffer.as_entire_binding(),
                },
            ],
        });
        (&self.transition, bind_group)
    }

    pub fn prepare_final(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &Texture,
        uniforms: &FinalUniforms,
    ) -> (&wgpu::RenderPipeline, wgpu::BindGroup) {
        queue.write_buffer(&self.final_buffer, 0, bytemuck::bytes_of(uniforms));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("final bind group"),
            layout: &self.final_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.final_buffer.as_entire_binding(),
                },
            ],
        });
        (&self.final_pipeline, bind_group)
    }
}
