//! The wgpu render backend.
//!
//! Every backend operation records its own command encoder and submits it right away.
//! The camera and light uniforms are shared by all scene draws, and a queued buffer
//! write only lands before the next submit, so draws must not be batched into one
//! encoder.

use anyhow::{Context as _, anyhow};

use crate::{
    camera::{CameraUniform, Eye},
    context::{Context, GpuHandles},
    data_structures::{
        geometry::Topology,
        scene_graph::{Culling, MeshUniform},
        texture::Texture,
    },
    light::LightUniform,
    pipelines::{
        post::PostPipelines,
        scene::{ScenePipelines, upload_mesh},
    },
    post_processing::final_pass::FinalUniforms,
    render::{FrameInfo, Output, RenderBackend, RenderTarget},
    scene::Scene,
    viewport::{BufferSize, Rect},
};

const PREWARM_SIZE: u32 = 64;

/// Offscreen colour buffer with its own depth buffer.
pub struct GpuTarget {
    pub color: Texture,
    pub depth: Texture,
    label: String,
    size: BufferSize,
}

impl RenderTarget for GpuTarget {
    fn size(&self) -> BufferSize {
        self.size
    }
}

struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    /// The first screen pass of a frame clears, later ones draw on top.
    screen_cleared: bool,
}

/// Where a scene draw writes to.
struct Attachments<'a> {
    color: &'a wgpu::TextureView,
    depth: &'a wgpu::TextureView,
    viewport: Option<Rect>,
    clear: bool,
}

pub struct GpuRenderer {
    ctx: Context,
    scene_pipelines: ScenePipelines,
    post: PostPipelines,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    screen_depth: Texture,
    prewarm_target: GpuTarget,
    frame: Option<Frame>,
    info: FrameInfo,
}

impl GpuRenderer {
    pub fn new(ctx: Context) -> Self {
        let device = &ctx.device;
        let format = ctx.config.format;
        let scene_pipelines = ScenePipelines::new(device, format);
        let post = PostPipelines::new(device, format);

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera uniform"),
            size: std::mem::size_of::<CameraUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("light uniform"),
            size: std::mem::size_of::<LightUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame bind group"),
            layout: &scene_pipelines.frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
            ],
        });
        let screen_depth = Texture::create_depth_texture(
            device,
            [ctx.config.width, ctx.config.height],
            "screen depth",
        );
        let prewarm_target = make_target(
            device,
            format,
            "prewarm target",
            BufferSize::new(PREWARM_SIZE, PREWARM_SIZE),
        );

        Self {
            ctx,
            scene_pipelines,
            post,
            camera_buffer,
            light_buffer,
            frame_bind_group,
            screen_depth,
            prewarm_target,
            frame: None,
            info: FrameInfo::default(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn gpu_handles(&self) -> GpuHandles {
        GpuHandles::from(&self.ctx)
    }

    fn draw_into(&self, scene: &dyn Scene, eye: Eye, culling: Culling, out: Attachments<'_>) -> FrameInfo {
        let device = &self.ctx.device;
        let queue = &self.ctx.queue;
        let kit = scene.kit();

        let mut camera = CameraUniform::new();
        camera.update_view_proj(kit.camera(eye));
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera));
        let lights = LightUniform::from_lights(&kit.lights);
        queue.write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(&lights));

        let mut items = kit.root.draw_list(&culling);
        // Opaque first so transparent meshes blend over them.
        items.sort_by_key(|item| item.mesh.material.transparent);
        for item in &items {
            let gpu = item.mesh.gpu_or_upload(|geometry| {
                upload_mesh(device, &self.scene_pipelines.mesh_layout, geometry)
            });
            let uniform = MeshUniform::new(&item.world, &item.mesh.material);
            queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
        }

        let mut info = FrameInfo::default();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene encoder"),
        });
        {
            let load = if out.clear {
                wgpu::LoadOp::Clear(kit.clear_color)
            } else {
                wgpu::LoadOp::Load
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: out.color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: out.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            if let Some(rect) = out.viewport {
                set_viewport(&mut pass, rect);
            }
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for item in &items {
                let Some(gpu) = item.mesh.gpu() else {
                    continue;
                };
                if gpu.index_count == 0 {
                    continue;
                }
                let primitives = item.mesh.geometry.primitive_count() as u64;
                match item.mesh.topology() {
                    Topology::Triangles => {
                        pass.set_pipeline(&self.scene_pipelines.triangles);
                        info.triangles += primitives;
                    }
                    Topology::Lines => {
                        pass.set_pipeline(&self.scene_pipelines.lines);
                        info.lines += primitives;
                    }
                }
                pass.set_bind_group(1, &gpu.bind_group, &[]);
                pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..gpu.index_count, 0, 0..1);
                info.draw_calls += 1;
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
        info
    }

    /// Draw one fullscreen triangle.
    fn fullscreen(
        &self,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        view: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
        viewport: Option<Rect>,
    ) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            if let Some(rect) = viewport {
                set_viewport(&mut pass, rect);
            }
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Clear op for the next screen pass. Marks the screen as cleared.
    fn screen_load(&mut self, color: wgpu::Color) -> anyhow::Result<wgpu::LoadOp<wgpu::Color>> {
        let frame = self.frame.as_mut().context("no frame in progress")?;
        let load = if frame.screen_cleared {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(color)
        };
        frame.screen_cleared = true;
        Ok(load)
    }

    fn clamp_to_surface(&self, rect: Rect) -> Rect {
        let width = self.ctx.config.width;
        let height = self.ctx.config.height;
        let x = rect.x.min(width.saturating_sub(1));
        let y = rect.y.min(height.saturating_sub(1));
        Rect {
            x,
            y,
            width: rect.width.min(width - x).max(1),
            height: rect.height.min(height - y).max(1),
        }
    }
}

fn make_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    label: &str,
    size: BufferSize,
) -> GpuTarget {
    let dimensions = [size.width, size.height];
    GpuTarget {
        color: Texture::create_render_target(device, dimensions, format, label),
        depth: Texture::create_depth_texture(device, dimensions, &format!("{label} depth")),
        label: label.to_string(),
        size,
    }
}

fn set_viewport(pass: &mut wgpu::RenderPass<'_>, rect: Rect) {
    pass.set_viewport(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
        0.0,
        1.0,
    );
    pass.set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
}

impl RenderBackend for GpuRenderer {
    type Target = GpuTarget;

    fn create_target(&mut self, label: &str, size: BufferSize) -> GpuTarget {
        make_target(&self.ctx.device, self.ctx.config.format, label, size)
    }

    fn resize_target(&mut self, target: &mut GpuTarget, size: BufferSize) {
        if target.size == size {
            return;
        }
        target.color.texture.destroy();
        target.depth.texture.destroy();
        *target = make_target(&self.ctx.device, self.ctx.config.format, &target.label, size);
    }

    fn begin_frame(&mut self) -> anyhow::Result<bool> {
        self.info = FrameInfo::default();
        let surface_texture = match self.ctx.surface.get_current_texture() {
            // Suboptimal frames are still presentable. The next resize reconfigures.
            wgpu::CurrentSurfaceTexture::Success(texture)
            | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => texture,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                log::warn!("surface lost, reconfiguring");
                self.ctx.surface.configure(&self.ctx.device, &self.ctx.config);
                return Ok(false);
            }
            wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                log::debug!("no surface texture available, skipping frame");
                return Ok(false);
            }
            wgpu::CurrentSurfaceTexture::Validation => {
                return Err(anyhow!("acquiring the next frame failed validation"));
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(Frame {
            surface_texture,
            view,
            screen_cleared: false,
        });
        Ok(true)
    }

    fn draw_scene(&mut self, scene: &dyn Scene, eye: Eye, output: Output<'_, GpuTarget>) -> anyhow::Result<()> {
        let culling = Culling::Frustum(scene.kit().camera(eye).frustum());
        let info = match output {
            Output::Target(target) => self.draw_into(
                scene,
                eye,
                culling,
                Attachments {
                    color: &target.color.view,
                    depth: &target.depth.view,
                    viewport: None,
                    clear: true,
                },
            ),
            Output::Screen(rect) => {
                let clear = matches!(self.screen_load(scene.kit().clear_color)?, wgpu::LoadOp::Clear(_));
                let rect = self.clamp_to_surface(rect);
                let frame = self.frame.as_ref().context("no frame in progress")?;
                self.draw_into(
                    scene,
                    eye,
                    culling,
                    Attachments {
                        color: &frame.view,
                        depth: &self.screen_depth.view,
                        viewport: Some(rect),
                        clear,
                    },
                )
            }
        };
        self.info.add(info);
        Ok(())
    }

    fn prewarm(&mut self, scene: &dyn Scene) -> anyhow::Result<()> {
        let info = self.draw_into(
            scene,
            Eye::Main,
            Culling::Disabled,
            Attachments {
                color: &self.prewarm_target.color.view,
                depth: &self.prewarm_target.depth.view,
                viewport: None,
                clear: true,
            },
        );
        log::debug!("pre-warmed {}: {} draw calls", scene.id(), info.draw_calls);
        Ok(())
    }

    fn blend(&mut self, a: &GpuTarget, b: &GpuTarget, factor: f32, out: &GpuTarget) -> anyhow::Result<()> {
        let (pipeline, bind_group) =
            self.post
                .prepare_transition(&self.ctx.device, &self.ctx.queue, &a.color, &b.color, factor);
        self.fullscreen(
            "transition pass",
            pipeline,
            &bind_group,
            &out.color.view,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            None,
        );
        self.info.draw_calls += 1;
        Ok(())
    }

    fn final_pass(&mut self, source: &GpuTarget, uniforms: &FinalUniforms, viewport: Rect) -> anyhow::Result<()> {
        let load = self.screen_load(wgpu::Color::BLACK)?;
        let viewport = self.clamp_to_surface(viewport);
        let frame = self.frame.as_ref().context("no frame in progress")?;
        let (pipeline, bind_group) =
            self.post
                .prepare_final(&self.ctx.device, &self.ctx.queue, &source.color, uniforms);
        self.fullscreen("final pass", pipeline, &bind_group, &frame.view, load, Some(viewport));
        self.info.draw_calls += 1;
        Ok(())
    }

    fn clear_screen(&mut self, color: wgpu::Color) -> anyhow::Result<()> {
        let frame = self.frame.as_mut().context("no frame in progress")?;
        frame.screen_cleared = true;
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn end_frame(&mut self) -> FrameInfo {
        if let Some(frame) = self.frame.take() {
            self.ctx.window().pre_present_notify();
            frame.surface_texture.present();
        }
        self.info
    }

    fn resize_surface(&mut self, size: BufferSize) {
        self.ctx.configure(size);
        self.screen_depth =
            Texture::create_depth_texture(&self.ctx.device, [size.width, size.height], "screen depth");
    }
}
