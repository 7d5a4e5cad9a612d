//! The render backend contract.
//!
//! The orchestrator and the post-processing graph never talk to wgpu directly. They
//! describe a frame as a sequence of backend operations (draw a scene into a target,
//! blend two targets, run the final pass to the screen) and the backend executes them.
//! [`crate::renderer::GpuRenderer`] is the wgpu implementation; tests substitute a
//! recording backend.

use crate::{
    camera::Eye,
    post_processing::final_pass::FinalUniforms,
    scene::Scene,
    viewport::{BufferSize, Rect},
};

/// An offscreen colour buffer owned by the post-processing graph.
pub trait RenderTarget {
    fn size(&self) -> BufferSize;
}

/// Where a scene draw ends up.
pub enum Output<'a, T> {
    Target(&'a T),
    /// The window surface, restricted to a viewport rectangle.
    Screen(Rect),
}

/// Work done by the backend during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInfo {
    pub draw_calls: u32,
    pub triangles: u64,
    pub lines: u64,
}

impl FrameInfo {
    pub fn add(&mut self, other: FrameInfo) {
        self.draw_calls += other.draw_calls;
        self.triangles += other.triangles;
        self.lines += other.lines;
    }
}

pub trait RenderBackend {
    type Target: RenderTarget;

    fn create_target(&mut self, label: &str, size: BufferSize) -> Self::Target;

    fn resize_target(&mut self, target: &mut Self::Target, size: BufferSize);

    /// Acquire the next frame. `Ok(false)` means the surface is not ready and the frame
    /// should be skipped.
    fn begin_frame(&mut self) -> anyhow::Result<bool>;

    /// Draw a scene, culled, through one of its cameras, cleared to its clear colour.
    fn draw_scene(
        &mut self,
        scene: &dyn Scene,
        eye: Eye,
        output: Output<'_, Self::Target>,
    ) -> anyhow::Result<()>;

    /// Force-render a scene once without any culling, hidden nodes included, so shader
    /// compilation and buffer uploads happen before its first visible frame.
    fn prewarm(&mut self, scene: &dyn Scene) -> anyhow::Result<()>;

    /// `out = mix(a, b, factor)`.
    fn blend(
        &mut self,
        a: &Self::Target,
        b: &Self::Target,
        factor: f32,
        out: &Self::Target,
    ) -> anyhow::Result<()>;

    /// Antialias and film effects from `source` to the screen.
    fn final_pass(
        &mut self,
        source: &Self::Target,
        uniforms: &FinalUniforms,
        viewport: Rect,
    ) -> anyhow::Result<()>;

    /// Fill the screen with a flat colour.
    fn clear_screen(&mut self, color: wgpu::Color) -> anyhow::Result<()>;

    /// Present and report what was drawn.
    fn end_frame(&mut self) -> FrameInfo;

    fn resize_surface(&mut self, size: BufferSize);
}
