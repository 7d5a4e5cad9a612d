//! Post-processing graph.
//!
//! The graph owns the two scene slots (A and B), the [`TransitionPass`] that crossfades
//! between them, the [`FinalPass`] that antialiases and applies film effects, and the
//! three render targets these passes render through. Scenes never touch the targets.
//!
//! One call to [`PostProcessing::render`] produces one frame:
//! - crossfade active: update and draw A and B into their targets, blend into the
//!   composite target
//! - otherwise: update and draw only the visible scene into the composite target
//!
//! and finally run the final pass from the composite target to the screen.

pub mod final_pass;
pub mod targets;
pub mod transition;

use crate::{
    camera::Eye,
    gui::DebugPanel,
    render::{Output, RenderBackend, RenderTarget},
    scene::Scene,
    settings::Settings,
    tween::Signal,
    viewport::{BufferSize, Rect},
};

use final_pass::{FilmSettings, FinalPass, FinalUniforms};
use targets::RenderTargetPool;
pub use transition::{Slot, TransitionPass};

const GUI_FOLDER: &str = "post processing";

pub struct PostProcessing<T> {
    scene_a: Option<Box<dyn Scene>>,
    scene_b: Option<Box<dyn Scene>>,
    transition: TransitionPass,
    final_pass: FinalPass,
    targets: RenderTargetPool<T>,
    buffer: BufferSize,
    dev_camera: bool,
    preview_scale: f32,
}

impl<T: RenderTarget> PostProcessing<T> {
    pub fn new<B: RenderBackend<Target = T>>(
        backend: &mut B,
        buffer: BufferSize,
        settings: &Settings,
        panel: &dyn DebugPanel,
    ) -> Self {
        let size = target_size(buffer, settings.dev_camera, settings.viewport_preview_scale);
        let final_pass = FinalPass::new(size, FilmSettings::default());
        panel.add_folder(GUI_FOLDER);
        let uniforms = final_pass.uniforms();
        panel.watch(GUI_FOLDER, "noise intensity", uniforms.noise_intensity);
        panel.watch(GUI_FOLDER, "scanline intensity", uniforms.scanline_intensity);
        Self {
            scene_a: None,
            scene_b: None,
            transition: TransitionPass::new(settings.transition_duration, settings.skip_transitions),
            final_pass,
            targets: RenderTargetPool::new(backend, size),
            buffer,
            dev_camera: settings.dev_camera,
            preview_scale: settings.viewport_preview_scale,
        }
    }

    /// Rebind the blend slots. Scenes that were bound before are handed back to the
    /// caller, which is responsible for disposing them.
    pub fn set_scenes(
        &mut self,
        a: Option<Box<dyn Scene>>,
        b: Option<Box<dyn Scene>>,
    ) -> Vec<Box<dyn Scene>> {
        let old_a = std::mem::replace(&mut self.scene_a, a);
        let old_b = std::mem::replace(&mut self.scene_b, b);
        old_a.into_iter().chain(old_b).collect()
    }

    pub fn scene(&self, slot: Slot) -> Option<&dyn Scene> {
        match slot {
            Slot::A => self.scene_a.as_deref(),
            Slot::B => self.scene_b.as_deref(),
        }
    }

    pub fn scene_mut(&mut self, slot: Slot) -> Option<&mut (dyn Scene + 'static)> {
        match slot {
            Slot::A => self.scene_a.as_deref_mut(),
            Slot::B => self.scene_b.as_deref_mut(),
        }
    }

    /// The scene on screen, or the one being faded to while a crossfade runs.
    pub fn current_scene(&self) -> Option<&dyn Scene> {
        self.scene(self.transition.visible_slot())
    }

    pub fn current_scene_mut(&mut self) -> Option<&mut (dyn Scene + 'static)> {
        self.scene_mut(self.transition.visible_slot())
    }

    pub fn take_current(&mut self) -> Option<Box<dyn Scene>> {
        match self.transition.visible_slot() {
            Slot::A => self.scene_a.take(),
            Slot::B => self.scene_b.take(),
        }
    }

    /// Unbind the outgoing scene once a crossfade no longer reads its target.
    pub fn release_a(&mut self) -> Option<Box<dyn Scene>> {
        self.scene_a.take()
    }

    /// Every bound scene, in slot order.
    pub fn scenes_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Scene>> {
        self.scene_a.iter_mut().chain(self.scene_b.iter_mut())
    }

    pub fn transition(&self) -> &TransitionPass {
        &self.transition
    }

    /// Crossfade from A to B.
    pub fn start_transition(&mut self) -> Signal {
        self.transition.start()
    }

    /// Show B right away.
    pub fn complete_transition(&mut self) {
        self.transition.complete();
    }

    pub fn set_skip_transitions(&mut self, skip: bool) {
        self.transition.set_skip(skip);
    }

    /// Advance the crossfade. Runs before the frame's scene updates.
    pub fn advance(&mut self, dt: f32) {
        self.transition.advance(dt);
    }

    pub fn final_uniforms(&self) -> &FinalUniforms {
        self.final_pass.uniforms()
    }

    pub fn target_size(&self) -> BufferSize {
        self.targets.size()
    }

    pub fn resize<B: RenderBackend<Target = T>>(&mut self, backend: &mut B, buffer: BufferSize) {
        self.buffer = buffer;
        let size = target_size(buffer, self.dev_camera, self.preview_scale);
        self.targets.resize(backend, size);
        self.final_pass.resize(size);
        for scene in self.scenes_mut() {
            scene.resize(buffer);
        }
    }

    /// The dev camera view shows post-processing in a small inset only, so the targets
    /// shrink to the inset size.
    pub fn set_dev_camera<B: RenderBackend<Target = T>>(&mut self, backend: &mut B, enabled: bool) {
        self.dev_camera = enabled;
        self.resize(backend, self.buffer);
    }

    pub fn render<B: RenderBackend<Target = T>>(
        &mut self,
        backend: &mut B,
        dt: f32,
        viewport: Rect,
    ) -> anyhow::Result<()> {
        self.final_pass.advance(dt);
        let factor = self.transition.factor();
        let targets = &self.targets;
        match (self.transition.is_active(), &mut self.scene_a, &mut self.scene_b) {
            (true, Some(a), Some(b)) => {
                a.update(dt);
                b.update(dt);
                backend.draw_scene(a.as_ref(), Eye::Main, Output::Target(&targets.a))?;
                backend.draw_scene(b.as_ref(), Eye::Main, Output::Target(&targets.b))?;
                backend.blend(&targets.a, &targets.b, factor, &targets.composite)?;
            }
            (_, a, b) => {
                let visible = match self.transition.visible_slot() {
                    Slot::A => a,
                    Slot::B => b,
                };
                let Some(scene) = visible else {
                    return backend.clear_screen(wgpu::Color::BLACK);
                };
                scene.update(dt);
                backend.draw_scene(scene.as_ref(), Eye::Main, Output::Target(&targets.composite))?;
            }
        }
        backend.final_pass(&targets.composite, self.final_pass.uniforms(), viewport)
    }
}

fn target_size(buffer: BufferSize, dev_camera: bool, preview_scale: f32) -> BufferSize {
    if dev_camera {
        buffer.scaled(preview_scale)
    } else {
        buffer
    }
}
