//! Scene switching and the per-frame render driver.
//!
//! The orchestrator owns the current scene (through the post-processing graph's slots)
//! and is the only component that creates, promotes and disposes scenes. A switch walks
//! through these phases:
//!
//! ```text
//! Idle --request--> Loading --setup ok--> AnimatingOut --previous faded--> Transitioning
//!   ^                  |                      (skipped for the first scene)      |
//!   |                  +--setup failed--> Idle / Failed                 crossfade done,
//!   |                                                                   previous disposed
//!   +------------------------------ AnimatingIn <------------------------------+
//! ```
//!
//! Scene setup is asynchronous. [`Orchestrator::request_scene`] only queues a setup
//! future; the host drives it (see [`Orchestrator::drain_setup_tasks`]) and hands the
//! outcome back through [`Orchestrator::finish_setup`]. Everything else advances from
//! [`Orchestrator::frame`], driven by completion signals of the fades and the crossfade.
//!
//! A request for a scene that is already current, or already on its way in, is ignored.
//! A request for another scene while a switch is in flight is queued; only the latest
//! queued request survives and it starts as soon as the running switch settles.

use std::{cell::RefCell, rc::Rc};

use anyhow::{Context, bail};
use futures::future::LocalBoxFuture;
use instant::Instant;
use winit::event::WindowEvent;

use crate::{
    camera::Eye,
    graphics::GraphicsConfig,
    post_processing::PostProcessing,
    render::{Output, RenderBackend, RenderTarget},
    resources::AssetManager,
    scene::{Scene, SceneRegistry, SetupContext},
    settings::{Settings, SettingsChange},
    stats::RenderStats,
    tween::Signal,
    viewport::ViewportState,
};

/// Shown when the very first scene failed to set up and there is nothing to fall back to.
pub const FAILED_CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.25,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

/// A pending scene setup, to be driven to completion by the host.
pub type SetupTask = LocalBoxFuture<'static, SetupOutcome>;

pub struct SetupOutcome {
    pub scene: Box<dyn Scene>,
    pub result: anyhow::Result<()>,
    generation: u64,
}

/// What [`Orchestrator::request_scene`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRequest {
    Started,
    AlreadyCurrent,
    AlreadyPending,
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    Loading,
    AnimatingOut,
    Transitioning,
    AnimatingIn,
    Failed,
}

enum Phase {
    Idle,
    Loading {
        target: String,
        generation: u64,
    },
    /// The new scene is set up and waits for the current one to fade out.
    AnimatingOut {
        target: Box<dyn Scene>,
        signal: Signal,
    },
    /// The new scene is current, the previous one is still blended in from slot A.
    Transitioning {
        target: String,
        animate_in: Signal,
        crossfade: Signal,
    },
    AnimatingIn {
        target: String,
        signal: Signal,
    },
    /// The first scene failed. Nothing to show until another request succeeds.
    Failed {
        message: String,
    },
}

impl Phase {
    fn kind(&self) -> PhaseKind {
        match self {
            Phase::Idle => PhaseKind::Idle,
            Phase::Loading { .. } => PhaseKind::Loading,
            Phase::AnimatingOut { .. } => PhaseKind::AnimatingOut,
            Phase::Transitioning { .. } => PhaseKind::Transitioning,
            Phase::AnimatingIn { .. } => PhaseKind::AnimatingIn,
            Phase::Failed { .. } => PhaseKind::Failed,
        }
    }

    /// The scene a running switch is heading to.
    fn target(&self) -> Option<&str> {
        match self {
            Phase::Loading { target, .. }
            | Phase::Transitioning { target, .. }
            | Phase::AnimatingIn { target, .. } => Some(target),
            Phase::AnimatingOut { target, .. } => Some(target.id()),
            Phase::Idle | Phase::Failed { .. } => None,
        }
    }
}

pub struct Orchestrator<T> {
    registry: SceneRegistry,
    ctx: SetupContext,
    graphics: GraphicsConfig,
    viewport: ViewportState,
    graph: PostProcessing<T>,
    phase: Phase,
    queued: Option<String>,
    generation: u64,
    setup_tasks: Vec<SetupTask>,
    rendering: bool,
    last_tick: Option<Instant>,
    stats: RenderStats,
}

impl<T: RenderTarget> Orchestrator<T> {
    pub fn new<B: RenderBackend<Target = T>>(
        backend: &mut B,
        registry: SceneRegistry,
        ctx: SetupContext,
        graphics: GraphicsConfig,
        window: (u32, u32),
        device_pixel_ratio: f64,
    ) -> Self {
        let settings = ctx.settings.clone();
        let viewport = ViewportState::compute(
            window.0,
            window.1,
            device_pixel_ratio,
            &graphics,
            settings.render_buffer_fullscreen,
            settings.viewport_preview_scale,
        );
        log::info!(
            "window {}x{} @{device_pixel_ratio}, render buffer {}x{}",
            viewport.window.width,
            viewport.window.height,
            viewport.buffer.width,
            viewport.buffer.height
        );
        backend.resize_surface(viewport.surface);
        let graph = PostProcessing::new(backend, viewport.buffer, &settings, ctx.panel.as_ref());
        Self {
            registry,
            ctx,
            graphics,
            viewport,
            graph,
            phase: Phase::Idle,
            queued: None,
            generation: 0,
            setup_tasks: Vec::new(),
            rendering: false,
            last_tick: None,
            stats: RenderStats::new(settings.stats),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn assets(&self) -> Rc<RefCell<AssetManager>> {
        self.ctx.assets.clone()
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn graph(&self) -> &PostProcessing<T> {
        &self.graph
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn phase(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// The message of the failed first scene.
    pub fn failure(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn current_id(&self) -> Option<&str> {
        self.graph.current_scene().map(|scene| scene.id())
    }

    pub fn current_scene(&self) -> Option<&dyn Scene> {
        self.graph.current_scene()
    }

    pub fn queued(&self) -> Option<&str> {
        self.queued.as_deref()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn request_scene(&mut self, id: &str) -> anyhow::Result<SwitchRequest> {
        if !self.registry.contains(id) {
            bail!("unknown scene `{id}`");
        }
        let is_current = self.current_id() == Some(id);
        let heading_to = self.phase.target().map(|target| target == id);
        let request = match heading_to {
            None if is_current => SwitchRequest::AlreadyCurrent,
            None => {
                self.start(id)?;
                SwitchRequest::Started
            }
            Some(true) => {
                self.queued = None;
                if is_current {
                    SwitchRequest::AlreadyCurrent
                } else {
                    SwitchRequest::AlreadyPending
                }
            }
            Some(false) => {
                if let Some(replaced) = self.queued.replace(id.to_string()) {
                    log::warn!("scene request {replaced} replaced by {id}");
                }
                SwitchRequest::Queued
            }
        };
        log::debug!("request {id}: {request:?}");
        Ok(request)
    }

    fn start(&mut self, id: &str) -> anyhow::Result<()> {
        let mut scene = self.registry.create(id, &self.ctx)?;
        scene.resize(self.viewport.buffer);
        self.generation += 1;
        let generation = self.generation;
        let ctx = self.ctx.clone();
        self.setup_tasks.push(Box::pin(async move {
            let result = scene.setup(&ctx).await;
            SetupOutcome {
                scene,
                result,
                generation,
            }
        }));
        self.phase = Phase::Loading {
            target: id.to_string(),
            generation,
        };
        log::debug!("loading scene {id}");
        Ok(())
    }

    fn start_queued(&mut self) {
        let Some(id) = self.queued.take() else {
            return;
        };
        if self.current_id() == Some(id.as_str()) {
            log::debug!("queued scene {id} is already current");
            return;
        }
        if let Err(e) = self.start(&id) {
            log::error!("starting queued scene {id} failed: {e:#}");
        }
    }

    /// Hand the pending setup futures to the host.
    pub fn drain_setup_tasks(&mut self) -> Vec<SetupTask> {
        std::mem::take(&mut self.setup_tasks)
    }

    /// Continue a switch once its scene finished `setup`.
    ///
    /// On success the scene is pre-warmed and the current scene starts fading out. On
    /// failure the new scene is disposed and the current scene stays on screen; the
    /// error is returned. Outcomes of superseded switches are disposed and ignored.
    pub fn finish_setup<B: RenderBackend<Target = T>>(
        &mut self,
        backend: &mut B,
        outcome: SetupOutcome,
    ) -> anyhow::Result<()> {
        let SetupOutcome {
            mut scene,
            result,
            generation,
        } = outcome;
        let id = scene.id().to_string();
        let expected = matches!(self.phase, Phase::Loading { generation: g, .. } if g == generation);
        if !expected {
            log::warn!("discarding stale setup of {id}");
            scene.dispose();
            if self.current_id() != Some(id.as_str()) && self.phase.target() != Some(id.as_str()) {
                self.ctx.assets.borrow_mut().remove_group(&id);
            }
            return Ok(());
        }

        let result = result.and_then(|()| {
            backend
                .prewarm(scene.as_ref())
                .with_context(|| format!("pre-warming {id}"))
        });
        if let Err(e) = result {
            self.dispose_scene(scene);
            let message = format!("{e:#}");
            log::error!("switch to {id} failed: {message}");
            self.phase = if self.graph.current_scene().is_some() {
                Phase::Idle
            } else {
                Phase::Failed { message }
            };
            self.start_queued();
            return Err(e.context(format!("switching to scene `{id}` failed")));
        }
        log::debug!("scene {id} is set up");

        scene.resize(self.viewport.buffer);
        let settings = self.ctx.settings.clone();
        scene.kit_mut().set_dev_camera(settings.dev_camera);
        scene.kit_mut().set_helpers_visible(settings.helpers);

        let animate_out = self.graph.current_scene_mut().map(|previous| {
            previous
                .animate_out()
                .with_context(|| format!("animating out {}", previous.id()))
        });
        match animate_out {
            Some(Ok(signal)) => {
                self.phase = Phase::AnimatingOut {
                    target: scene,
                    signal,
                }
            }
            Some(Err(e)) => {
                log::warn!("{e:#}");
                self.promote(scene);
            }
            None => self.promote(scene),
        }
        Ok(())
    }

    fn promote(&mut self, mut target: Box<dyn Scene>) {
        let id = target.id().to_string();
        let animate_in = target.animate_in().unwrap_or_else(|e| {
            log::warn!("animating in {id}: {e:#}");
            Signal::resolved()
        });
        match self.graph.take_current() {
            Some(previous) => {
                let displaced = self.graph.set_scenes(Some(previous), Some(target));
                self.dispose_all(displaced);
                let crossfade = self.graph.start_transition();
                self.phase = Phase::Transitioning {
                    target: id.clone(),
                    animate_in,
                    crossfade,
                };
            }
            None => {
                let displaced = self.graph.set_scenes(None, Some(target));
                self.dispose_all(displaced);
                self.graph.complete_transition();
                self.phase = Phase::AnimatingIn {
                    target: id.clone(),
                    signal: animate_in,
                };
            }
        }
        log::debug!("promoted {id}");
    }

    fn dispose_scene(&mut self, mut scene: Box<dyn Scene>) {
        scene.dispose();
        self.ctx.assets.borrow_mut().remove_group(scene.id());
    }

    fn dispose_all(&mut self, scenes: Vec<Box<dyn Scene>>) {
        for scene in scenes {
            self.dispose_scene(scene);
        }
    }

    fn step_phase(&mut self) {
        while self.step_once() {}
    }

    fn step_once(&mut self) -> bool {
        let settled = match &self.phase {
            Phase::AnimatingOut { signal, .. } => signal.is_settled(),
            Phase::Transitioning { crossfade, .. } => crossfade.is_settled(),
            Phase::AnimatingIn { signal, .. } => signal.is_settled(),
            _ => false,
        };
        if !settled {
            return false;
        }
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::AnimatingOut { target, .. } => self.promote(target),
            Phase::Transitioning {
                target, animate_in, ..
            } => {
                // The crossfade no longer samples slot A.
                if let Some(previous) = self.graph.release_a() {
                    log::debug!("disposing {}", previous.id());
                    self.dispose_scene(previous);
                }
                self.phase = Phase::AnimatingIn {
                    target,
                    signal: animate_in,
                };
            }
            Phase::AnimatingIn { target, .. } => {
                log::debug!("scene {target} is current");
                self.start_queued();
            }
            other => self.phase = other,
        }
        true
    }

    /// Render one frame `dt` seconds after the previous one.
    pub fn frame<B: RenderBackend<Target = T>>(
        &mut self,
        backend: &mut B,
        dt: f32,
    ) -> anyhow::Result<()> {
        self.graph.advance(dt);
        self.step_phase();
        if !backend.begin_frame()? {
            return Ok(());
        }
        let result = self.draw(backend, dt);
        let info = backend.end_frame();
        self.stats.record(info, dt);
        result
    }

    fn draw<B: RenderBackend<Target = T>>(&mut self, backend: &mut B, dt: f32) -> anyhow::Result<()> {
        if let Phase::Failed { .. } = self.phase {
            return backend.clear_screen(FAILED_CLEAR_COLOR);
        }
        let main = self.viewport.to_surface(self.viewport.main);
        if self.ctx.settings.dev_camera {
            if let Some(scene) = self.graph.current_scene() {
                backend.draw_scene(scene, Eye::Dev, Output::Screen(main))?;
            }
            let inset = self.viewport.to_surface(self.viewport.debug);
            self.graph.render(backend, dt, inset)
        } else {
            self.graph.render(backend, dt, main)
        }
    }

    /// Render a frame if the loop is running, timing it against the previous tick.
    pub fn tick<B: RenderBackend<Target = T>>(
        &mut self,
        backend: &mut B,
        now: Instant,
    ) -> anyhow::Result<()> {
        if !self.rendering {
            return Ok(());
        }
        let dt = self
            .last_tick
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last_tick = Some(now);
        self.frame(backend, dt)
    }

    /// Start or stop the render loop. A stopped loop produces no frames and restarts its
    /// clock when resumed.
    pub fn set_rendering(&mut self, rendering: bool) {
        if self.rendering != rendering {
            log::debug!("rendering {}", if rendering { "started" } else { "stopped" });
        }
        self.rendering = rendering;
        if !rendering {
            self.last_tick = None;
        }
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    pub fn resize<B: RenderBackend<Target = T>>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
        device_pixel_ratio: f64,
    ) {
        let settings = self.ctx.settings.clone();
        self.viewport = ViewportState::compute(
            width,
            height,
            device_pixel_ratio,
            &self.graphics,
            settings.render_buffer_fullscreen,
            settings.viewport_preview_scale,
        );
        let buffer = self.viewport.buffer;
        log::debug!(
            "resized to {width}x{height}, render buffer {}x{}",
            buffer.width,
            buffer.height
        );
        backend.resize_surface(self.viewport.surface);
        self.graph.resize(backend, buffer);
        if let Phase::AnimatingOut { target, .. } = &mut self.phase {
            target.resize(buffer);
        }
    }

    /// Apply a runtime settings toggle to everything that depends on it.
    pub fn apply_settings<B: RenderBackend<Target = T>>(
        &mut self,
        backend: &mut B,
        change: SettingsChange,
    ) {
        let next = self.ctx.settings.apply(change);
        if next == *self.ctx.settings {
            return;
        }
        log::debug!("settings changed: {change:?}");
        self.ctx.settings = Rc::new(next);
        match change {
            SettingsChange::DevCamera(enabled) => {
                self.graph.set_dev_camera(backend, enabled);
                self.for_each_live_scene(|scene| scene.kit_mut().set_dev_camera(enabled));
            }
            SettingsChange::Helpers(visible) => {
                self.for_each_live_scene(|scene| scene.kit_mut().set_helpers_visible(visible));
            }
        }
    }

    fn for_each_live_scene(&mut self, mut f: impl FnMut(&mut dyn Scene)) {
        for scene in self.graph.scenes_mut() {
            f(scene.as_mut());
        }
        if let Phase::AnimatingOut { target, .. } = &mut self.phase {
            f(target.as_mut());
        }
    }

    /// Forward input to the current scene. Returns whether it was consumed.
    pub fn handle_input(&mut self, event: &WindowEvent) -> bool {
        self.graph
            .current_scene_mut()
            .is_some_and(|scene| scene.handle_input(event))
    }

    /// Stop rendering and dispose every scene, pending ones included.
    pub fn shutdown(&mut self) {
        self.set_rendering(false);
        self.setup_tasks.clear();
        self.queued = None;
        if let Phase::AnimatingOut { target, .. } = std::mem::replace(&mut self.phase, Phase::Idle) {
            self.dispose_scene(target);
        }
        let scenes = self.graph.set_scenes(None, None);
        self.dispose_all(scenes);
        log::debug!("orchestrator shut down");
    }
}
