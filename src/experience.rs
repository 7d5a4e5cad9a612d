//! Top-level controller.
//!
//! Boots the preloader, starts the render loop and switches to the content scene when
//! the application state becomes ready.

use crate::{
    app_state::AppState,
    orchestrator::{Orchestrator, PhaseKind, SwitchRequest},
    render::RenderTarget,
    scenes,
};

pub struct Experience<T> {
    orchestrator: Orchestrator<T>,
    state: AppState,
    content_scene: String,
}

impl<T: RenderTarget> Experience<T> {
    pub fn new(orchestrator: Orchestrator<T>) -> Self {
        let content_scene = orchestrator
            .registry()
            .resolve_initial(orchestrator.settings());
        Self {
            orchestrator,
            state: AppState::default(),
            content_scene,
        }
    }

    /// Request the preloader and start rendering.
    pub fn setup(&mut self) -> anyhow::Result<()> {
        log::info!("booting, content scene: {}", self.content_scene);
        self.orchestrator.request_scene(scenes::PRELOADER)?;
        self.orchestrator.set_rendering(true);
        Ok(())
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// Replace the application state. The content scene is requested on the edge where
    /// `ready` turns on.
    pub fn set_state(&mut self, state: AppState) -> anyhow::Result<Option<SwitchRequest>> {
        let previous = std::mem::replace(&mut self.state, state);
        if !state.became_ready(&previous) {
            return Ok(None);
        }
        log::debug!("ready, switching to {}", self.content_scene);
        self.orchestrator.request_scene(&self.content_scene).map(Some)
    }

    /// The preloader is on screen with nothing else in flight.
    pub fn preloader_settled(&self) -> bool {
        self.orchestrator.phase() == PhaseKind::Idle
            && self.orchestrator.current_id() == Some(scenes::PRELOADER)
    }

    pub fn content_scene(&self) -> &str {
        &self.content_scene
    }

    pub fn orchestrator(&self) -> &Orchestrator<T> {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator<T> {
        &mut self.orchestrator
    }
}
