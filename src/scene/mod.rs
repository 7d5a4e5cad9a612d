//! The scene lifecycle contract.
//!
//! A scene is a self-contained renderable unit: cameras, lights and a node tree, plus the
//! asset manifest it needs before its content can be built. Concrete scenes hold a
//! [`SceneKit`] for the shared boilerplate and implement [`Scene`] on top of it, usually
//! overriding only [`Scene::create_objects`] and the animation hooks.
//!
//! The orchestrator drives every scene through the same sequence:
//! `setup` -> `animate_in` -> (`update` / `resize` / `handle_input`)* -> `animate_out`
//! -> `dispose`.

use std::{cell::RefCell, rc::Rc};

use futures::future::LocalBoxFuture;
use winit::event::WindowEvent;

use crate::{
    gui::SharedPanel,
    resources::{AssetLoader, AssetManager},
    settings::Settings,
    tween::Signal,
    viewport::BufferSize,
};

pub mod kit;
pub mod registry;

pub use kit::SceneKit;
pub use registry::{SceneFactory, SceneRegistry};

/// Everything a scene needs while it is being built.
#[derive(Clone)]
pub struct SetupContext {
    pub loader: Rc<AssetLoader>,
    pub assets: Rc<RefCell<AssetManager>>,
    pub settings: Rc<Settings>,
    pub panel: SharedPanel,
}

pub trait Scene {
    fn kit(&self) -> &SceneKit;

    fn kit_mut(&mut self) -> &mut SceneKit;

    fn id(&self) -> &str {
        self.kit().id()
    }

    /// Load the manifest, then build helpers, then build content.
    ///
    /// Content construction only starts once every asset of the manifest is stored in
    /// the manager under this scene's id.
    fn setup<'a>(&'a mut self, ctx: &'a SetupContext) -> LocalBoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let group = self.id().to_string();
            let manifest = self.kit().manifest.clone();
            let loaded = ctx.loader.load(&group, manifest).await?;
            ctx.assets.borrow_mut().add(&group, loaded);
            self.kit_mut().create_helpers(ctx.settings.helpers);
            self.create_objects(ctx)
        })
    }

    /// Build scene specific content. Loaded assets are available in `ctx.assets`.
    fn create_objects(&mut self, _ctx: &SetupContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn animate_in(&mut self) -> anyhow::Result<Signal> {
        Ok(Signal::resolved())
    }

    fn animate_out(&mut self) -> anyhow::Result<Signal> {
        Ok(Signal::resolved())
    }

    fn update(&mut self, _dt: f32) {}

    fn resize(&mut self, size: BufferSize) {
        self.kit_mut().resize(size);
    }

    fn handle_input(&mut self, event: &WindowEvent) -> bool {
        self.kit_mut().handle_input(event)
    }

    /// Release GPU resources. Called exactly once, after the scene left the screen.
    fn dispose(&mut self) {
        self.kit_mut().dispose();
    }
}
