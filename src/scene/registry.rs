use std::collections::BTreeMap;

use anyhow::anyhow;

use crate::{
    scene::{Scene, SetupContext},
    scenes::{self, EmptyScene, LandingScene, PreloaderScene},
    settings::Settings,
};

pub type SceneFactory = Box<dyn Fn(&SetupContext) -> Box<dyn Scene>>;

/// Scene constructors by id.
///
/// Scenes are built fresh for every switch, so a registry entry is a factory rather than
/// an instance.
#[derive(Default)]
pub struct SceneRegistry {
    factories: BTreeMap<String, SceneFactory>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The scenes shipped with the crate: preloader, landing and empty.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(scenes::PRELOADER, |ctx| Box::new(PreloaderScene::new(ctx)));
        registry.register(scenes::LANDING, |ctx| Box::new(LandingScene::new(ctx)));
        registry.register(scenes::EMPTY, |ctx| Box::new(EmptyScene::new(ctx)));
        registry
    }

    pub fn register(
        &mut self,
        id: impl Into<String>,
        factory: impl Fn(&SetupContext) -> Box<dyn Scene> + 'static,
    ) {
        self.factories.insert(id.into(), Box::new(factory));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, id: &str, ctx: &SetupContext) -> anyhow::Result<Box<dyn Scene>> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| anyhow!("unknown scene `{id}`"))?;
        Ok(factory(ctx))
    }

    /// The first content scene: `sceneId` when it names a registered content scene,
    /// `landing` otherwise.
    pub fn resolve_initial(&self, settings: &Settings) -> String {
        match settings.scene_id.as_deref() {
            Some(id) if id != scenes::PRELOADER && self.contains(id) => id.to_string(),
            Some(id) => {
                log::warn!("sceneId `{id}` is not an allowed scene, using {}", scenes::LANDING);
                scenes::LANDING.to_string()
            }
            None => scenes::LANDING.to_string(),
        }
    }
}
