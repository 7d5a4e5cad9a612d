//! Asset descriptors, fetching, bounded-parallel loading and storage.
//!
//! Scenes declare the assets they need as a manifest of [`Asset`] descriptors. The
//! [`loader::AssetLoader`] fetches and decodes a manifest with bounded concurrency and
//! reports progress over typed channels; the [`manager::AssetManager`] stores the results
//! per group (scene id) for synchronous lookup while the scene builds its content.

use std::sync::Arc;

use anyhow::{Context, anyhow};

use crate::data_structures::texture::Texture;

pub mod fetch;
pub mod loader;
pub mod manager;
pub mod models;

pub use fetch::{Fetch, default_fetcher};
pub use loader::{AssetLoader, LoadEvent};
pub use manager::AssetManager;
pub use models::{GltfModel, ObjModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Decoded into an `image::DynamicImage`.
    Image,
    Json,
    /// Uploaded to the GPU as a sampled texture.
    Texture,
    /// glTF / GLB model.
    Gltf,
    /// Wavefront OBJ model with optional MTL file.
    Obj,
}

impl AssetKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(Self::Image),
            "json" => Some(Self::Json),
            "texture" => Some(Self::Texture),
            "gltf" => Some(Self::Gltf),
            "obj" => Some(Self::Obj),
            _ => None,
        }
    }
}

/// A loaded payload. Cheap to clone, the data itself is shared.
#[derive(Debug, Clone)]
pub enum AssetData {
    Image(Arc<image::DynamicImage>),
    Json(Arc<serde_json::Value>),
    Texture(Arc<Texture>),
    Gltf(Arc<GltfModel>),
    Obj(Arc<ObjModel>),
}

impl AssetData {
    pub fn as_image(&self) -> Option<&image::DynamicImage> {
        match self {
            AssetData::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            AssetData::Json(json) => Some(json),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<&Texture> {
        match self {
            AssetData::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn as_gltf(&self) -> Option<&GltfModel> {
        match self {
            AssetData::Gltf(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<&ObjModel> {
        match self {
            AssetData::Obj(model) => Some(model),
            _ => None,
        }
    }
}

/// Declarative asset descriptor. `data` is filled exactly once, by the loader.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: String,
    pub src: String,
    pub kind: AssetKind,
    pub args: Option<serde_json::Value>,
    pub data: Option<AssetData>,
}

impl Asset {
    pub fn new(id: impl Into<String>, src: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            kind,
            args: None,
            data: None,
        }
    }

    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = Some(args);
        self
    }

    /// Parse `{ "id": .., "src": .., "type": .., "args": {..} }`.
    pub fn from_descriptor(value: &serde_json::Value) -> anyhow::Result<Self> {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(serde_json::Value::as_str)
                .with_context(|| format!("asset descriptor is missing `{name}`"))
        };
        let kind_name = field("type")?;
        let kind = AssetKind::parse(kind_name)
            .ok_or_else(|| anyhow!("unknown asset type `{kind_name}`"))?;
        let mut asset = Asset::new(field("id")?, field("src")?, kind);
        asset.args = value.get("args").cloned();
        Ok(asset)
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// Boolean loader argument, false when absent.
    pub fn flag(&self, name: &str) -> bool {
        self.args
            .as_ref()
            .and_then(|args| args.get(name))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}
