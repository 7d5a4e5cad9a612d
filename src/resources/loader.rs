//! Bounded-parallel asset loading.
//!
//! A manifest is loaded as one group: at most `parallelism` fetches are in flight, each
//! completion emits a [`LoadEvent::Progress`], and the group ends with exactly one
//! [`LoadEvent::Loaded`] or, on the first failure, exactly one [`LoadEvent::Error`].

use std::{cell::RefCell, path::Path, rc::Rc, sync::Arc};

use anyhow::Context;
use futures::{
    StreamExt,
    channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded},
    stream::FuturesUnordered,
};

use crate::{
    context::GpuHandles,
    data_structures::texture::Texture,
    resources::{
        Asset, AssetData, AssetKind, GltfModel, ObjModel,
        fetch::Fetch,
    },
    settings::DeviceClass,
};

pub const DESKTOP_PARALLELISM: usize = 10;
pub const MOBILE_PARALLELISM: usize = 5;

/// Notifications for subscribers of a loader.
#[derive(Debug, Clone)]
pub enum LoadEvent {
    /// `loaded / total` after every completed asset.
    Progress { group: String, progress: f32 },
    Loaded { group: String, assets: Vec<Asset> },
    Error { group: String, message: String },
}

pub struct AssetLoader {
    fetcher: Rc<dyn Fetch>,
    gpu: Option<GpuHandles>,
    parallelism: usize,
    subscribers: RefCell<Vec<UnboundedSender<LoadEvent>>>,
}

impl AssetLoader {
    pub fn new(fetcher: Rc<dyn Fetch>, device_class: DeviceClass) -> Self {
        let parallelism = match device_class {
            DeviceClass::Desktop => DESKTOP_PARALLELISM,
            DeviceClass::Mobile => MOBILE_PARALLELISM,
        };
        Self {
            fetcher,
            gpu: None,
            parallelism,
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Texture assets are uploaded with these handles. Without them they fail to load.
    pub fn with_gpu(mut self, gpu: GpuHandles) -> Self {
        self.gpu = Some(gpu);
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn fetcher(&self) -> &dyn Fetch {
        self.fetcher.as_ref()
    }

    /// Receive every event this loader emits from now on.
    pub fn subscribe(&self) -> UnboundedReceiver<LoadEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.borrow_mut().push(sender);
        receiver
    }

    fn emit(&self, event: LoadEvent) {
        self.subscribers
            .borrow_mut()
            .retain(|subscriber| subscriber.unbounded_send(event.clone()).is_ok());
    }

    /// Load a manifest. Results come back in manifest order, with `data` populated.
    pub async fn load(&self, group: &str, assets: Vec<Asset>) -> anyhow::Result<Vec<Asset>> {
        let total = assets.len();
        if total == 0 {
            self.emit(LoadEvent::Loaded {
                group: group.to_string(),
                assets: Vec::new(),
            });
            return Ok(Vec::new());
        }
        log::debug!("loading {total} assets for {group}");

        let mut slots: Vec<Option<Asset>> = vec![None; total];
        let mut pending = assets.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();
        for (index, asset) in pending.by_ref().take(self.parallelism) {
            in_flight.push(self.load_one(index, asset));
        }

        let mut loaded = 0;
        while let Some((index, result)) = in_flight.next().await {
            match result {
                Ok(asset) => {
                    slots[index] = Some(asset);
                    loaded += 1;
                    self.emit(LoadEvent::Progress {
                        group: group.to_string(),
                        progress: loaded as f32 / total as f32,
                    });
                    if let Some((index, asset)) = pending.next() {
                        in_flight.push(self.load_one(index, asset));
                    }
                }
                Err(e) => {
                    log::error!("{group}: {e:#}");
                    self.emit(LoadEvent::Error {
                        group: group.to_string(),
                        message: format!("{e:#}"),
                    });
                    return Err(e);
                }
            }
        }

        let assets: Vec<Asset> = slots.into_iter().flatten().collect();
        self.emit(LoadEvent::Loaded {
            group: group.to_string(),
            assets: assets.clone(),
        });
        Ok(assets)
    }

    async fn load_one(&self, index: usize, mut asset: Asset) -> (usize, anyhow::Result<Asset>) {
        let data = async {
            let bytes = self.fetcher.fetch(&asset.src).await?;
            self.decode(&asset, bytes).await
        }
        .await
        .with_context(|| format!("Failed to load {}", asset.src));
        match data {
            Ok(data) => {
                asset.data = Some(data);
                (index, Ok(asset))
            }
            Err(e) => (index, Err(e)),
        }
    }

    async fn decode(&self, asset: &Asset, bytes: Vec<u8>) -> anyhow::Result<AssetData> {
        let data = match asset.kind {
            AssetKind::Image => AssetData::Image(Arc::new(image::load_from_memory(&bytes)?)),
            AssetKind::Json => AssetData::Json(Arc::new(serde_json::from_slice(&bytes)?)),
            AssetKind::Texture => {
                let gpu = self
                    .gpu
                    .as_ref()
                    .context("texture assets need a GPU device")?;
                let extension = Path::new(&asset.src)
                    .extension()
                    .and_then(|extension| extension.to_str());
                let texture = Texture::from_bytes(
                    &gpu.device,
                    &gpu.queue,
                    &bytes,
                    &asset.id,
                    extension,
                    asset.flag("linear"),
                )?;
                AssetData::Texture(Arc::new(texture))
            }
            AssetKind::Gltf => {
                let model = GltfModel::load(self.fetcher.as_ref(), &asset.src, &bytes).await?;
                AssetData::Gltf(Arc::new(model))
            }
            AssetKind::Obj => {
                let model = ObjModel::load(self.fetcher.as_ref(), &asset.src, &bytes).await?;
                AssetData::Obj(Arc::new(model))
            }
        };
        Ok(data)
    }
}
