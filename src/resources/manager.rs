use std::collections::HashMap;

use crate::resources::{Asset, AssetData};

/// Loaded assets, bucketed by group (the owning scene's id).
///
/// Lookups never fail loudly: a missing group or id is `None`. Adding an asset whose id
/// already exists in the group replaces the old record.
#[derive(Debug, Default)]
pub struct AssetManager {
    groups: HashMap<String, Vec<Asset>>,
}

impl AssetManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, group: &str, assets: Vec<Asset>) {
        let bucket = self.groups.entry(group.to_string()).or_default();
        for asset in assets {
            match bucket.iter_mut().find(|existing| existing.id == asset.id) {
                Some(existing) => *existing = asset,
                None => bucket.push(asset),
            }
        }
    }

    /// The payload of an asset.
    pub fn get(&self, group: &str, id: &str) -> Option<&AssetData> {
        self.get_record(group, id)?.data.as_ref()
    }

    /// The full descriptor of an asset.
    pub fn get_record(&self, group: &str, id: &str) -> Option<&Asset> {
        self.groups.get(group)?.iter().find(|asset| asset.id == id)
    }

    /// Drop a group, typically when its scene is disposed.
    pub fn remove_group(&mut self, group: &str) -> Option<Vec<Asset>> {
        let removed = self.groups.remove(group);
        if let Some(assets) = &removed {
            log::debug!("evicted {} assets of group {group}", assets.len());
        }
        removed
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn group_len(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, Vec::len)
    }
}
