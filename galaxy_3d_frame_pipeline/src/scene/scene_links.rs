/// Data links: a consumer slot of one scene takes its value from a provider
/// slot of another scene or from an offscreen buffer.

use rustc_hash::FxHashMap;
use crate::handles::{DataSlotId, OffscreenBufferHandle, SceneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkProvider {
    SceneSlot { scene: SceneId, slot: DataSlotId },
    OffscreenBuffer(OffscreenBufferHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataLink {
    pub consumer_scene: SceneId,
    pub consumer_slot: DataSlotId,
    pub provider: LinkProvider,
}

/// A consumer slot has at most one provider
#[derive(Debug, Default)]
pub struct SceneLinks {
    links: FxHashMap<(SceneId, DataSlotId), LinkProvider>,
}

impl SceneLinks {
    /// No link
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a consumer, returning the provider it was linked to before
    pub fn add_link(
        &mut self,
        consumer_scene: SceneId,
        consumer_slot: DataSlotId,
        provider: LinkProvider,
    ) -> Option<LinkProvider> {
        self.links.insert((consumer_scene, consumer_slot), provider)
    }

    /// Remove the link of a consumer slot, returning its provider
    pub fn remove_link(&mut self, consumer_scene: SceneId, consumer_slot: DataSlotId) -> Option<LinkProvider> {
        self.links.remove(&(consumer_scene, consumer_slot))
    }

    /// Provider linked to a consumer slot
    pub fn link_provider(&self, consumer_scene: SceneId, consumer_slot: DataSlotId) -> Option<LinkProvider> {
        self.links.get(&(consumer_scene, consumer_slot)).copied()
    }

    /// Remove every link the scene consumes or provides
    pub fn remove_links_for_scene(&mut self, scene: SceneId) -> Vec<DataLink> {
        self.remove_where(|link| {
            link.consumer_scene == scene
                || matches!(link.provider, LinkProvider::SceneSlot { scene: provider, .. } if provider == scene)
        })
    }

    /// Remove every link fed by the offscreen buffer
    pub fn remove_links_for_offscreen_buffer(&mut self, buffer: OffscreenBufferHandle) -> Vec<DataLink> {
        self.remove_where(|link| link.provider == LinkProvider::OffscreenBuffer(buffer))
    }

    fn remove_where(&mut self, predicate: impl Fn(&DataLink) -> bool) -> Vec<DataLink> {
        let removed: Vec<DataLink> = self.links().into_iter().filter(|link| predicate(link)).collect();
        for link in &removed {
            self.links.remove(&(link.consumer_scene, link.consumer_slot));
        }
        removed
    }

    /// All links, sorted by consumer
    pub fn links(&self) -> Vec<DataLink> {
        let mut links: Vec<DataLink> = self
            .links
            .iter()
            .map(|((consumer_scene, consumer_slot), provider)| DataLink {
                consumer_scene: *consumer_scene,
                consumer_slot: *consumer_slot,
                provider: *provider,
            })
            .collect();
        links.sort_by_key(|link| (link.consumer_scene, link.consumer_slot));
        links
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// True when nothing is linked
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
#[path = "scene_links_tests.rs"]
mod tests;
