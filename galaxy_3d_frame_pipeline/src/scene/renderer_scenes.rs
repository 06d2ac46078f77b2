/// Scenes known to the renderer and their mapping state.
///
/// ```text
/// Available --MapScene--> MappingAndUploading --resources ready--> Mapped --ShowScene--> Rendered
///     ^                          |                                   |  ^                  |
///     +--------UnmapScene--------+-------------UnmapScene------------+  +----HideScene-----+
/// ```

use std::collections::VecDeque;
use rustc_hash::FxHashMap;
use crate::handles::{DisplayHandle, SceneId};
use crate::resource::{ResourceContentHash, ResourceData};
use crate::scene_resource::{SceneResourceAction, SceneResourceActionLog, SceneResourceSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneState {
    /// Received, not mapped to a display
    Available,
    /// Mapped to a display, resources and scene objects still uploading
    MappingAndUploading,
    /// Everything uploaded, not shown
    Mapped,
    /// Shown on its display buffer
    Rendered,
}

impl SceneState {
    /// Mapped to a display (possibly still uploading)
    pub fn is_mapped(self) -> bool {
        !matches!(self, SceneState::Available)
    }
}

/// One batch of changes sent by the scene's client
#[derive(Default)]
pub struct SceneUpdate {
    /// Create/update/destroy actions on scene resource objects
    pub actions: Vec<SceneResourceAction>,
    /// New scene content, replacing the previous one
    pub source: Option<Box<dyn SceneResourceSource>>,
    /// Payloads of client resources the scene uses
    pub resources: Vec<ResourceData>,
}

pub struct RendererScene {
    pub id: SceneId,
    pub state: SceneState,
    /// Display the scene is mapped to
    pub display: Option<DisplayHandle>,
    pub source: Box<dyn SceneResourceSource>,
    pub action_log: SceneResourceActionLog,
    /// Hashes this scene currently references in its display's registry
    pub referenced_resources: Vec<ResourceContentHash>,
    /// Resource payloads received for this scene, kept for remapping
    pub resource_data: FxHashMap<ResourceContentHash, ResourceData>,
    /// Received updates not applied yet, oldest first
    pub pending_updates: VecDeque<SceneUpdate>,
    /// Updates merged into the action log while resources were still missing
    pub blocked_updates: usize,
}

impl RendererScene {
    fn new(id: SceneId, source: Box<dyn SceneResourceSource>) -> Self {
        Self {
            id,
            state: SceneState::Available,
            display: None,
            source,
            action_log: SceneResourceActionLog::new(),
            referenced_resources: Vec::new(),
            resource_data: FxHashMap::default(),
            pending_updates: VecDeque::new(),
            blocked_updates: 0,
        }
    }

    /// Distinct resource hashes of the current content, sorted
    pub fn resource_hashes(&self) -> Vec<ResourceContentHash> {
        let mut hashes = self.source.resource_hashes();
        hashes.sort();
        hashes.dedup();
        hashes
    }
}

#[derive(Default)]
pub struct RendererScenes {
    scenes: FxHashMap<SceneId, RendererScene>,
}

impl RendererScenes {
    /// No scene received
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the scene already exists
    pub fn create_scene(&mut self, id: SceneId, source: Box<dyn SceneResourceSource>) -> bool {
        if self.scenes.contains_key(&id) {
            return false;
        }
        self.scenes.insert(id, RendererScene::new(id, source));
        true
    }

    /// Remove a scene, returning it
    pub fn destroy_scene(&mut self, id: SceneId) -> Option<RendererScene> {
        self.scenes.remove(&id)
    }

    /// True when the scene was received
    pub fn has_scene(&self, id: SceneId) -> bool {
        self.scenes.contains_key(&id)
    }

    /// Received scene
    pub fn scene(&self, id: SceneId) -> Option<&RendererScene> {
        self.scenes.get(&id)
    }

    /// Mutable received scene
    pub fn scene_mut(&mut self, id: SceneId) -> Option<&mut RendererScene> {
        self.scenes.get_mut(&id)
    }

    /// State of a received scene
    pub fn scene_state(&self, id: SceneId) -> Option<SceneState> {
        self.scenes.get(&id).map(|scene| scene.state)
    }

    /// All scene ids, sorted
    pub fn scene_ids(&self) -> Vec<SceneId> {
        let mut ids: Vec<SceneId> = self.scenes.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Scenes mapped (or mapping) to `display`, sorted
    pub fn scenes_on_display(&self, display: DisplayHandle) -> Vec<SceneId> {
        let mut ids: Vec<SceneId> = self
            .scenes
            .values()
            .filter(|scene| scene.display == Some(display))
            .map(|scene| scene.id)
            .collect();
        ids.sort();
        ids
    }

    /// Number of received scenes
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// True when no scene was received
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

#[cfg(test)]
#[path = "renderer_scenes_tests.rs"]
mod tests;
