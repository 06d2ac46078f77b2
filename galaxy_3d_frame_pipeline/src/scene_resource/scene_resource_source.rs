/// Read access to the scene data needed to execute scene resource actions.
///
/// The scene graph itself lives outside the pipeline. `SceneResourceSource`
/// is the narrow view of it the pipeline consumes; `SceneResourceSnapshot`
/// is a plain value implementation for clients that push whole snapshots.

use rustc_hash::FxHashMap;
use crate::graphics_device::{IndexType, RenderBufferDesc, TextureInfo, TextureRegion};
use crate::handles::{DataSlotId, SceneResourceHandle};
use crate::resource::ResourceContentHash;
use super::scene_resource_action::SceneResourceKind;

// ===== DATA BUFFERS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBufferKind {
    VertexData,
    IndexData(IndexType),
}

/// Scene-owned vertex or index data that changes at runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBufferSource {
    pub kind: DataBufferKind,
    /// Allocation size; `data` may be shorter
    pub capacity: usize,
    pub data: Vec<u8>,
}

// ===== TEXTURE BUFFERS =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureMip {
    pub data: Vec<u8>,
    /// Part changed since the last upload, `None` if unchanged
    pub dirty_region: Option<TextureRegion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureBufferSource {
    pub info: TextureInfo,
    pub mips: Vec<TextureMip>,
}

// ===== UNIFORM BUFFERS =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBufferSource {
    pub size: usize,
    pub data: Vec<u8>,
}

// ===== VERTEX ARRAYS =====

/// Where a vertex array input comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometrySource {
    /// Shared client resource
    Resource(ResourceContentHash),
    /// Scene data buffer
    DataBuffer(SceneResourceHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexArraySource {
    pub effect: ResourceContentHash,
    pub vertex_buffers: Vec<GeometrySource>,
    pub index_buffer: Option<GeometrySource>,
}

// ===== DATA SLOTS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSlotKind {
    DataProvider,
    DataConsumer,
    TextureProvider,
    TextureConsumer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSlot {
    pub id: DataSlotId,
    pub kind: DataSlotKind,
}

// ===== SOURCE TRAIT =====

pub trait SceneResourceSource: Send {
    /// Content hashes of the client resources the scene uses
    fn resource_hashes(&self) -> Vec<ResourceContentHash>;
    /// Existing objects of one kind, in ascending handle order
    fn scene_resource_handles(&self, kind: SceneResourceKind) -> Vec<SceneResourceHandle>;

    fn render_buffer(&self, handle: SceneResourceHandle) -> Option<&RenderBufferDesc>;
    /// Attachments of a render target (colors first, depth last)
    fn render_target_buffers(&self, handle: SceneResourceHandle) -> Option<&[SceneResourceHandle]>;
    fn data_buffer(&self, handle: SceneResourceHandle) -> Option<&DataBufferSource>;
    fn texture_buffer(&self, handle: SceneResourceHandle) -> Option<&TextureBufferSource>;
    fn uniform_buffer(&self, handle: SceneResourceHandle) -> Option<&UniformBufferSource>;
    fn vertex_array(&self, handle: SceneResourceHandle) -> Option<&VertexArraySource>;

    fn data_slot(&self, id: DataSlotId) -> Option<DataSlot>;
}

// ===== SNAPSHOT =====

/// Owned scene state implementing `SceneResourceSource`
#[derive(Debug, Clone, Default)]
pub struct SceneResourceSnapshot {
    pub resources: Vec<ResourceContentHash>,
    pub render_buffers: FxHashMap<SceneResourceHandle, RenderBufferDesc>,
    pub render_targets: FxHashMap<SceneResourceHandle, Vec<SceneResourceHandle>>,
    pub data_buffers: FxHashMap<SceneResourceHandle, DataBufferSource>,
    pub texture_buffers: FxHashMap<SceneResourceHandle, TextureBufferSource>,
    pub uniform_buffers: FxHashMap<SceneResourceHandle, UniformBufferSource>,
    pub vertex_arrays: FxHashMap<SceneResourceHandle, VertexArraySource>,
    pub data_slots: FxHashMap<DataSlotId, DataSlotKind>,
}

fn sorted_keys<V>(map: &FxHashMap<SceneResourceHandle, V>) -> Vec<SceneResourceHandle> {
    let mut keys: Vec<SceneResourceHandle> = map.keys().copied().collect();
    keys.sort();
    keys
}

impl SceneResourceSnapshot {
    /// Empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference a client resource
    pub fn with_resource(mut self, hash: ResourceContentHash) -> Self {
        self.resources.push(hash);
        self
    }

    /// Add a render buffer
    pub fn with_render_buffer(mut self, handle: SceneResourceHandle, desc: RenderBufferDesc) -> Self {
        self.render_buffers.insert(handle, desc);
        self
    }

    /// Add a render target over `buffers`
    pub fn with_render_target(mut self, handle: SceneResourceHandle, buffers: Vec<SceneResourceHandle>) -> Self {
        self.render_targets.insert(handle, buffers);
        self
    }

    /// Add a data buffer
    pub fn with_data_buffer(mut self, handle: SceneResourceHandle, buffer: DataBufferSource) -> Self {
        self.data_buffers.insert(handle, buffer);
        self
    }

    /// Add a texture buffer
    pub fn with_texture_buffer(mut self, handle: SceneResourceHandle, texture: TextureBufferSource) -> Self {
        self.texture_buffers.insert(handle, texture);
        self
    }

    /// Add a uniform buffer
    pub fn with_uniform_buffer(mut self, handle: SceneResourceHandle, buffer: UniformBufferSource) -> Self {
        self.uniform_buffers.insert(handle, buffer);
        self
    }

    /// Add a vertex array
    pub fn with_vertex_array(mut self, handle: SceneResourceHandle, array: VertexArraySource) -> Self {
        self.vertex_arrays.insert(handle, array);
        self
    }

    /// Declare a data slot
    pub fn with_data_slot(mut self, id: DataSlotId, kind: DataSlotKind) -> Self {
        self.data_slots.insert(id, kind);
        self
    }
}

impl SceneResourceSource for SceneResourceSnapshot {
    fn resource_hashes(&self) -> Vec<ResourceContentHash> {
        self.resources.clone()
    }

    fn scene_resource_handles(&self, kind: SceneResourceKind) -> Vec<SceneResourceHandle> {
        match kind {
            SceneResourceKind::RenderBuffer => sorted_keys(&self.render_buffers),
            SceneResourceKind::RenderTarget => sorted_keys(&self.render_targets),
            SceneResourceKind::DataBuffer => sorted_keys(&self.data_buffers),
            SceneResourceKind::TextureBuffer => sorted_keys(&self.texture_buffers),
            SceneResourceKind::UniformBuffer => sorted_keys(&self.uniform_buffers),
            SceneResourceKind::VertexArray => sorted_keys(&self.vertex_arrays),
        }
    }

    fn render_buffer(&self, handle: SceneResourceHandle) -> Option<&RenderBufferDesc> {
        self.render_buffers.get(&handle)
    }

    fn render_target_buffers(&self, handle: SceneResourceHandle) -> Option<&[SceneResourceHandle]> {
        self.render_targets.get(&handle).map(Vec::as_slice)
    }

    fn data_buffer(&self, handle: SceneResourceHandle) -> Option<&DataBufferSource> {
        self.data_buffers.get(&handle)
    }

    fn texture_buffer(&self, handle: SceneResourceHandle) -> Option<&TextureBufferSource> {
        self.texture_buffers.get(&handle)
    }

    fn uniform_buffer(&self, handle: SceneResourceHandle) -> Option<&UniformBufferSource> {
        self.uniform_buffers.get(&handle)
    }

    fn vertex_array(&self, handle: SceneResourceHandle) -> Option<&VertexArraySource> {
        self.vertex_arrays.get(&handle)
    }

    fn data_slot(&self, id: DataSlotId) -> Option<DataSlot> {
        self.data_slots.get(&id).map(|kind| DataSlot { id, kind: *kind })
    }
}
