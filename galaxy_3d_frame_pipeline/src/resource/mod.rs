//! Resource management module
//!
//! Content-addressed client resources shared between scenes, their budgeted
//! upload to the graphics device, and the device objects owned by scenes and
//! offscreen buffers.

pub mod content_hash;
pub mod resource_data;
pub mod resource_registry;
pub mod binary_shader_cache;
pub mod resource_uploader;
pub mod async_effect_uploader;
pub mod resource_statistics;
pub mod resource_uploading_manager;
pub mod offscreen_buffer;
pub mod renderer_resource_manager;

pub use content_hash::ResourceContentHash;
pub use resource_data::{EffectResource, ResourceData, ResourceKind, ResourcePayload};
pub use resource_registry::{ResourceDescriptor, ResourceRegistry, ResourceStatus};
pub use binary_shader_cache::BinaryShaderCache;
pub use resource_uploader::{ResourceUploader, UploadOutcome};
pub use async_effect_uploader::{AsyncEffectUploader, CompiledEffect};
pub use resource_statistics::ResourceStatistics;
pub use resource_uploading_manager::{ResourceUploadingManager, LARGE_RESOURCE_BYTE_SIZE_THRESHOLD};
pub use offscreen_buffer::{
    estimate_offscreen_buffer_vram_size, DepthStencilBufferType, OffscreenBufferDesc,
    OffscreenBufferDescriptor, OffscreenBufferTargets,
};
pub use renderer_resource_manager::RendererResourceManager;
