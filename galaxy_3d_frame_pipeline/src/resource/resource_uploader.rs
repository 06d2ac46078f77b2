/// Synchronous device uploads of client resources.
///
/// Buffers and textures are uploaded directly. Effects are first looked up
/// in the binary shader cache; on a miss the uploader reports that the
/// effect needs compiling, which the caller routes to the effect upload
/// thread.

use std::sync::Arc;
use slotmap::Key;
use crate::graphics_device::{DeviceResourceHandle, GraphicsDevice, TextureRegion};
use crate::{engine_debug, engine_warn};
use super::binary_shader_cache::BinaryShaderCache;
use super::content_hash::ResourceContentHash;
use super::resource_data::{EffectResource, ResourceData, ResourceKind, ResourcePayload};

/// Result of `ResourceUploader::upload_resource`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded(DeviceResourceHandle),
    Failed,
    /// Effect with no usable cached binary
    NeedsCompilation,
}

const SOURCE: &str = "galaxy3d::ResourceUploader";

pub struct ResourceUploader {
    binary_shader_cache: Option<Arc<dyn BinaryShaderCache>>,
}

impl ResourceUploader {
    /// Uploader using `binary_shader_cache` for shaders, when given
    pub fn new(binary_shader_cache: Option<Arc<dyn BinaryShaderCache>>) -> Self {
        Self { binary_shader_cache }
    }

    /// Upload one client resource on the main context
    pub fn upload_resource(&self, device: &mut dyn GraphicsDevice, data: &ResourceData) -> UploadOutcome {
        let handle = match data.payload() {
            ResourcePayload::VertexBuffer(bytes) => {
                let handle = device.allocate_vertex_buffer(bytes.len());
                if !handle.is_null() {
                    device.upload_vertex_buffer_data(handle, bytes);
                }
                handle
            }
            ResourcePayload::IndexBuffer { index_type, data: bytes } => {
                let handle = device.allocate_index_buffer(*index_type, bytes.len());
                if !handle.is_null() {
                    device.upload_index_buffer_data(handle, bytes);
                }
                handle
            }
            ResourcePayload::Texture { info, mips } => {
                let handle = device.allocate_texture(info);
                if !handle.is_null() {
                    for (mip, bytes) in mips.iter().enumerate() {
                        let region = TextureRegion::full_mip(info, mip as u32);
                        device.upload_texture_data(handle, mip as u32, &region, bytes);
                    }
                }
                handle
            }
            ResourcePayload::Effect(effect) => {
                return match self.upload_cached_shader(device, effect) {
                    Some(handle) => UploadOutcome::Uploaded(handle),
                    None => UploadOutcome::NeedsCompilation,
                };
            }
        };

        if handle.is_null() {
            UploadOutcome::Failed
        } else {
            UploadOutcome::Uploaded(handle)
        }
    }

    fn upload_cached_shader(
        &self,
        device: &mut dyn GraphicsDevice,
        effect: &EffectResource,
    ) -> Option<DeviceResourceHandle> {
        let cache = self.binary_shader_cache.as_ref()?;
        if !cache.has_binary_shader(effect.hash) {
            return None;
        }
        let (Some(format), Some(binary)) = (
            cache.binary_shader_format(effect.hash),
            cache.binary_shader_data(effect.hash),
        ) else {
            cache.binary_shader_uploaded(effect.hash, false);
            return None;
        };

        let handle = device.upload_binary_shader(effect, &binary, format);
        if handle.is_null() {
            engine_warn!(SOURCE, "cached binary of effect '{}' was rejected, compiling from source", effect.name);
            cache.binary_shader_uploaded(effect.hash, false);
            None
        } else {
            engine_debug!(SOURCE, "effect '{}' loaded from binary cache", effect.name);
            cache.binary_shader_uploaded(effect.hash, true);
            Some(handle)
        }
    }

    /// Offer a freshly compiled shader back to the cache
    pub fn store_shader_in_cache(
        &self,
        device: &mut dyn GraphicsDevice,
        handle: DeviceResourceHandle,
        effect_hash: ResourceContentHash,
    ) {
        let Some(cache) = self.binary_shader_cache.as_ref() else {
            return;
        };
        if !cache.should_binary_shader_be_cached(effect_hash) {
            return;
        }
        match device.get_binary_shader(handle) {
            Some((binary, format)) => cache.store_binary_shader(effect_hash, &binary, format),
            None => engine_warn!(SOURCE, "device produced no binary for effect {}", effect_hash),
        }
    }

    /// Delete the device object of an uploaded resource
    pub fn unload_resource(&self, device: &mut dyn GraphicsDevice, kind: ResourceKind, handle: DeviceResourceHandle) {
        match kind {
            ResourceKind::VertexBuffer => device.delete_vertex_buffer(handle),
            ResourceKind::IndexBuffer => device.delete_index_buffer(handle),
            ResourceKind::Texture2D | ResourceKind::Texture3D | ResourceKind::TextureCube => {
                device.delete_texture(handle)
            }
            ResourceKind::Effect => device.delete_shader(handle),
        }
    }
}

#[cfg(test)]
#[path = "resource_uploader_tests.rs"]
mod tests;
