/// Budgeted upload and unload of registry resources.
///
/// One pass per frame: delete device objects of resources nobody uses any
/// more, upload provided resources until the `ResourcesUpload` budget runs
/// out, then exchange effects with the upload thread. At least one
/// resource is uploaded per pass so progress is guaranteed even with a zero
/// budget. The budget is checked after every batch of uploads and after
/// every large resource.

use std::sync::Arc;
use slotmap::Key;
use crate::error::Result;
use crate::frame::{FrameTimer, FrameTimerSection};
use crate::graphics_device::{DeviceResourceHandle, GraphicsDevice};
use crate::{engine_debug, engine_error, engine_trace};
use super::async_effect_uploader::{AsyncEffectUploader, CompiledEffect};
use super::binary_shader_cache::BinaryShaderCache;
use super::content_hash::ResourceContentHash;
use super::resource_data::{EffectResource, ResourceData};
use super::resource_registry::{ResourceDescriptor, ResourceRegistry, ResourceStatus};
use super::resource_statistics::ResourceStatistics;
use super::resource_uploader::{ResourceUploader, UploadOutcome};

/// Resources at least this big get their own budget check
pub const LARGE_RESOURCE_BYTE_SIZE_THRESHOLD: usize = 250_000;

const SOURCE: &str = "galaxy3d::ResourceUploadingManager";

pub struct ResourceUploadingManager {
    uploader: ResourceUploader,
    /// `None` compiles effects on the render thread
    async_uploader: Option<AsyncEffectUploader>,
    effects_to_upload: Vec<Arc<EffectResource>>,
    upload_batch_size: usize,
    stats: ResourceStatistics,
}

impl ResourceUploadingManager {
    /// `upload_batch_size` is clamped to at least 1
    pub fn new(binary_shader_cache: Option<Arc<dyn BinaryShaderCache>>, upload_batch_size: usize) -> Self {
        Self {
            uploader: ResourceUploader::new(binary_shader_cache),
            async_uploader: None,
            effects_to_upload: Vec::new(),
            upload_batch_size: upload_batch_size.max(1),
            stats: ResourceStatistics::default(),
        }
    }

    /// Route effect compilation to a background thread
    pub fn start_async_effect_upload(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let mut async_uploader = AsyncEffectUploader::new();
        async_uploader.start(device)?;
        self.async_uploader = Some(async_uploader);
        Ok(())
    }

    /// True when shaders compile on the worker thread
    pub fn uses_async_effect_upload(&self) -> bool {
        self.async_uploader.is_some()
    }

    /// Main-context uploader
    pub fn uploader(&self) -> &ResourceUploader {
        &self.uploader
    }

    /// Upload counters
    pub fn statistics(&self) -> &ResourceStatistics {
        &self.stats
    }

    /// Mutable upload counters
    pub fn statistics_mut(&mut self) -> &mut ResourceStatistics {
        &mut self.stats
    }

    /// One frame's worth of resource work
    pub fn upload_and_unload_pending_resources(
        &mut self,
        registry: &mut ResourceRegistry,
        device: &mut dyn GraphicsDevice,
        timer: &FrameTimer,
    ) {
        self.unload_resources(registry.take_resources_not_in_use(), device);
        self.upload_resources(registry, device, timer);
        self.sync_effects(registry, device);
    }

    fn unload_resources(&mut self, resources: Vec<ResourceDescriptor>, device: &mut dyn GraphicsDevice) {
        for descriptor in resources {
            self.unload_resource(&descriptor, device);
        }
    }

    fn unload_resource(&mut self, descriptor: &ResourceDescriptor, device: &mut dyn GraphicsDevice) {
        if descriptor.status != ResourceStatus::Uploaded || descriptor.device_handle.is_null() {
            return;
        }
        let Some(kind) = descriptor.kind else {
            return;
        };
        engine_trace!(SOURCE, "unloading {:?} {}", kind, descriptor.hash);
        self.uploader.unload_resource(device, kind, descriptor.device_handle);
        self.stats.resources_unloaded += 1;
    }

    fn upload_resources(
        &mut self,
        registry: &mut ResourceRegistry,
        device: &mut dyn GraphicsDevice,
        timer: &FrameTimer,
    ) {
        let provided: Vec<ResourceContentHash> = registry.provided_resources().to_vec();
        let mut uploads_since_check = 0;

        for (index, hash) in provided.iter().enumerate() {
            let Some(data) = registry.resource_descriptor(*hash).and_then(|d| d.data.clone()) else {
                continue;
            };
            let byte_size = data.byte_size();
            self.upload_resource(registry, device, &data);

            uploads_since_check += 1;
            let check_budget = uploads_since_check >= self.upload_batch_size
                || byte_size >= LARGE_RESOURCE_BYTE_SIZE_THRESHOLD;
            if check_budget {
                uploads_since_check = 0;
                let remaining = provided.len() - index - 1;
                if remaining > 0 && timer.is_time_budget_exceeded_for_section(FrameTimerSection::ResourcesUpload) {
                    engine_debug!(SOURCE, "upload budget exceeded, {} resources deferred", remaining);
                    self.stats.upload_passes_interrupted += 1;
                    break;
                }
            }
        }
    }

    fn upload_resource(&mut self, registry: &mut ResourceRegistry, device: &mut dyn GraphicsDevice, data: &ResourceData) {
        let hash = data.hash();
        match self.uploader.upload_resource(device, data) {
            UploadOutcome::Uploaded(handle) => {
                registry.set_resource_uploaded(hash, handle);
                self.stats.resources_uploaded += 1;
                self.stats.bytes_uploaded += data.byte_size() as u64;
            }
            UploadOutcome::Failed => self.mark_failed(registry, device, hash),
            UploadOutcome::NeedsCompilation => {
                let Some(effect) = data.as_effect() else {
                    self.mark_failed(registry, device, hash);
                    return;
                };
                if self.async_uploader.is_some() {
                    registry.set_resource_scheduled_for_upload(hash);
                    self.effects_to_upload.push(effect.clone());
                } else {
                    self.compile_effect_synchronously(registry, device, effect);
                }
            }
        }
    }

    fn compile_effect_synchronously(
        &mut self,
        registry: &mut ResourceRegistry,
        device: &mut dyn GraphicsDevice,
        effect: &EffectResource,
    ) {
        let shader = device.create_upload_context().and_then(|mut context| {
            if !context.enable() {
                return None;
            }
            let shader = context.upload_shader(effect);
            context.disable();
            shader
        });
        let compiled = CompiledEffect { hash: effect.hash, shader };
        self.register_compiled_effect(registry, device, compiled);
    }

    fn sync_effects(&mut self, registry: &mut ResourceRegistry, device: &mut dyn GraphicsDevice) {
        let Some(async_uploader) = self.async_uploader.as_ref() else {
            return;
        };
        let mut compiled = Vec::new();
        async_uploader.sync(std::mem::take(&mut self.effects_to_upload), &mut compiled);
        for effect in compiled {
            self.stats.effects_compiled_async += 1;
            self.register_compiled_effect(registry, device, effect);
        }
    }

    fn register_compiled_effect(
        &mut self,
        registry: &mut ResourceRegistry,
        device: &mut dyn GraphicsDevice,
        compiled: CompiledEffect,
    ) {
        let hash = compiled.hash;
        let expected = matches!(
            registry.resource_status(hash),
            Some(ResourceStatus::ScheduledForUpload) | Some(ResourceStatus::DataProvided)
        );
        if !expected {
            engine_debug!(SOURCE, "discarding compiled effect {}, no longer in use", hash);
            return;
        }
        let Some(shader) = compiled.shader else {
            self.mark_failed(registry, device, hash);
            return;
        };
        let handle: DeviceResourceHandle = device.register_shader(shader);
        if handle.is_null() {
            self.mark_failed(registry, device, hash);
            return;
        }
        let byte_size = registry.resource_descriptor(hash).map_or(0, |d| d.byte_size);
        registry.set_resource_uploaded(hash, handle);
        self.uploader.store_shader_in_cache(device, handle, hash);
        self.stats.resources_uploaded += 1;
        self.stats.bytes_uploaded += byte_size as u64;
    }

    fn mark_failed(&mut self, registry: &mut ResourceRegistry, device: &mut dyn GraphicsDevice, hash: ResourceContentHash) {
        engine_error!(SOURCE, "failed to upload resource {}", hash);
        registry.set_resource_upload_failed(hash);
        self.stats.upload_failures += 1;
        if !device.is_device_status_healthy() {
            engine_error!(SOURCE, "graphics device reports an unhealthy status after upload failure");
        }
    }

    /// Stop the upload thread and delete every device object of the registry
    pub fn unload_all_resources(&mut self, registry: &mut ResourceRegistry, device: &mut dyn GraphicsDevice) {
        if let Some(mut async_uploader) = self.async_uploader.take() {
            async_uploader.stop();
        }
        self.effects_to_upload.clear();
        let all = registry.take_all_resources();
        self.unload_resources(all, device);
    }
}

#[cfg(test)]
#[path = "resource_uploading_manager_tests.rs"]
mod tests;
