/// Every device object of one display.
///
/// `RendererResourceManager` owns the display's resource registry and upload
/// scheduling, the objects scenes create through their action logs, and the
/// offscreen buffers. It is the `SceneResourceUploader` the action log
/// replays into. Dropping it deletes everything it still holds.

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use slotmap::Key;
use crate::display::DisplayConfig;
use crate::error::Result;
use crate::frame::FrameTimer;
use crate::graphics_device::{
    lock_device, DeviceResourceHandle, GraphicsDevice, RenderBufferAccess, RenderBufferDesc, RenderBufferFormat,
    TextureInfo, TextureRegion, VertexArrayInfo,
};
use crate::handles::{OffscreenBufferHandle, SceneId, SceneResourceHandle};
use crate::scene_resource::{
    DataBufferKind, DataBufferSource, GeometrySource, SceneResourceKind, SceneResourceUploader,
    TextureBufferSource, UniformBufferSource, VertexArraySource,
};
use crate::{engine_bail, engine_debug, engine_error, engine_warn};
use super::binary_shader_cache::BinaryShaderCache;
use super::content_hash::ResourceContentHash;
use super::offscreen_buffer::{
    estimate_offscreen_buffer_vram_size, OffscreenBufferDesc, OffscreenBufferDescriptor, OffscreenBufferTargets,
};
use super::resource_registry::ResourceRegistry;
use super::resource_statistics::ResourceStatistics;
use super::resource_uploading_manager::ResourceUploadingManager;

const SOURCE: &str = "galaxy3d::RendererResourceManager";

// ===== SCENE RESOURCE OBJECTS =====

#[derive(Debug, Clone, Copy)]
struct DataBufferObject {
    device_handle: DeviceResourceHandle,
    kind: DataBufferKind,
    capacity: usize,
}

#[derive(Debug, Clone, Copy)]
struct TextureBufferObject {
    device_handle: DeviceResourceHandle,
    /// First update uploads every mip in full
    initialized: bool,
    byte_size: usize,
}

/// Device objects created by one scene
#[derive(Debug, Default)]
struct SceneResourceObjects {
    render_buffers: FxHashMap<SceneResourceHandle, (DeviceResourceHandle, usize)>,
    render_targets: FxHashMap<SceneResourceHandle, DeviceResourceHandle>,
    data_buffers: FxHashMap<SceneResourceHandle, DataBufferObject>,
    texture_buffers: FxHashMap<SceneResourceHandle, TextureBufferObject>,
    uniform_buffers: FxHashMap<SceneResourceHandle, (DeviceResourceHandle, usize)>,
    vertex_arrays: FxHashMap<SceneResourceHandle, DeviceResourceHandle>,
}

impl SceneResourceObjects {
    fn vram_size(&self) -> usize {
        self.render_buffers.values().map(|(_, size)| size).sum::<usize>()
            + self.data_buffers.values().map(|b| b.capacity).sum::<usize>()
            + self.texture_buffers.values().map(|t| t.byte_size).sum::<usize>()
            + self.uniform_buffers.values().map(|(_, size)| size).sum::<usize>()
    }

    fn contains(&self, kind: SceneResourceKind, handle: SceneResourceHandle) -> bool {
        match kind {
            SceneResourceKind::RenderBuffer => self.render_buffers.contains_key(&handle),
            SceneResourceKind::RenderTarget => self.render_targets.contains_key(&handle),
            SceneResourceKind::DataBuffer => self.data_buffers.contains_key(&handle),
            SceneResourceKind::TextureBuffer => self.texture_buffers.contains_key(&handle),
            SceneResourceKind::UniformBuffer => self.uniform_buffers.contains_key(&handle),
            SceneResourceKind::VertexArray => self.vertex_arrays.contains_key(&handle),
        }
    }

    fn is_empty(&self) -> bool {
        self.render_buffers.is_empty()
            && self.render_targets.is_empty()
            && self.data_buffers.is_empty()
            && self.texture_buffers.is_empty()
            && self.uniform_buffers.is_empty()
            && self.vertex_arrays.is_empty()
    }
}

fn texture_byte_size(info: &TextureInfo) -> usize {
    (0..info.mip_levels.max(1))
        .map(|mip| {
            let (width, height, depth) = info.mip_extent(mip);
            width as usize * height as usize * depth as usize * info.format.texel_bytes()
        })
        .sum()
}

/// Bytes of `region` cut out of a tightly packed mip level
fn extract_texture_region(info: &TextureInfo, mip: u32, data: &[u8], region: &TextureRegion) -> Option<Vec<u8>> {
    let (width, height, depth) = info.mip_extent(mip);
    let fits = region.x as u64 + region.width as u64 <= width as u64
        && region.y as u64 + region.height as u64 <= height as u64
        && region.z as u64 + region.depth as u64 <= depth as u64;
    let texel = info.format.texel_bytes();
    let row_pitch = width as usize * texel;
    let slice_pitch = row_pitch * height as usize;
    if !fits || data.len() < slice_pitch * depth as usize {
        return None;
    }

    let row_bytes = region.width as usize * texel;
    let mut bytes = Vec::with_capacity(row_bytes * region.height as usize * region.depth as usize);
    for z in region.z..region.z + region.depth {
        for y in region.y..region.y + region.height {
            let start = z as usize * slice_pitch + y as usize * row_pitch + region.x as usize * texel;
            bytes.extend_from_slice(&data[start..start + row_bytes]);
        }
    }
    Some(bytes)
}

// ===== RESOURCE MANAGER =====

pub struct RendererResourceManager {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    registry: ResourceRegistry,
    uploading: ResourceUploadingManager,
    scene_objects: FxHashMap<SceneId, SceneResourceObjects>,
    offscreen_buffers: FxHashMap<OffscreenBufferHandle, OffscreenBufferDescriptor>,
}

impl RendererResourceManager {
    /// Create the manager of a display
    ///
    /// # Errors
    ///
    /// Fails when `config.async_effect_upload` is set and the effect upload
    /// thread cannot be started.
    pub fn new(
        device: Arc<Mutex<dyn GraphicsDevice>>,
        config: &DisplayConfig,
        binary_shader_cache: Option<Arc<dyn BinaryShaderCache>>,
    ) -> Result<Self> {
        let mut uploading = ResourceUploadingManager::new(binary_shader_cache, config.resource_upload_batch_size);
        if config.async_effect_upload {
            let mut guard = lock_device(&device);
            uploading.start_async_effect_upload(&mut *guard)?;
        }
        Ok(Self {
            device,
            registry: ResourceRegistry::new(),
            uploading,
            scene_objects: FxHashMap::default(),
            offscreen_buffers: FxHashMap::default(),
        })
    }

    /// Main-context device of the display
    pub fn device(&self) -> &Arc<Mutex<dyn GraphicsDevice>> {
        &self.device
    }

    /// Client resource registry
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Mutable client resource registry
    pub fn registry_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.registry
    }

    /// Upload counters
    pub fn statistics(&self) -> &ResourceStatistics {
        self.uploading.statistics()
    }

    /// Add replayed scene actions to the statistics
    pub fn record_scene_resource_actions_applied(&mut self, count: usize) {
        self.uploading.statistics_mut().scene_resource_actions_applied += count as u64;
    }

    /// True when shaders compile on the worker thread
    pub fn uses_async_effect_upload(&self) -> bool {
        self.uploading.uses_async_effect_upload()
    }

    /// Budgeted upload pass over the registry
    pub fn upload_and_unload_pending_resources(&mut self, timer: &FrameTimer) {
        let mut device = lock_device(&self.device);
        self.uploading
            .upload_and_unload_pending_resources(&mut self.registry, &mut *device, timer);
    }

    /// Device handle of an uploaded client resource
    pub fn resource_device_handle(&self, hash: ResourceContentHash) -> Option<DeviceResourceHandle> {
        self.registry.resource_device_handle(hash)
    }

    // ----- scene resource objects -----

    /// Device handle of a scene render buffer
    pub fn render_buffer_device_handle(&self, scene: SceneId, handle: SceneResourceHandle) -> Option<DeviceResourceHandle> {
        self.scene_objects.get(&scene)?.render_buffers.get(&handle).map(|(h, _)| *h)
    }

    /// Device handle of a scene render target
    pub fn render_target_device_handle(&self, scene: SceneId, handle: SceneResourceHandle) -> Option<DeviceResourceHandle> {
        self.scene_objects.get(&scene)?.render_targets.get(&handle).copied()
    }

    /// Device handle of a scene data buffer
    pub fn data_buffer_device_handle(&self, scene: SceneId, handle: SceneResourceHandle) -> Option<DeviceResourceHandle> {
        self.scene_objects.get(&scene)?.data_buffers.get(&handle).map(|b| b.device_handle)
    }

    /// Device handle of a scene texture buffer
    pub fn texture_buffer_device_handle(&self, scene: SceneId, handle: SceneResourceHandle) -> Option<DeviceResourceHandle> {
        self.scene_objects.get(&scene)?.texture_buffers.get(&handle).map(|t| t.device_handle)
    }

    /// Device handle of a scene uniform buffer
    pub fn uniform_buffer_device_handle(&self, scene: SceneId, handle: SceneResourceHandle) -> Option<DeviceResourceHandle> {
        self.scene_objects.get(&scene)?.uniform_buffers.get(&handle).map(|(h, _)| *h)
    }

    /// Device handle of a scene vertex array
    pub fn vertex_array_device_handle(&self, scene: SceneId, handle: SceneResourceHandle) -> Option<DeviceResourceHandle> {
        self.scene_objects.get(&scene)?.vertex_arrays.get(&handle).copied()
    }

    /// Estimated VRAM held by the objects of a scene
    pub fn scene_vram_size(&self, scene: SceneId) -> usize {
        self.scene_objects.get(&scene).map_or(0, SceneResourceObjects::vram_size)
    }

    /// True when the scene holds at least one device object
    pub fn has_scene_resources(&self, scene: SceneId) -> bool {
        self.scene_objects.get(&scene).is_some_and(|objects| !objects.is_empty())
    }

    /// Delete every object the scene created, dependents first
    pub fn unload_all_scene_resources_for_scene(&mut self, scene: SceneId) {
        let Some(objects) = self.scene_objects.remove(&scene) else {
            return;
        };
        engine_debug!(SOURCE, "{}: unloading all scene resources", scene);
        let mut device = lock_device(&self.device);
        for handle in objects.vertex_arrays.values() {
            device.delete_vertex_array(*handle);
        }
        for (handle, _) in objects.uniform_buffers.values() {
            device.delete_uniform_buffer(*handle);
        }
        for texture in objects.texture_buffers.values() {
            device.delete_texture(texture.device_handle);
        }
        for buffer in objects.data_buffers.values() {
            delete_data_buffer(&mut *device, buffer);
        }
        for handle in objects.render_targets.values() {
            device.delete_render_target(*handle);
        }
        for (handle, _) in objects.render_buffers.values() {
            device.delete_render_buffer(*handle);
        }
    }

    /// A second create for a live handle is rejected, the existing object stays
    fn reject_duplicate(&self, scene: SceneId, kind: SceneResourceKind, handle: SceneResourceHandle) -> bool {
        let live = self.scene_objects.get(&scene).is_some_and(|objects| objects.contains(kind, handle));
        if live {
            engine_error!(SOURCE, "{}: {:?} {} is already uploaded", scene, kind, handle);
        }
        live
    }

    fn objects_mut(&mut self, scene: SceneId) -> &mut SceneResourceObjects {
        self.scene_objects.entry(scene).or_default()
    }

    fn resolve_geometry(&self, scene: SceneId, source: GeometrySource) -> Option<DeviceResourceHandle> {
        match source {
            GeometrySource::Resource(hash) => self.registry.resource_device_handle(hash),
            GeometrySource::DataBuffer(handle) => self.data_buffer_device_handle(scene, handle),
        }
    }

    // ----- offscreen buffers -----

    /// Allocate the color buffer(s), depth buffer and render target(s)
    ///
    /// Interruptible buffers get two color buffers and two render targets
    /// paired for double buffering. Nothing stays allocated on failure.
    pub fn upload_offscreen_buffer(&mut self, handle: OffscreenBufferHandle, desc: &OffscreenBufferDesc) -> Result<()> {
        if self.offscreen_buffers.contains_key(&handle) {
            engine_bail!(SOURCE, "offscreen buffer {} already exists", handle);
        }
        if desc.width == 0 || desc.height == 0 {
            engine_bail!(SOURCE, "offscreen buffer {} has an empty size {}x{}", handle, desc.width, desc.height);
        }
        if desc.dma && desc.interruptible {
            engine_bail!(SOURCE, "offscreen buffer {} cannot be both DMA and interruptible", handle);
        }

        let mut device = lock_device(&self.device);
        let mut allocation = OffscreenAllocation::default();
        let color_count = if desc.interruptible { 2 } else { 1 };
        let color_desc = RenderBufferDesc {
            width: desc.width,
            height: desc.height,
            format: RenderBufferFormat::Rgba8,
            access: RenderBufferAccess::ReadWrite,
            samples: desc.samples,
        };

        for _ in 0..color_count {
            let color = if desc.dma {
                device.upload_dma_render_buffer(&color_desc)
            } else {
                device.upload_render_buffer(&color_desc)
            };
            if color.is_null() {
                allocation.release(&mut *device);
                engine_bail!(SOURCE, "failed to allocate color buffer of offscreen buffer {}", handle);
            }
            allocation.colors.push(color);
        }

        let depth_buffer = match desc.depth_stencil.render_buffer_format() {
            Some(format) => {
                let depth = device.upload_render_buffer(&RenderBufferDesc {
                    format,
                    access: RenderBufferAccess::WriteOnly,
                    ..color_desc
                });
                if depth.is_null() {
                    allocation.release(&mut *device);
                    engine_bail!(SOURCE, "failed to allocate depth buffer of offscreen buffer {}", handle);
                }
                allocation.depth = Some(depth);
                Some(depth)
            }
            None => None,
        };

        for index in 0..color_count {
            let mut attachments = vec![allocation.colors[index]];
            attachments.extend(depth_buffer);
            let render_target = device.upload_render_target(&attachments);
            if render_target.is_null() {
                allocation.release(&mut *device);
                engine_bail!(SOURCE, "failed to create render target of offscreen buffer {}", handle);
            }
            allocation.render_targets.push(render_target);
        }

        let targets = if desc.interruptible {
            let colors = [allocation.colors[0], allocation.colors[1]];
            let render_targets = [allocation.render_targets[0], allocation.render_targets[1]];
            device.pair_render_targets_for_double_buffering(render_targets, colors);
            OffscreenBufferTargets::DoubleBuffered { colors, render_targets }
        } else {
            OffscreenBufferTargets::Single {
                color: allocation.colors[0],
                render_target: allocation.render_targets[0],
            }
        };

        let descriptor = OffscreenBufferDescriptor {
            handle,
            width: desc.width,
            height: desc.height,
            targets,
            depth_buffer,
            interruptible: desc.interruptible,
            dma: desc.dma,
            vram_size: estimate_offscreen_buffer_vram_size(desc),
        };
        engine_debug!(SOURCE, "uploaded offscreen buffer {} ({} bytes)", handle, descriptor.vram_size);
        self.offscreen_buffers.insert(handle, descriptor);
        Ok(())
    }

    /// Unpair, then delete render targets, color buffers and depth buffer
    pub fn unload_offscreen_buffer(&mut self, handle: OffscreenBufferHandle) -> Result<()> {
        let Some(descriptor) = self.offscreen_buffers.remove(&handle) else {
            engine_bail!(SOURCE, "offscreen buffer {} does not exist", handle);
        };
        let mut device = lock_device(&self.device);
        release_offscreen_buffer(&mut *device, &descriptor);
        Ok(())
    }

    /// True when the offscreen buffer is uploaded
    pub fn has_offscreen_buffer(&self, handle: OffscreenBufferHandle) -> bool {
        self.offscreen_buffers.contains_key(&handle)
    }

    /// Device objects of an offscreen buffer
    pub fn offscreen_buffer_descriptor(&self, handle: OffscreenBufferHandle) -> Option<&OffscreenBufferDescriptor> {
        self.offscreen_buffers.get(&handle)
    }

    /// Render target scenes assigned to the buffer are drawn into
    pub fn offscreen_buffer_device_handle(&self, handle: OffscreenBufferHandle) -> Option<DeviceResourceHandle> {
        self.offscreen_buffers.get(&handle).map(OffscreenBufferDescriptor::render_target)
    }

    /// Front color buffer of an offscreen buffer
    pub fn offscreen_buffer_color_buffer_device_handle(&self, handle: OffscreenBufferHandle) -> Option<DeviceResourceHandle> {
        self.offscreen_buffers.get(&handle).map(OffscreenBufferDescriptor::color_buffer)
    }

    /// Offscreen buffers, sorted by handle
    pub fn offscreen_buffer_handles(&self) -> Vec<OffscreenBufferHandle> {
        let mut handles: Vec<OffscreenBufferHandle> = self.offscreen_buffers.keys().copied().collect();
        handles.sort();
        handles
    }

    /// Delete every device object and stop the effect upload thread
    pub fn unload_all_resources(&mut self) {
        let scenes: Vec<SceneId> = self.scene_objects.keys().copied().collect();
        for scene in scenes {
            self.unload_all_scene_resources_for_scene(scene);
        }
        let mut device = lock_device(&self.device);
        for (_, descriptor) in self.offscreen_buffers.drain() {
            release_offscreen_buffer(&mut *device, &descriptor);
        }
        self.uploading.unload_all_resources(&mut self.registry, &mut *device);
    }
}

impl Drop for RendererResourceManager {
    fn drop(&mut self) {
        self.unload_all_resources();
    }
}

/// Objects created so far by `upload_offscreen_buffer`
#[derive(Default)]
struct OffscreenAllocation {
    colors: Vec<DeviceResourceHandle>,
    depth: Option<DeviceResourceHandle>,
    render_targets: Vec<DeviceResourceHandle>,
}

impl OffscreenAllocation {
    fn release(&self, device: &mut dyn GraphicsDevice) {
        for render_target in &self.render_targets {
            device.delete_render_target(*render_target);
        }
        for color in &self.colors {
            device.delete_render_buffer(*color);
        }
        if let Some(depth) = self.depth {
            device.delete_render_buffer(depth);
        }
    }
}

fn release_offscreen_buffer(device: &mut dyn GraphicsDevice, descriptor: &OffscreenBufferDescriptor) {
    if let OffscreenBufferTargets::DoubleBuffered { render_targets, .. } = descriptor.targets {
        device.unpair_render_targets(render_targets[0]);
    }
    for render_target in descriptor.render_targets() {
        device.delete_render_target(render_target);
    }
    for color in descriptor.color_buffers() {
        device.delete_render_buffer(color);
    }
    if let Some(depth) = descriptor.depth_buffer {
        device.delete_render_buffer(depth);
    }
}

fn delete_data_buffer(device: &mut dyn GraphicsDevice, buffer: &DataBufferObject) {
    match buffer.kind {
        DataBufferKind::VertexData => device.delete_vertex_buffer(buffer.device_handle),
        DataBufferKind::IndexData(_) => device.delete_index_buffer(buffer.device_handle),
    }
}

// ===== SCENE RESOURCE UPLOADER =====

impl SceneResourceUploader for RendererResourceManager {
    fn upload_render_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, desc: &RenderBufferDesc) {
        if self.reject_duplicate(scene, SceneResourceKind::RenderBuffer, handle) {
            return;
        }
        let device_handle = lock_device(&self.device).upload_render_buffer(desc);
        if device_handle.is_null() {
            engine_error!(SOURCE, "{}: failed to upload render buffer {}", scene, handle);
            return;
        }
        self.objects_mut(scene).render_buffers.insert(handle, (device_handle, desc.byte_size()));
    }

    fn unload_render_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle) {
        match self.scene_objects.get_mut(&scene).and_then(|o| o.render_buffers.remove(&handle)) {
            Some((device_handle, _)) => lock_device(&self.device).delete_render_buffer(device_handle),
            None => engine_warn!(SOURCE, "{}: unloading unknown render buffer {}", scene, handle),
        }
    }

    fn upload_render_target(&mut self, scene: SceneId, handle: SceneResourceHandle, buffers: &[SceneResourceHandle]) {
        if self.reject_duplicate(scene, SceneResourceKind::RenderTarget, handle) {
            return;
        }
        let attachments: Option<Vec<DeviceResourceHandle>> = buffers
            .iter()
            .map(|buffer| self.render_buffer_device_handle(scene, *buffer))
            .collect();
        let Some(attachments) = attachments else {
            engine_error!(SOURCE, "{}: render target {} uses a render buffer that is not uploaded", scene, handle);
            return;
        };
        let device_handle = lock_device(&self.device).upload_render_target(&attachments);
        if device_handle.is_null() {
            engine_error!(SOURCE, "{}: failed to upload render target {}", scene, handle);
            return;
        }
        self.objects_mut(scene).render_targets.insert(handle, device_handle);
    }

    fn unload_render_target(&mut self, scene: SceneId, handle: SceneResourceHandle) {
        match self.scene_objects.get_mut(&scene).and_then(|o| o.render_targets.remove(&handle)) {
            Some(device_handle) => lock_device(&self.device).delete_render_target(device_handle),
            None => engine_warn!(SOURCE, "{}: unloading unknown render target {}", scene, handle),
        }
    }

    fn upload_data_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, buffer: &DataBufferSource) {
        if self.reject_duplicate(scene, SceneResourceKind::DataBuffer, handle) {
            return;
        }
        let device_handle = {
            let mut device = lock_device(&self.device);
            match buffer.kind {
                DataBufferKind::VertexData => device.allocate_vertex_buffer(buffer.capacity),
                DataBufferKind::IndexData(index_type) => device.allocate_index_buffer(index_type, buffer.capacity),
            }
        };
        if device_handle.is_null() {
            engine_error!(SOURCE, "{}: failed to allocate data buffer {}", scene, handle);
            return;
        }
        self.objects_mut(scene).data_buffers.insert(
            handle,
            DataBufferObject { device_handle, kind: buffer.kind, capacity: buffer.capacity },
        );
    }

    fn update_data_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, buffer: &DataBufferSource) {
        let Some(object) = self.scene_objects.get(&scene).and_then(|o| o.data_buffers.get(&handle)).copied() else {
            engine_error!(SOURCE, "{}: updating data buffer {} that is not uploaded", scene, handle);
            return;
        };
        if buffer.data.len() > object.capacity {
            engine_error!(
                SOURCE,
                "{}: data buffer {} holds {} bytes, capacity is {}",
                scene,
                handle,
                buffer.data.len(),
                object.capacity
            );
            return;
        }
        let mut device = lock_device(&self.device);
        match object.kind {
            DataBufferKind::VertexData => device.upload_vertex_buffer_data(object.device_handle, &buffer.data),
            DataBufferKind::IndexData(_) => device.upload_index_buffer_data(object.device_handle, &buffer.data),
        }
    }

    fn unload_data_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle) {
        match self.scene_objects.get_mut(&scene).and_then(|o| o.data_buffers.remove(&handle)) {
            Some(object) => delete_data_buffer(&mut *lock_device(&self.device), &object),
            None => engine_warn!(SOURCE, "{}: unloading unknown data buffer {}", scene, handle),
        }
    }

    fn upload_texture_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, texture: &TextureBufferSource) {
        if self.reject_duplicate(scene, SceneResourceKind::TextureBuffer, handle) {
            return;
        }
        let device_handle = lock_device(&self.device).allocate_texture(&texture.info);
        if device_handle.is_null() {
            engine_error!(SOURCE, "{}: failed to allocate texture buffer {}", scene, handle);
            return;
        }
        self.objects_mut(scene).texture_buffers.insert(
            handle,
            TextureBufferObject {
                device_handle,
                initialized: false,
                byte_size: texture_byte_size(&texture.info),
            },
        );
    }

    fn update_texture_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, texture: &TextureBufferSource) {
        let Some(object) = self.scene_objects.get_mut(&scene).and_then(|o| o.texture_buffers.get_mut(&handle)) else {
            engine_error!(SOURCE, "{}: updating texture buffer {} that is not uploaded", scene, handle);
            return;
        };
        let full_upload = !object.initialized;
        object.initialized = true;
        let device_handle = object.device_handle;

        let mut device = lock_device(&self.device);
        for (mip, level) in texture.mips.iter().enumerate() {
            let mip = mip as u32;
            if full_upload {
                if !level.data.is_empty() {
                    let region = TextureRegion::full_mip(&texture.info, mip);
                    device.upload_texture_data(device_handle, mip, &region, &level.data);
                }
                continue;
            }
            let Some(region) = level.dirty_region.filter(|r| !r.is_empty()) else {
                continue;
            };
            match extract_texture_region(&texture.info, mip, &level.data, &region) {
                Some(bytes) => device.upload_texture_data(device_handle, mip, &region, &bytes),
                None => engine_error!(
                    SOURCE,
                    "{}: dirty region of texture buffer {} mip {} is out of bounds",
                    scene,
                    handle,
                    mip
                ),
            }
        }
    }

    fn unload_texture_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle) {
        match self.scene_objects.get_mut(&scene).and_then(|o| o.texture_buffers.remove(&handle)) {
            Some(object) => lock_device(&self.device).delete_texture(object.device_handle),
            None => engine_warn!(SOURCE, "{}: unloading unknown texture buffer {}", scene, handle),
        }
    }

    fn upload_uniform_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, buffer: &UniformBufferSource) {
        if self.reject_duplicate(scene, SceneResourceKind::UniformBuffer, handle) {
            return;
        }
        let device_handle = lock_device(&self.device).allocate_uniform_buffer(buffer.size);
        if device_handle.is_null() {
            engine_error!(SOURCE, "{}: failed to allocate uniform buffer {}", scene, handle);
            return;
        }
        self.objects_mut(scene).uniform_buffers.insert(handle, (device_handle, buffer.size));
    }

    fn update_uniform_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, buffer: &UniformBufferSource) {
        let Some(device_handle) = self.uniform_buffer_device_handle(scene, handle) else {
            engine_error!(SOURCE, "{}: updating uniform buffer {} that is not uploaded", scene, handle);
            return;
        };
        lock_device(&self.device).upload_uniform_buffer_data(device_handle, &buffer.data);
    }

    fn unload_uniform_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle) {
        match self.scene_objects.get_mut(&scene).and_then(|o| o.uniform_buffers.remove(&handle)) {
            Some((device_handle, _)) => lock_device(&self.device).delete_uniform_buffer(device_handle),
            None => engine_warn!(SOURCE, "{}: unloading unknown uniform buffer {}", scene, handle),
        }
    }

    fn upload_vertex_array(&mut self, scene: SceneId, handle: SceneResourceHandle, array: &VertexArraySource) {
        if self.reject_duplicate(scene, SceneResourceKind::VertexArray, handle) {
            return;
        }
        let Some(shader) = self.registry.resource_device_handle(array.effect) else {
            engine_error!(SOURCE, "{}: vertex array {} uses effect {} that is not uploaded", scene, handle, array.effect);
            return;
        };
        let vertex_buffers: Option<Vec<DeviceResourceHandle>> = array
            .vertex_buffers
            .iter()
            .map(|source| self.resolve_geometry(scene, *source))
            .collect();
        let index_buffer = match array.index_buffer {
            Some(source) => self.resolve_geometry(scene, source).map(Some),
            None => Some(None),
        };
        let (Some(vertex_buffers), Some(index_buffer)) = (vertex_buffers, index_buffer) else {
            engine_error!(SOURCE, "{}: vertex array {} uses geometry that is not uploaded", scene, handle);
            return;
        };

        let info = VertexArrayInfo { shader, vertex_buffers, index_buffer };
        let device_handle = lock_device(&self.device).allocate_vertex_array(&info);
        if device_handle.is_null() {
            engine_error!(SOURCE, "{}: failed to allocate vertex array {}", scene, handle);
            return;
        }
        self.objects_mut(scene).vertex_arrays.insert(handle, device_handle);
    }

    fn unload_vertex_array(&mut self, scene: SceneId, handle: SceneResourceHandle) {
        match self.scene_objects.get_mut(&scene).and_then(|o| o.vertex_arrays.remove(&handle)) {
            Some(device_handle) => lock_device(&self.device).delete_vertex_array(device_handle),
            None => engine_warn!(SOURCE, "{}: unloading unknown vertex array {}", scene, handle),
        }
    }
}

#[cfg(test)]
#[path = "renderer_resource_manager_tests.rs"]
mod tests;
