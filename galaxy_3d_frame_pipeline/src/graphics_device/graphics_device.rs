/// Traits implemented by the graphics backend.
///
/// The pipeline only talks to the GPU through these. The main context
/// (`GraphicsDevice`) is shared behind `Arc<Mutex<dyn GraphicsDevice>>`
/// by everything working for one display; the secondary context
/// (`UploadContext`) is moved into the effect upload thread.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use crate::resource::EffectResource;
use super::device_types::*;

/// Shader program compiled by an upload context, ready to be registered
/// with the main context.
pub trait CompiledShader: Send + fmt::Debug {
    /// Name of the effect it was compiled from
    fn name(&self) -> &str;
}

/// Main graphics context of a display
///
/// Allocation methods return `DeviceResourceHandle::null()` on failure.
pub trait GraphicsDevice: Send {
    // ----- vertex / index / uniform buffers -----
    fn allocate_vertex_buffer(&mut self, size: usize) -> DeviceResourceHandle;
    fn upload_vertex_buffer_data(&mut self, handle: DeviceResourceHandle, data: &[u8]);
    fn delete_vertex_buffer(&mut self, handle: DeviceResourceHandle);

    fn allocate_index_buffer(&mut self, index_type: IndexType, size: usize) -> DeviceResourceHandle;
    fn upload_index_buffer_data(&mut self, handle: DeviceResourceHandle, data: &[u8]);
    fn delete_index_buffer(&mut self, handle: DeviceResourceHandle);

    fn allocate_uniform_buffer(&mut self, size: usize) -> DeviceResourceHandle;
    fn upload_uniform_buffer_data(&mut self, handle: DeviceResourceHandle, data: &[u8]);
    fn delete_uniform_buffer(&mut self, handle: DeviceResourceHandle);

    // ----- textures -----
    fn allocate_texture(&mut self, info: &TextureInfo) -> DeviceResourceHandle;
    fn upload_texture_data(
        &mut self,
        handle: DeviceResourceHandle,
        mip: u32,
        region: &TextureRegion,
        data: &[u8],
    );
    fn delete_texture(&mut self, handle: DeviceResourceHandle);

    // ----- render buffers and targets -----
    fn upload_render_buffer(&mut self, desc: &RenderBufferDesc) -> DeviceResourceHandle;
    /// Color buffer backed by DMA-shareable memory
    fn upload_dma_render_buffer(&mut self, desc: &RenderBufferDesc) -> DeviceResourceHandle;
    fn delete_render_buffer(&mut self, handle: DeviceResourceHandle);

    /// Create a render target from attachments (colors first, depth last)
    fn upload_render_target(&mut self, attachments: &[DeviceResourceHandle]) -> DeviceResourceHandle;
    fn delete_render_target(&mut self, handle: DeviceResourceHandle);

    /// Make two render targets swap their color buffers on every finished pass
    fn pair_render_targets_for_double_buffering(
        &mut self,
        render_targets: [DeviceResourceHandle; 2],
        color_buffers: [DeviceResourceHandle; 2],
    );
    fn unpair_render_targets(&mut self, render_target: DeviceResourceHandle);

    // ----- vertex arrays -----
    fn allocate_vertex_array(&mut self, info: &VertexArrayInfo) -> DeviceResourceHandle;
    fn delete_vertex_array(&mut self, handle: DeviceResourceHandle);

    // ----- shaders -----
    fn upload_binary_shader(
        &mut self,
        effect: &EffectResource,
        binary: &[u8],
        format: BinaryShaderFormat,
    ) -> DeviceResourceHandle;
    fn get_binary_shader(&mut self, handle: DeviceResourceHandle) -> Option<(Vec<u8>, BinaryShaderFormat)>;
    fn register_shader(&mut self, shader: Box<dyn CompiledShader>) -> DeviceResourceHandle;
    fn delete_shader(&mut self, handle: DeviceResourceHandle);

    // ----- contexts / health -----

    /// Create a secondary context sharing objects with this one
    fn create_upload_context(&mut self) -> Option<Box<dyn UploadContext>>;
    fn is_device_status_healthy(&self) -> bool;
}

/// Secondary context used off the render thread to compile shaders
pub trait UploadContext: Send {
    /// Make the context current on the calling thread
    fn enable(&mut self) -> bool;
    /// Release the context from the calling thread
    fn disable(&mut self) -> bool;
    /// Compile an effect; `None` when compilation fails. May block for a long time.
    fn upload_shader(&mut self, effect: &EffectResource) -> Option<Box<dyn CompiledShader>>;
}

/// Lock a shared device; a poisoned lock still yields the device
pub fn lock_device(device: &Mutex<dyn GraphicsDevice>) -> MutexGuard<'_, dyn GraphicsDevice + 'static> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}
