/// Mock graphics device for unit tests (no GPU required)
///
/// Every device call is recorded as a short string so tests can assert on
/// the exact sequence of uploads and deletions. Objects are allocated from a
/// `SlotMap`, which gives the same null/stale handle semantics as a real
/// backend.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::resource::EffectResource;
use super::device_types::*;
use super::graphics_device::{CompiledShader, GraphicsDevice, UploadContext};

// ============================================================================
// Mock compiled shader
// ============================================================================

#[derive(Debug)]
pub struct MockCompiledShader {
    pub name: String,
}

impl CompiledShader for MockCompiledShader {
    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Mock upload context
// ============================================================================

pub struct MockUploadContext {
    calls: Arc<Mutex<Vec<String>>>,
    failing_effects: Vec<String>,
    compile_delay: Duration,
    fail_enable: bool,
}

impl UploadContext for MockUploadContext {
    fn enable(&mut self) -> bool {
        self.calls.lock().unwrap().push("enable".to_string());
        !self.fail_enable
    }

    fn disable(&mut self) -> bool {
        self.calls.lock().unwrap().push("disable".to_string());
        true
    }

    fn upload_shader(&mut self, effect: &EffectResource) -> Option<Box<dyn CompiledShader>> {
        if !self.compile_delay.is_zero() {
            thread::sleep(self.compile_delay);
        }
        self.calls.lock().unwrap().push(format!("upload_shader({})", effect.name));
        if self.failing_effects.iter().any(|name| name == &effect.name) {
            return None;
        }
        Some(Box::new(MockCompiledShader { name: effect.name.clone() }))
    }
}

// ============================================================================
// Mock graphics device
// ============================================================================

#[derive(Debug, Clone)]
pub enum MockObject {
    VertexBuffer(usize),
    IndexBuffer(IndexType, usize),
    UniformBuffer(usize),
    Texture(TextureInfo),
    RenderBuffer(RenderBufferDesc),
    RenderTarget(Vec<DeviceResourceHandle>),
    VertexArray(VertexArrayInfo),
    Shader(String),
}

pub struct MockGraphicsDevice {
    objects: SlotMap<DeviceResourceHandle, MockObject>,
    calls: Vec<String>,
    binary_shaders: FxHashMap<DeviceResourceHandle, (Vec<u8>, BinaryShaderFormat)>,
    paired: Vec<[DeviceResourceHandle; 2]>,
    context_calls: Arc<Mutex<Vec<String>>>,

    /// Every allocation returns the null handle
    pub fail_allocations: bool,
    /// Binary shader uploads return the null handle
    pub reject_binary_shaders: bool,
    /// Value reported by `is_device_status_healthy`
    pub healthy: bool,
    /// `create_upload_context` returns `None`
    pub no_upload_context: bool,
    /// The upload context refuses to become current
    pub fail_context_enable: bool,
    /// Effects (by name) the upload context fails to compile
    pub failing_effects: Vec<String>,
    /// Artificial compile time of the upload context
    pub compile_delay: Duration,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            objects: SlotMap::with_key(),
            calls: Vec::new(),
            binary_shaders: FxHashMap::default(),
            paired: Vec::new(),
            context_calls: Arc::new(Mutex::new(Vec::new())),
            fail_allocations: false,
            reject_binary_shaders: false,
            healthy: true,
            no_upload_context: false,
            fail_context_enable: false,
            failing_effects: Vec::new(),
            compile_delay: Duration::ZERO,
        }
    }

    /// Shared as `Arc<Mutex<dyn GraphicsDevice>>` while the test keeps a typed handle
    pub fn shared() -> (Arc<Mutex<MockGraphicsDevice>>, Arc<Mutex<dyn GraphicsDevice>>) {
        let device = Arc::new(Mutex::new(MockGraphicsDevice::new()));
        let shared: Arc<Mutex<dyn GraphicsDevice>> = device.clone();
        (device, shared)
    }

    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls starting with `prefix`
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|call| call.starts_with(prefix)).count()
    }

    /// Calls made on the upload context (from any thread)
    pub fn context_calls(&self) -> Vec<String> {
        self.context_calls.lock().unwrap().clone()
    }

    pub fn live_object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object(&self, handle: DeviceResourceHandle) -> Option<&MockObject> {
        self.objects.get(handle)
    }

    pub fn is_paired(&self, render_target: DeviceResourceHandle) -> bool {
        self.paired.iter().any(|pair| pair.contains(&render_target))
    }

    /// Pretend the driver already holds a binary for `handle`
    pub fn set_binary_shader(&mut self, handle: DeviceResourceHandle, binary: Vec<u8>, format: BinaryShaderFormat) {
        self.binary_shaders.insert(handle, (binary, format));
    }

    fn allocate(&mut self, call: String, object: MockObject) -> DeviceResourceHandle {
        self.calls.push(call);
        if self.fail_allocations {
            return DeviceResourceHandle::default();
        }
        self.objects.insert(object)
    }

    fn delete(&mut self, call: &str, handle: DeviceResourceHandle) {
        self.calls.push(call.to_string());
        self.objects.remove(handle);
        self.binary_shaders.remove(&handle);
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn allocate_vertex_buffer(&mut self, size: usize) -> DeviceResourceHandle {
        self.allocate(format!("allocate_vertex_buffer({})", size), MockObject::VertexBuffer(size))
    }

    fn upload_vertex_buffer_data(&mut self, _handle: DeviceResourceHandle, data: &[u8]) {
        self.calls.push(format!("upload_vertex_buffer_data({})", data.len()));
    }

    fn delete_vertex_buffer(&mut self, handle: DeviceResourceHandle) {
        self.delete("delete_vertex_buffer", handle);
    }

    fn allocate_index_buffer(&mut self, index_type: IndexType, size: usize) -> DeviceResourceHandle {
        self.allocate(format!("allocate_index_buffer({})", size), MockObject::IndexBuffer(index_type, size))
    }

    fn upload_index_buffer_data(&mut self, _handle: DeviceResourceHandle, data: &[u8]) {
        self.calls.push(format!("upload_index_buffer_data({})", data.len()));
    }

    fn delete_index_buffer(&mut self, handle: DeviceResourceHandle) {
        self.delete("delete_index_buffer", handle);
    }

    fn allocate_uniform_buffer(&mut self, size: usize) -> DeviceResourceHandle {
        self.allocate(format!("allocate_uniform_buffer({})", size), MockObject::UniformBuffer(size))
    }

    fn upload_uniform_buffer_data(&mut self, _handle: DeviceResourceHandle, data: &[u8]) {
        self.calls.push(format!("upload_uniform_buffer_data({})", data.len()));
    }

    fn delete_uniform_buffer(&mut self, handle: DeviceResourceHandle) {
        self.delete("delete_uniform_buffer", handle);
    }

    fn allocate_texture(&mut self, info: &TextureInfo) -> DeviceResourceHandle {
        self.allocate(format!("allocate_texture({}x{})", info.width, info.height), MockObject::Texture(*info))
    }

    fn upload_texture_data(&mut self, _handle: DeviceResourceHandle, mip: u32, region: &TextureRegion, _data: &[u8]) {
        self.calls.push(format!(
            "upload_texture_data(mip {}, {}x{} at {},{})",
            mip, region.width, region.height, region.x, region.y
        ));
    }

    fn delete_texture(&mut self, handle: DeviceResourceHandle) {
        self.delete("delete_texture", handle);
    }

    fn upload_render_buffer(&mut self, desc: &RenderBufferDesc) -> DeviceResourceHandle {
        self.allocate(format!("upload_render_buffer({:?})", desc.format), MockObject::RenderBuffer(*desc))
    }

    fn upload_dma_render_buffer(&mut self, desc: &RenderBufferDesc) -> DeviceResourceHandle {
        self.allocate(format!("upload_dma_render_buffer({:?})", desc.format), MockObject::RenderBuffer(*desc))
    }

    fn delete_render_buffer(&mut self, handle: DeviceResourceHandle) {
        self.delete("delete_render_buffer", handle);
    }

    fn upload_render_target(&mut self, attachments: &[DeviceResourceHandle]) -> DeviceResourceHandle {
        self.allocate(
            format!("upload_render_target({})", attachments.len()),
            MockObject::RenderTarget(attachments.to_vec()),
        )
    }

    fn delete_render_target(&mut self, handle: DeviceResourceHandle) {
        self.delete("delete_render_target", handle);
    }

    fn pair_render_targets_for_double_buffering(
        &mut self,
        render_targets: [DeviceResourceHandle; 2],
        _color_buffers: [DeviceResourceHandle; 2],
    ) {
        self.calls.push("pair_render_targets_for_double_buffering".to_string());
        self.paired.push(render_targets);
    }

    fn unpair_render_targets(&mut self, render_target: DeviceResourceHandle) {
        self.calls.push("unpair_render_targets".to_string());
        self.paired.retain(|pair| !pair.contains(&render_target));
    }

    fn allocate_vertex_array(&mut self, info: &VertexArrayInfo) -> DeviceResourceHandle {
        self.allocate(
            format!("allocate_vertex_array({})", info.vertex_buffers.len()),
            MockObject::VertexArray(info.clone()),
        )
    }

    fn delete_vertex_array(&mut self, handle: DeviceResourceHandle) {
        self.delete("delete_vertex_array", handle);
    }

    fn upload_binary_shader(
        &mut self,
        effect: &EffectResource,
        binary: &[u8],
        format: BinaryShaderFormat,
    ) -> DeviceResourceHandle {
        self.calls.push(format!("upload_binary_shader({})", effect.name));
        if self.reject_binary_shaders || self.fail_allocations {
            return DeviceResourceHandle::default();
        }
        let handle = self.objects.insert(MockObject::Shader(effect.name.clone()));
        self.binary_shaders.insert(handle, (binary.to_vec(), format));
        handle
    }

    fn get_binary_shader(&mut self, handle: DeviceResourceHandle) -> Option<(Vec<u8>, BinaryShaderFormat)> {
        self.calls.push("get_binary_shader".to_string());
        self.binary_shaders.get(&handle).cloned()
    }

    fn register_shader(&mut self, shader: Box<dyn CompiledShader>) -> DeviceResourceHandle {
        let name = shader.name().to_string();
        self.allocate(format!("register_shader({})", name), MockObject::Shader(name))
    }

    fn delete_shader(&mut self, handle: DeviceResourceHandle) {
        self.delete("delete_shader", handle);
    }

    fn create_upload_context(&mut self) -> Option<Box<dyn UploadContext>> {
        self.calls.push("create_upload_context".to_string());
        if self.no_upload_context {
            return None;
        }
        Some(Box::new(MockUploadContext {
            calls: self.context_calls.clone(),
            failing_effects: self.failing_effects.clone(),
            compile_delay: self.compile_delay,
            fail_enable: self.fail_context_enable,
        }))
    }

    fn is_device_status_healthy(&self) -> bool {
        self.healthy
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
