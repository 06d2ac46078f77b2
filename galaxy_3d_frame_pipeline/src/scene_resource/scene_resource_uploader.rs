/// Device-side executor of scene resource actions.

use crate::graphics_device::RenderBufferDesc;
use crate::handles::{SceneId, SceneResourceHandle};
use super::scene_resource_source::{
    DataBufferSource, TextureBufferSource, UniformBufferSource, VertexArraySource,
};

/// Creates, updates and deletes the device objects owned by scenes
///
/// Implemented by `RendererResourceManager`. Failures are logged by the
/// implementation; an action is never retried.
pub trait SceneResourceUploader {
    fn upload_render_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, desc: &RenderBufferDesc);
    fn unload_render_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle);

    fn upload_render_target(&mut self, scene: SceneId, handle: SceneResourceHandle, buffers: &[SceneResourceHandle]);
    fn unload_render_target(&mut self, scene: SceneId, handle: SceneResourceHandle);

    fn upload_data_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, buffer: &DataBufferSource);
    fn update_data_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, buffer: &DataBufferSource);
    fn unload_data_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle);

    fn upload_texture_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, texture: &TextureBufferSource);
    /// Uploads only the dirty region of each mip
    fn update_texture_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, texture: &TextureBufferSource);
    fn unload_texture_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle);

    fn upload_uniform_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, buffer: &UniformBufferSource);
    fn update_uniform_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle, buffer: &UniformBufferSource);
    fn unload_uniform_buffer(&mut self, scene: SceneId, handle: SceneResourceHandle);

    fn upload_vertex_array(&mut self, scene: SceneId, handle: SceneResourceHandle, array: &VertexArraySource);
    fn unload_vertex_array(&mut self, scene: SceneId, handle: SceneResourceHandle);
}
