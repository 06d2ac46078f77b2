/// Payloads of content-addressed client resources.
///
/// Payload bytes are reference counted so that handing data to the
/// registry, the uploader and the effect upload thread never copies it.

use std::sync::Arc;
use bytemuck::Pod;
use crate::graphics_device::{IndexType, TextureInfo, TextureKind};
use super::content_hash::ResourceContentHash;

// ===== EFFECT =====

/// Shader sources of one effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectResource {
    pub hash: ResourceContentHash,
    pub name: String,
    pub vertex_source: String,
    pub fragment_source: String,
    pub geometry_source: Option<String>,
}

impl EffectResource {
    /// Effect without a geometry stage; the hash is derived from the sources
    pub fn new(name: &str, vertex_source: &str, fragment_source: &str) -> Self {
        Self::with_geometry(name, vertex_source, fragment_source, None)
    }

    /// Effect with an optional geometry stage
    pub fn with_geometry(
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
        geometry_source: Option<&str>,
    ) -> Self {
        let mut bytes = Vec::with_capacity(vertex_source.len() + fragment_source.len() + 2);
        bytes.extend_from_slice(vertex_source.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(fragment_source.as_bytes());
        if let Some(geometry) = geometry_source {
            bytes.push(0);
            bytes.extend_from_slice(geometry.as_bytes());
        }
        Self {
            hash: ResourceContentHash::compute_tagged(&[ResourceKind::Effect as u32], &bytes),
            name: name.to_string(),
            vertex_source: vertex_source.to_string(),
            fragment_source: fragment_source.to_string(),
            geometry_source: geometry_source.map(str::to_string),
        }
    }

    /// Total size of the shader sources
    pub fn byte_size(&self) -> usize {
        self.vertex_source.len()
            + self.fragment_source.len()
            + self.geometry_source.as_ref().map_or(0, String::len)
    }
}

// ===== KIND / PAYLOAD =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    VertexBuffer,
    IndexBuffer,
    Texture2D,
    Texture3D,
    TextureCube,
    Effect,
}

#[derive(Debug, Clone)]
pub enum ResourcePayload {
    VertexBuffer(Arc<[u8]>),
    IndexBuffer { index_type: IndexType, data: Arc<[u8]> },
    /// One byte blob per mip level
    Texture { info: TextureInfo, mips: Vec<Arc<[u8]>> },
    Effect(Arc<EffectResource>),
}

/// A resource payload with its content hash
#[derive(Debug, Clone)]
pub struct ResourceData {
    hash: ResourceContentHash,
    payload: ResourcePayload,
}

impl ResourceData {
    /// Payload with a caller-computed hash
    pub fn new(hash: ResourceContentHash, payload: ResourcePayload) -> Self {
        Self { hash, payload }
    }

    /// Vertex buffer from any plain-old-data vertex type (e.g. `glam::Vec3`)
    pub fn vertex_buffer<T: Pod>(vertices: &[T]) -> Self {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        Self::new(
            ResourceContentHash::compute_tagged(&[ResourceKind::VertexBuffer as u32], bytes),
            ResourcePayload::VertexBuffer(bytes.into()),
        )
    }

    /// 16-bit index buffer
    pub fn index_buffer_u16(indices: &[u16]) -> Self {
        Self::index_buffer(IndexType::U16, bytemuck::cast_slice(indices))
    }

    /// 32-bit index buffer
    pub fn index_buffer_u32(indices: &[u32]) -> Self {
        Self::index_buffer(IndexType::U32, bytemuck::cast_slice(indices))
    }

    fn index_buffer(index_type: IndexType, bytes: &[u8]) -> Self {
        let tags = [ResourceKind::IndexBuffer as u32, index_type as u32];
        Self::new(
            ResourceContentHash::compute_tagged(&tags, bytes),
            ResourcePayload::IndexBuffer { index_type, data: bytes.into() },
        )
    }

    /// Texture with one byte blob per mip level
    pub fn texture(info: TextureInfo, mips: Vec<Vec<u8>>) -> Self {
        let mut bytes: Vec<u8> = Vec::new();
        for mip in &mips {
            bytes.extend_from_slice(mip);
        }
        let tags = [
            texture_resource_kind(info.kind) as u32,
            info.format as u32,
            info.width,
            info.height,
            info.depth,
            info.mip_levels,
        ];
        Self::new(
            ResourceContentHash::compute_tagged(&tags, &bytes),
            ResourcePayload::Texture { info, mips: mips.into_iter().map(Arc::from).collect() },
        )
    }

    /// Effect resource; keeps the hash computed from its sources
    pub fn effect(effect: EffectResource) -> Self {
        Self::new(effect.hash, ResourcePayload::Effect(Arc::new(effect)))
    }

    /// Content hash, also identifying the resource kind
    pub fn hash(&self) -> ResourceContentHash {
        self.hash
    }

    /// Payload bytes (shared)
    pub fn payload(&self) -> &ResourcePayload {
        &self.payload
    }

    /// Kind derived from the payload
    pub fn kind(&self) -> ResourceKind {
        match &self.payload {
            ResourcePayload::VertexBuffer(_) => ResourceKind::VertexBuffer,
            ResourcePayload::IndexBuffer { .. } => ResourceKind::IndexBuffer,
            ResourcePayload::Texture { info, .. } => texture_resource_kind(info.kind),
            ResourcePayload::Effect(_) => ResourceKind::Effect,
        }
    }

    /// Payload size in bytes, summed over mip levels
    pub fn byte_size(&self) -> usize {
        match &self.payload {
            ResourcePayload::VertexBuffer(data) => data.len(),
            ResourcePayload::IndexBuffer { data, .. } => data.len(),
            ResourcePayload::Texture { mips, .. } => mips.iter().map(|mip| mip.len()).sum(),
            ResourcePayload::Effect(effect) => effect.byte_size(),
        }
    }

    /// The effect, for effect resources
    pub fn as_effect(&self) -> Option<&Arc<EffectResource>> {
        match &self.payload {
            ResourcePayload::Effect(effect) => Some(effect),
            _ => None,
        }
    }
}

fn texture_resource_kind(kind: TextureKind) -> ResourceKind {
    match kind {
        TextureKind::Texture2D => ResourceKind::Texture2D,
        TextureKind::Texture3D => ResourceKind::Texture3D,
        TextureKind::TextureCube => ResourceKind::TextureCube,
    }
}

#[cfg(test)]
#[path = "resource_data_tests.rs"]
mod tests;
