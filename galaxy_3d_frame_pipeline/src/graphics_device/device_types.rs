/// Descriptions and handles exchanged with the graphics device.

use slotmap::new_key_type;

// ===== DEVICE HANDLE =====

new_key_type! {
    /// Opaque handle of an object living on the graphics device.
    ///
    /// `DeviceResourceHandle::null()` (also the `Default`) is the invalid
    /// handle returned by the device when an allocation fails.
    pub struct DeviceResourceHandle;
}

// ===== BUFFERS =====

/// Element type of an index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    /// Bytes per index
    pub fn byte_size(self) -> usize {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

// ===== TEXTURES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Texture2D,
    Texture3D,
    TextureCube,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    Rgba16F,
    Rgba32F,
}

impl TextureFormat {
    /// Bytes per texel
    pub fn texel_bytes(self) -> usize {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rg8 => 2,
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgba16F => 8,
            TextureFormat::Rgba32F => 16,
        }
    }
}

/// Shape and format of a texture allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub kind: TextureKind,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    /// Depth for 3D textures, 1 otherwise
    pub depth: u32,
    pub mip_levels: u32,
}

impl TextureInfo {
    /// Single-mip 2D texture description
    pub fn texture_2d(format: TextureFormat, width: u32, height: u32) -> Self {
        Self { kind: TextureKind::Texture2D, format, width, height, depth: 1, mip_levels: 1 }
    }

    /// Size of a mip level in texels (width, height, depth)
    pub fn mip_extent(&self, mip: u32) -> (u32, u32, u32) {
        let depth = match self.kind {
            TextureKind::Texture3D => (self.depth >> mip).max(1),
            _ => 1,
        };
        ((self.width >> mip).max(1), (self.height >> mip).max(1), depth)
    }
}

/// Box inside one mip level of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl TextureRegion {
    /// Region covering a whole mip level
    pub fn full_mip(info: &TextureInfo, mip: u32) -> Self {
        let (width, height, depth) = info.mip_extent(mip);
        Self { x: 0, y: 0, z: 0, width, height, depth }
    }

    /// True when the region covers no texel
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }
}

// ===== RENDER BUFFERS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderBufferFormat {
    Rgba8,
    Depth24,
    Depth32,
    Depth24Stencil8,
}

impl RenderBufferFormat {
    /// Bytes per texel
    pub fn texel_bytes(self) -> usize {
        match self {
            RenderBufferFormat::Rgba8 => 4,
            RenderBufferFormat::Depth24 => 3,
            RenderBufferFormat::Depth32 => 4,
            RenderBufferFormat::Depth24Stencil8 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderBufferAccess {
    /// Can be sampled after rendering
    ReadWrite,
    /// Render-only attachment
    WriteOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderBufferDesc {
    pub width: u32,
    pub height: u32,
    pub format: RenderBufferFormat,
    pub access: RenderBufferAccess,
    /// MSAA sample count, 0 means no multisampling
    pub samples: u32,
}

impl RenderBufferDesc {
    /// Estimated VRAM use
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.samples.max(1) as usize * self.format.texel_bytes()
    }
}

// ===== GEOMETRY BINDING =====

/// Device objects bound together for drawing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexArrayInfo {
    pub shader: DeviceResourceHandle,
    pub vertex_buffers: Vec<DeviceResourceHandle>,
    pub index_buffer: Option<DeviceResourceHandle>,
}

// ===== SHADERS =====

/// Driver-specific format tag of a binary shader blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryShaderFormat(pub u32);
