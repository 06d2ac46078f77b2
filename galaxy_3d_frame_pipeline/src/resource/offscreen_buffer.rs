/// Offscreen buffers - render targets scenes can be assigned to instead of
/// the framebuffer.

use crate::graphics_device::{DeviceResourceHandle, RenderBufferFormat};
use crate::handles::OffscreenBufferHandle;

/// Depth attachment of an offscreen buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthStencilBufferType {
    None,
    Depth,
    #[default]
    DepthStencil,
}

impl DepthStencilBufferType {
    /// Format of the depth/stencil render buffer, `None` when there is none
    pub fn render_buffer_format(self) -> Option<RenderBufferFormat> {
        match self {
            DepthStencilBufferType::None => None,
            DepthStencilBufferType::Depth => Some(RenderBufferFormat::Depth24),
            DepthStencilBufferType::DepthStencil => Some(RenderBufferFormat::Depth24Stencil8),
        }
    }
}

/// Parameters of `CreateOffscreenBuffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffscreenBufferDesc {
    pub width: u32,
    pub height: u32,
    /// MSAA sample count, 0 means no multisampling
    pub samples: u32,
    /// Double-buffered; rendering into it may span several frames
    pub interruptible: bool,
    pub depth_stencil: DepthStencilBufferType,
    /// Color buffer in DMA-shareable memory
    pub dma: bool,
}

impl OffscreenBufferDesc {
    /// Single-buffered buffer with a depth-stencil attachment
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            samples: 0,
            interruptible: false,
            depth_stencil: DepthStencilBufferType::default(),
            dma: false,
        }
    }
}

/// Color buffers and render targets of an offscreen buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffscreenBufferTargets {
    Single {
        color: DeviceResourceHandle,
        render_target: DeviceResourceHandle,
    },
    /// Paired with the device; index 0 is the one rendered into first
    DoubleBuffered {
        colors: [DeviceResourceHandle; 2],
        render_targets: [DeviceResourceHandle; 2],
    },
}

/// Device objects of an uploaded offscreen buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffscreenBufferDescriptor {
    pub handle: OffscreenBufferHandle,
    pub width: u32,
    pub height: u32,
    pub targets: OffscreenBufferTargets,
    pub depth_buffer: Option<DeviceResourceHandle>,
    pub interruptible: bool,
    pub dma: bool,
    /// Estimated VRAM use in bytes
    pub vram_size: usize,
}

impl OffscreenBufferDescriptor {
    /// Render target scenes are drawn into
    pub fn render_target(&self) -> DeviceResourceHandle {
        match self.targets {
            OffscreenBufferTargets::Single { render_target, .. } => render_target,
            OffscreenBufferTargets::DoubleBuffered { render_targets, .. } => render_targets[0],
        }
    }

    /// Color buffer consumers sample from
    pub fn color_buffer(&self) -> DeviceResourceHandle {
        match self.targets {
            OffscreenBufferTargets::Single { color, .. } => color,
            OffscreenBufferTargets::DoubleBuffered { colors, .. } => colors[0],
        }
    }

    /// True for interruptible buffers
    pub fn is_double_buffered(&self) -> bool {
        matches!(self.targets, OffscreenBufferTargets::DoubleBuffered { .. })
    }

    /// Render targets in allocation order
    pub fn render_targets(&self) -> Vec<DeviceResourceHandle> {
        match self.targets {
            OffscreenBufferTargets::Single { render_target, .. } => vec![render_target],
            OffscreenBufferTargets::DoubleBuffered { render_targets, .. } => render_targets.to_vec(),
        }
    }

    /// Color buffers in allocation order
    pub fn color_buffers(&self) -> Vec<DeviceResourceHandle> {
        match self.targets {
            OffscreenBufferTargets::Single { color, .. } => vec![color],
            OffscreenBufferTargets::DoubleBuffered { colors, .. } => colors.to_vec(),
        }
    }
}

/// VRAM estimate: `w * h * max(1, samples) * texel bytes` per color buffer
/// (two when interruptible) plus the depth buffer
pub fn estimate_offscreen_buffer_vram_size(desc: &OffscreenBufferDesc) -> usize {
    let texels = desc.width as usize * desc.height as usize * desc.samples.max(1) as usize;
    let color_count = if desc.interruptible { 2 } else { 1 };
    let color = texels * RenderBufferFormat::Rgba8.texel_bytes() * color_count;
    let depth = desc
        .depth_stencil
        .render_buffer_format()
        .map_or(0, |format| texels * format.texel_bytes());
    color + depth
}
