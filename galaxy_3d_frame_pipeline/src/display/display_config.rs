/// Display configuration

use bitflags::bitflags;
use glam::Vec4;

bitflags! {
    /// Buffers cleared before a display buffer is rendered
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR   = 1 << 0;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

impl Default for ClearFlags {
    fn default() -> Self {
        ClearFlags::all()
    }
}

/// Settings of one display, fixed at creation
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Framebuffer width in pixels
    pub width: u32,
    /// Framebuffer height in pixels
    pub height: u32,
    /// Initial clear color of the framebuffer and new offscreen buffers
    pub clear_color: Vec4,
    pub clear_flags: ClearFlags,
    /// Uploads between two `ResourcesUpload` budget checks (at least 1)
    pub resource_upload_batch_size: usize,
    /// Compile effects on a background thread
    pub async_effect_upload: bool,
    /// Accept `UpdateWarpingData` commands
    pub warping_enabled: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            clear_flags: ClearFlags::default(),
            resource_upload_batch_size: 10,
            async_effect_upload: true,
            warping_enabled: false,
        }
    }
}
