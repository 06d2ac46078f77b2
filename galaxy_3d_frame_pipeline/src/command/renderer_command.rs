/// Commands the renderer executes at the start of every frame.
///
/// Producers on any thread push into a `RendererCommandBuffer`; the render
/// thread swaps the whole queue out once per frame.

use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use glam::{Vec2, Vec3, Vec4};
use crate::display::{ClearFlags, DisplayBufferId, DisplayConfig};
use crate::handles::{DataSlotId, DisplayHandle, OffscreenBufferHandle, SceneId};
use crate::resource::{BinaryShaderCache, OffscreenBufferDesc};
use crate::scene::SceneUpdate;
use crate::scene_resource::SceneResourceSource;

/// Mesh used to warp the framebuffer of a display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarpingData {
    pub indices: Vec<u16>,
    pub vertex_positions: Vec<Vec3>,
    pub texture_coordinates: Vec<Vec2>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPixelsParams {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Ignore the rectangle and read the whole buffer
    pub full_screen: bool,
    /// Save to this file instead of returning the pixels
    pub file_name: Option<String>,
}

/// Operations forwarded to the system compositor
#[derive(Debug, Clone, PartialEq)]
pub enum SystemCompositorCommand {
    ListIviSurfaces,
    SetIviSurfaceVisibility { surface: u32, visible: bool },
    SetIviSurfaceOpacity { surface: u32, opacity: f32 },
    SetIviSurfaceDestRectangle { surface: u32, x: i32, y: i32, width: u32, height: u32 },
    SetIviLayerVisibility { layer: u32, visible: bool },
    AddIviSurfaceToIviLayer { surface: u32, layer: u32 },
    RemoveIviSurfaceFromIviLayer { surface: u32, layer: u32 },
    DestroyIviSurface { surface: u32 },
    Screenshot { file_name: String, screen: i32 },
}

pub enum RendererCommand {
    CreateDisplay {
        display: DisplayHandle,
        config: DisplayConfig,
        binary_shader_cache: Option<Arc<dyn BinaryShaderCache>>,
    },
    DestroyDisplay { display: DisplayHandle },

    ReceiveScene { scene: SceneId, source: Box<dyn SceneResourceSource> },
    UpdateScene { scene: SceneId, update: SceneUpdate },
    UnpublishScene { scene: SceneId },
    MapScene { scene: SceneId, display: DisplayHandle },
    UnmapScene { scene: SceneId },
    ShowScene { scene: SceneId },
    HideScene { scene: SceneId },
    AssignSceneToDisplayBuffer { scene: SceneId, buffer: DisplayBufferId, render_order: i32 },

    CreateOffscreenBuffer { display: DisplayHandle, buffer: OffscreenBufferHandle, desc: OffscreenBufferDesc },
    DestroyOffscreenBuffer { display: DisplayHandle, buffer: OffscreenBufferHandle },

    LinkData {
        provider_scene: SceneId,
        provider_slot: DataSlotId,
        consumer_scene: SceneId,
        consumer_slot: DataSlotId,
    },
    LinkOffscreenBuffer { buffer: OffscreenBufferHandle, consumer_scene: SceneId, consumer_slot: DataSlotId },
    UnlinkData { consumer_scene: SceneId, consumer_slot: DataSlotId },

    SetClearColor { display: DisplayHandle, buffer: DisplayBufferId, color: Vec4 },
    SetClearFlags { display: DisplayHandle, buffer: DisplayBufferId, flags: ClearFlags },
    /// Budgets in microseconds
    SetFrameTimerLimits {
        scene_resources_upload: u64,
        resources_upload: u64,
        scene_actions_apply: u64,
        offscreen_buffer_render: u64,
    },
    /// When disabled every display buffer is re-rendered each frame
    SetSkippingOfUnmodifiedBuffers { enabled: bool },
    /// Updates a mapped scene may accumulate while waiting for its resources
    /// before they are applied regardless
    SetForceApplyPendingUpdatesLimit { limit: usize },
    /// Updates a mapped scene may accumulate before it is dropped
    SetForceUnsubscribePendingUpdatesLimit { limit: usize },
    UpdateWarpingData { display: DisplayHandle, data: WarpingData },
    ReadPixels { display: DisplayHandle, buffer: DisplayBufferId, params: ReadPixelsParams },

    SystemCompositor(SystemCompositorCommand),

    LogStatistics,
    LogInfo { verbose: bool },
    ConfirmationEcho { text: String },
}

impl RendererCommand {
    /// Variant name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            RendererCommand::CreateDisplay { .. } => "CreateDisplay",
            RendererCommand::DestroyDisplay { .. } => "DestroyDisplay",
            RendererCommand::ReceiveScene { .. } => "ReceiveScene",
            RendererCommand::UpdateScene { .. } => "UpdateScene",
            RendererCommand::UnpublishScene { .. } => "UnpublishScene",
            RendererCommand::MapScene { .. } => "MapScene",
            RendererCommand::UnmapScene { .. } => "UnmapScene",
            RendererCommand::ShowScene { .. } => "ShowScene",
            RendererCommand::HideScene { .. } => "HideScene",
            RendererCommand::AssignSceneToDisplayBuffer { .. } => "AssignSceneToDisplayBuffer",
            RendererCommand::CreateOffscreenBuffer { .. } => "CreateOffscreenBuffer",
            RendererCommand::DestroyOffscreenBuffer { .. } => "DestroyOffscreenBuffer",
            RendererCommand::LinkData { .. } => "LinkData",
            RendererCommand::LinkOffscreenBuffer { .. } => "LinkOffscreenBuffer",
            RendererCommand::UnlinkData { .. } => "UnlinkData",
            RendererCommand::SetClearColor { .. } => "SetClearColor",
            RendererCommand::SetClearFlags { .. } => "SetClearFlags",
            RendererCommand::SetFrameTimerLimits { .. } => "SetFrameTimerLimits",
            RendererCommand::SetSkippingOfUnmodifiedBuffers { .. } => "SetSkippingOfUnmodifiedBuffers",
            RendererCommand::SetForceApplyPendingUpdatesLimit { .. } => "SetForceApplyPendingUpdatesLimit",
            RendererCommand::SetForceUnsubscribePendingUpdatesLimit { .. } => "SetForceUnsubscribePendingUpdatesLimit",
            RendererCommand::UpdateWarpingData { .. } => "UpdateWarpingData",
            RendererCommand::ReadPixels { .. } => "ReadPixels",
            RendererCommand::SystemCompositor(_) => "SystemCompositor",
            RendererCommand::LogStatistics => "LogStatistics",
            RendererCommand::LogInfo { .. } => "LogInfo",
            RendererCommand::ConfirmationEcho { .. } => "ConfirmationEcho",
        }
    }

    /// Scene updates are frequent and logged at debug level only
    pub fn is_scene_update(&self) -> bool {
        matches!(self, RendererCommand::UpdateScene { .. })
    }
}

/// Thread-safe queue of renderer commands
#[derive(Default)]
pub struct RendererCommandBuffer {
    commands: Mutex<Vec<RendererCommand>>,
}

impl RendererCommandBuffer {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command; callable from any thread
    pub fn enqueue_command(&self, command: RendererCommand) {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner).push(command);
    }

    /// Exchange the queued commands with `commands` (expected empty)
    pub fn swap_commands(&self, commands: &mut Vec<RendererCommand>) {
        let mut queued = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        mem::swap(&mut *queued, commands);
    }

    /// Commands waiting for the next frame
    pub fn len(&self) -> usize {
        self.commands.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when no command is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
