//! Renderer module
//!
//! The frame pipeline that owns every display and scene and runs the
//! per-frame tick, plus the collaborators it is built with.

pub mod display_device_factory;
pub mod system_compositor;
pub mod frame_pipeline;

pub use display_device_factory::DisplayDeviceFactory;
pub use system_compositor::SystemCompositorController;
pub use frame_pipeline::{
    DisplayBundle, FramePipeline, ReadPixelsRequest, DEFAULT_FORCE_APPLY_PENDING_UPDATES_LIMIT,
    DEFAULT_FORCE_UNSUBSCRIBE_PENDING_UPDATES_LIMIT,
};
