/// Scene-owned GPU objects and the action log that creates, updates and
/// destroys them.

pub mod scene_resource_action;
pub mod scene_resource_source;
pub mod scene_resource_uploader;
pub mod scene_resource_action_log;

pub use scene_resource_action::*;
pub use scene_resource_source::*;
pub use scene_resource_uploader::*;
pub use scene_resource_action_log::*;
