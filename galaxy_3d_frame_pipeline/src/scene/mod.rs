//! Scene management module
//!
//! Scene state machine of the renderer and data links between scenes.

pub mod renderer_scenes;
pub mod scene_links;

pub use renderer_scenes::{RendererScene, RendererScenes, SceneState, SceneUpdate};
pub use scene_links::{DataLink, LinkProvider, SceneLinks};
