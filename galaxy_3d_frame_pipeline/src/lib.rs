/*!
# Galaxy 3D Frame Pipeline

Frame-budgeted GPU resource pipeline of the Galaxy 3D renderer.

Clients publish scenes and queue commands; once per frame the pipeline
executes those commands, uploads the client resources scenes need, replays
the scene resource actions that create scene-owned GPU objects, and keeps
track of which display buffers must be redrawn. Every step that may take
long is bounded by a per-section frame time budget, and effect compilation
can run on a background thread.

## Architecture

- **FramePipeline**: owns displays and scenes, runs the per-frame tick
- **RendererCommandExecutor**: routes queued commands to their handlers
- **RendererResourceManager**: device objects of one display
- **ResourceRegistry**: content-addressed, reference-counted client resources
- **AsyncEffectUploader**: background shader compilation
- **SceneResourceActionLog**: consolidated create/update/destroy actions
- **DisplaySetup**: display buffers, their scenes and redraw state
- **FrameTimer**: per-section frame time budgets

The GPU itself is reached through the `GraphicsDevice` and `UploadContext`
traits, implemented by a graphics backend.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod handles;
pub mod frame;
pub mod graphics_device;
pub mod resource;
pub mod scene_resource;
pub mod display;
pub mod scene;
pub mod command;
pub mod renderer;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging facade
    pub use crate::engine::Engine;

    // Frame pipeline entry point
    pub use crate::renderer::FramePipeline;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    pub mod handles {
        pub use crate::handles::*;
    }

    pub mod frame {
        pub use crate::frame::*;
    }

    pub mod device {
        pub use crate::graphics_device::*;
    }

    pub mod resource {
        pub use crate::resource::*;
    }

    pub mod scene_resource {
        pub use crate::scene_resource::*;
    }

    pub mod display {
        pub use crate::display::*;
    }

    pub mod scene {
        pub use crate::scene::*;
    }

    pub mod command {
        pub use crate::command::*;
    }

    pub mod renderer {
        pub use crate::renderer::*;
    }
}

// Re-export math library at crate root
pub use glam;
