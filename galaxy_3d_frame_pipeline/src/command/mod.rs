//! Command module
//!
//! Commands queued by clients, the events answering them, and the executor
//! dispatching one to the other.

pub mod renderer_command;
pub mod renderer_event;
pub mod command_executor;

pub use renderer_command::*;
pub use renderer_event::*;
pub use command_executor::RendererCommandExecutor;
