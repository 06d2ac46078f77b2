/// Dispatch of queued renderer commands.
///
/// One batch is swapped out of the command buffer per frame and every
/// command is routed, through a single exhaustive match, to the handler of
/// the `FramePipeline` owning the affected state. Handlers never fail
/// upwards; they answer with events.

use std::mem;
use crate::renderer::FramePipeline;
use crate::{engine_debug, engine_info};
use super::renderer_command::{RendererCommand, RendererCommandBuffer};

const SOURCE: &str = "galaxy3d::RendererCommandExecutor";

#[derive(Default)]
pub struct RendererCommandExecutor {
    /// Reused between frames to keep its capacity
    commands: Vec<RendererCommand>,
}

impl RendererCommandExecutor {
    /// Executor with no command in flight
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute every command queued in `buffer`; returns how many ran
    pub fn execute_pending_commands(&mut self, buffer: &RendererCommandBuffer, pipeline: &mut FramePipeline) -> usize {
        buffer.swap_commands(&mut self.commands);
        let count = self.commands.len();
        log_command_summary(&self.commands);
        let mut commands = mem::take(&mut self.commands);
        for command in commands.drain(..) {
            execute_command(pipeline, command);
        }
        self.commands = commands;
        count
    }
}

fn log_command_summary(commands: &[RendererCommand]) {
    let scene_updates = commands.iter().filter(|c| c.is_scene_update()).count();
    let loggable = commands.len() - scene_updates;
    if loggable > 0 {
        engine_info!(SOURCE, "executing {} commands ({} scene updates)", loggable, scene_updates);
    }
}

/// Route one command to its handler
pub fn execute_command(pipeline: &mut FramePipeline, command: RendererCommand) {
    if command.is_scene_update() {
        engine_debug!(SOURCE, " - executing {}", command.name());
    } else {
        engine_info!(SOURCE, " - executing {}", command.name());
    }

    match command {
        RendererCommand::CreateDisplay { display, config, binary_shader_cache } => {
            pipeline.handle_create_display(display, config, binary_shader_cache)
        }
        RendererCommand::DestroyDisplay { display } => pipeline.handle_destroy_display(display),

        RendererCommand::ReceiveScene { scene, source } => pipeline.handle_receive_scene(scene, source),
        RendererCommand::UpdateScene { scene, update } => pipeline.handle_update_scene(scene, update),
        RendererCommand::UnpublishScene { scene } => pipeline.handle_unpublish_scene(scene),
        RendererCommand::MapScene { scene, display } => pipeline.handle_map_scene(scene, display),
        RendererCommand::UnmapScene { scene } => pipeline.handle_unmap_scene(scene),
        RendererCommand::ShowScene { scene } => pipeline.handle_show_scene(scene),
        RendererCommand::HideScene { scene } => pipeline.handle_hide_scene(scene),
        RendererCommand::AssignSceneToDisplayBuffer { scene, buffer, render_order } => {
            pipeline.handle_assign_scene_to_display_buffer(scene, buffer, render_order)
        }

        RendererCommand::CreateOffscreenBuffer { display, buffer, desc } => {
            pipeline.handle_create_offscreen_buffer(display, buffer, desc)
        }
        RendererCommand::DestroyOffscreenBuffer { display, buffer } => {
            pipeline.handle_destroy_offscreen_buffer(display, buffer)
        }

        RendererCommand::LinkData { provider_scene, provider_slot, consumer_scene, consumer_slot } => {
            pipeline.handle_link_data(provider_scene, provider_slot, consumer_scene, consumer_slot)
        }
        RendererCommand::LinkOffscreenBuffer { buffer, consumer_scene, consumer_slot } => {
            pipeline.handle_link_offscreen_buffer(buffer, consumer_scene, consumer_slot)
        }
        RendererCommand::UnlinkData { consumer_scene, consumer_slot } => {
            pipeline.handle_unlink_data(consumer_scene, consumer_slot)
        }

        RendererCommand::SetClearColor { display, buffer, color } => {
            pipeline.handle_set_clear_color(display, buffer, color)
        }
        RendererCommand::SetClearFlags { display, buffer, flags } => {
            pipeline.handle_set_clear_flags(display, buffer, flags)
        }
        RendererCommand::SetFrameTimerLimits {
            scene_resources_upload,
            resources_upload,
            scene_actions_apply,
            offscreen_buffer_render,
        } => pipeline.handle_set_frame_timer_limits(
            scene_resources_upload,
            resources_upload,
            scene_actions_apply,
            offscreen_buffer_render,
        ),
        RendererCommand::SetSkippingOfUnmodifiedBuffers { enabled } => {
            pipeline.handle_set_skipping_of_unmodified_buffers(enabled)
        }
        RendererCommand::SetForceApplyPendingUpdatesLimit { limit } => {
            pipeline.handle_set_force_apply_pending_updates_limit(limit)
        }
        RendererCommand::SetForceUnsubscribePendingUpdatesLimit { limit } => {
            pipeline.handle_set_force_unsubscribe_pending_updates_limit(limit)
        }
        RendererCommand::UpdateWarpingData { display, data } => pipeline.handle_update_warping_data(display, data),
        RendererCommand::ReadPixels { display, buffer, params } => pipeline.handle_read_pixels(display, buffer, params),

        RendererCommand::SystemCompositor(command) => pipeline.handle_system_compositor_command(command),

        RendererCommand::LogStatistics => pipeline.handle_log_statistics(),
        RendererCommand::LogInfo { verbose } => pipeline.handle_log_info(verbose),
        RendererCommand::ConfirmationEcho { text } => pipeline.handle_confirmation_echo(&text),
    }
}
