/// Pending scene resource actions of one scene and their bounded replay.
///
/// Replay walks the pending list in order. Checking the clock has a cost,
/// so the `SceneResourcesUpload` budget is only sampled for long lists
/// (more than `TIME_CHECK_MIN_ACTION_COUNT` actions) and then only after
/// every `TIME_CHECK_INTERVAL` executed actions. When the budget trips,
/// replay stops between two actions; the executed prefix is dropped and the
/// rest stays pending, in order, for the next frame.

use crate::frame::{FrameTimer, FrameTimerSection};
use crate::handles::SceneId;
use crate::{engine_debug, engine_error, engine_warn};
use super::scene_resource_action::{
    consolidate_scene_resource_actions, SceneResourceAction, SceneResourceKind, SceneResourceOperation,
};
use super::scene_resource_source::SceneResourceSource;
use super::scene_resource_uploader::SceneResourceUploader;

/// Lists this long or shorter are replayed without looking at the clock
pub const TIME_CHECK_MIN_ACTION_COUNT: usize = 100;
/// Executed actions between two budget checks
pub const TIME_CHECK_INTERVAL: usize = 20;

const SOURCE: &str = "galaxy3d::SceneResourceActionLog";

/// How far a replay got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyProgress {
    pub executed: usize,
    pub finished: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SceneResourceActionLog {
    pending: Vec<SceneResourceAction>,
}

impl SceneResourceActionLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of new actions into the pending list
    pub fn consolidate(&mut self, new_actions: &[SceneResourceAction]) {
        consolidate_scene_resource_actions(new_actions, &mut self.pending);
    }

    /// Actions not replayed yet, in order
    pub fn pending_actions(&self) -> &[SceneResourceAction] {
        &self.pending
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending actions
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Drop every pending action
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Replay pending actions; `timer` of `None` means unbounded
    pub fn apply(
        &mut self,
        scene: SceneId,
        source: &dyn SceneResourceSource,
        uploader: &mut dyn SceneResourceUploader,
        timer: Option<&FrameTimer>,
    ) -> ApplyProgress {
        let progress = apply_scene_resource_actions(scene, &self.pending, source, uploader, timer);
        self.pending.drain(..progress.executed);
        if !progress.finished {
            engine_debug!(
                SOURCE,
                "{}: resource actions interrupted after {}, {} remaining",
                scene,
                progress.executed,
                self.pending.len()
            );
        }
        progress
    }
}

/// Execute `actions` in order until done or the budget trips
pub fn apply_scene_resource_actions(
    scene: SceneId,
    actions: &[SceneResourceAction],
    source: &dyn SceneResourceSource,
    uploader: &mut dyn SceneResourceUploader,
    timer: Option<&FrameTimer>,
) -> ApplyProgress {
    let budget_timer = timer.filter(|_| actions.len() > TIME_CHECK_MIN_ACTION_COUNT);

    for (index, action) in actions.iter().enumerate() {
        execute_scene_resource_action(scene, action, source, uploader);

        let executed = index + 1;
        if let Some(timer) = budget_timer {
            if executed % TIME_CHECK_INTERVAL == 0
                && executed < actions.len()
                && timer.is_time_budget_exceeded_for_section(FrameTimerSection::SceneResourcesUpload)
            {
                return ApplyProgress { executed, finished: false };
            }
        }
    }
    ApplyProgress { executed: actions.len(), finished: true }
}

/// Execute a single action against the uploader
pub fn execute_scene_resource_action(
    scene: SceneId,
    action: &SceneResourceAction,
    source: &dyn SceneResourceSource,
    uploader: &mut dyn SceneResourceUploader,
) {
    use SceneResourceKind as Kind;
    use SceneResourceOperation as Op;

    let handle = action.handle;
    let missing = || engine_error!(SOURCE, "{}: {:?} {} is unknown to the scene", scene, action.kind, handle);

    match (action.kind, action.operation) {
        (Kind::RenderBuffer, Op::Create) => match source.render_buffer(handle) {
            Some(desc) => uploader.upload_render_buffer(scene, handle, desc),
            None => missing(),
        },
        (Kind::RenderBuffer, Op::Destroy) => uploader.unload_render_buffer(scene, handle),

        (Kind::RenderTarget, Op::Create) => match source.render_target_buffers(handle) {
            Some(buffers) => uploader.upload_render_target(scene, handle, buffers),
            None => missing(),
        },
        (Kind::RenderTarget, Op::Destroy) => uploader.unload_render_target(scene, handle),

        (Kind::DataBuffer, Op::Create) => match source.data_buffer(handle) {
            Some(buffer) => uploader.upload_data_buffer(scene, handle, buffer),
            None => missing(),
        },
        (Kind::DataBuffer, Op::Update) => match source.data_buffer(handle) {
            Some(buffer) => uploader.update_data_buffer(scene, handle, buffer),
            None => missing(),
        },
        (Kind::DataBuffer, Op::Destroy) => uploader.unload_data_buffer(scene, handle),

        (Kind::TextureBuffer, Op::Create) => match source.texture_buffer(handle) {
            Some(texture) => uploader.upload_texture_buffer(scene, handle, texture),
            None => missing(),
        },
        (Kind::TextureBuffer, Op::Update) => match source.texture_buffer(handle) {
            Some(texture) => uploader.update_texture_buffer(scene, handle, texture),
            None => missing(),
        },
        (Kind::TextureBuffer, Op::Destroy) => uploader.unload_texture_buffer(scene, handle),

        (Kind::UniformBuffer, Op::Create) => match source.uniform_buffer(handle) {
            Some(buffer) => uploader.upload_uniform_buffer(scene, handle, buffer),
            None => missing(),
        },
        (Kind::UniformBuffer, Op::Update) => match source.uniform_buffer(handle) {
            Some(buffer) => uploader.update_uniform_buffer(scene, handle, buffer),
            None => missing(),
        },
        (Kind::UniformBuffer, Op::Destroy) => uploader.unload_uniform_buffer(scene, handle),

        (Kind::VertexArray, Op::Create) => match source.vertex_array(handle) {
            Some(array) => uploader.upload_vertex_array(scene, handle, array),
            None => missing(),
        },
        (Kind::VertexArray, Op::Destroy) => uploader.unload_vertex_array(scene, handle),

        (Kind::RenderBuffer | Kind::RenderTarget | Kind::VertexArray, Op::Update) => {
            engine_warn!(SOURCE, "{}: {:?} {} cannot be updated", scene, action.kind, handle);
        }
    }
}

/// Actions creating every scene resource object of a freshly mapped scene
///
/// Order: render buffers, render targets, data buffers, texture buffers,
/// uniform buffers, vertex arrays. Buffers with content also get an update.
pub fn collect_scene_resource_actions(source: &dyn SceneResourceSource) -> Vec<SceneResourceAction> {
    let mut actions = Vec::new();
    for kind in [
        SceneResourceKind::RenderBuffer,
        SceneResourceKind::RenderTarget,
        SceneResourceKind::DataBuffer,
        SceneResourceKind::TextureBuffer,
        SceneResourceKind::UniformBuffer,
        SceneResourceKind::VertexArray,
    ] {
        let with_content = matches!(
            kind,
            SceneResourceKind::DataBuffer | SceneResourceKind::TextureBuffer | SceneResourceKind::UniformBuffer
        );
        for handle in source.scene_resource_handles(kind) {
            actions.push(SceneResourceAction::create(kind, handle));
            if with_content {
                actions.push(SceneResourceAction::update(kind, handle));
            }
        }
    }
    actions
}

#[cfg(test)]
#[path = "scene_resource_action_log_tests.rs"]
mod tests;
