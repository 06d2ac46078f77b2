//! Unit tests for scene_resource_action_log.rs

use crate::frame::{FrameTimer, FrameTimerSection};
use crate::graphics_device::{RenderBufferAccess, RenderBufferDesc, RenderBufferFormat};
use crate::handles::{SceneId, SceneResourceHandle};
use crate::scene_resource::*;

const SCENE: SceneId = SceneId(5);

// ============================================================================
// Recording uploader
// ============================================================================

#[derive(Default)]
struct RecordingUploader {
    calls: Vec<String>,
}

impl RecordingUploader {
    fn record(&mut self, what: &str, handle: SceneResourceHandle) {
        self.calls.push(format!("{} {}", what, handle));
    }
}

impl SceneResourceUploader for RecordingUploader {
    fn upload_render_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle, _desc: &RenderBufferDesc) {
        self.record("upload_render_buffer", handle);
    }
    fn unload_render_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle) {
        self.record("unload_render_buffer", handle);
    }
    fn upload_render_target(&mut self, _scene: SceneId, handle: SceneResourceHandle, _buffers: &[SceneResourceHandle]) {
        self.record("upload_render_target", handle);
    }
    fn unload_render_target(&mut self, _scene: SceneId, handle: SceneResourceHandle) {
        self.record("unload_render_target", handle);
    }
    fn upload_data_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle, _buffer: &DataBufferSource) {
        self.record("upload_data_buffer", handle);
    }
    fn update_data_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle, _buffer: &DataBufferSource) {
        self.record("update_data_buffer", handle);
    }
    fn unload_data_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle) {
        self.record("unload_data_buffer", handle);
    }
    fn upload_texture_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle, _texture: &TextureBufferSource) {
        self.record("upload_texture_buffer", handle);
    }
    fn update_texture_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle, _texture: &TextureBufferSource) {
        self.record("update_texture_buffer", handle);
    }
    fn unload_texture_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle) {
        self.record("unload_texture_buffer", handle);
    }
    fn upload_uniform_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle, _buffer: &UniformBufferSource) {
        self.record("upload_uniform_buffer", handle);
    }
    fn update_uniform_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle, _buffer: &UniformBufferSource) {
        self.record("update_uniform_buffer", handle);
    }
    fn unload_uniform_buffer(&mut self, _scene: SceneId, handle: SceneResourceHandle) {
        self.record("unload_uniform_buffer", handle);
    }
    fn upload_vertex_array(&mut self, _scene: SceneId, handle: SceneResourceHandle, _array: &VertexArraySource) {
        self.record("upload_vertex_array", handle);
    }
    fn unload_vertex_array(&mut self, _scene: SceneId, handle: SceneResourceHandle) {
        self.record("unload_vertex_array", handle);
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn data_buffer() -> DataBufferSource {
    DataBufferSource { kind: DataBufferKind::VertexData, capacity: 16, data: vec![0; 16] }
}

fn scene_with_data_buffers(count: u64) -> SceneResourceSnapshot {
    (0..count).fold(SceneResourceSnapshot::new(), |snapshot, i| {
        snapshot.with_data_buffer(SceneResourceHandle(i), data_buffer())
    })
}

fn create_actions(count: u64) -> Vec<SceneResourceAction> {
    (0..count)
        .map(|i| SceneResourceAction::create(SceneResourceKind::DataBuffer, SceneResourceHandle(i)))
        .collect()
}

fn exhausted_timer() -> FrameTimer {
    let mut timer = FrameTimer::new();
    timer.set_section_time_budget(FrameTimerSection::SceneResourcesUpload, 0);
    timer.start_frame();
    timer
}

// ============================================================================
// Tests: replay
// ============================================================================

#[test]
fn test_apply_executes_in_order_and_empties_log() {
    let source = scene_with_data_buffers(2);
    let mut uploader = RecordingUploader::default();
    let mut log = SceneResourceActionLog::new();
    log.consolidate(&[
        SceneResourceAction::create(SceneResourceKind::DataBuffer, SceneResourceHandle(1)),
        SceneResourceAction::update(SceneResourceKind::DataBuffer, SceneResourceHandle(1)),
        SceneResourceAction::destroy(SceneResourceKind::DataBuffer, SceneResourceHandle(0)),
    ]);

    let progress = log.apply(SCENE, &source, &mut uploader, None);

    assert_eq!(progress, ApplyProgress { executed: 3, finished: true });
    assert!(log.is_empty());
    assert_eq!(
        uploader.calls,
        vec!["upload_data_buffer h1", "update_data_buffer h1", "unload_data_buffer h0"]
    );
}

#[test]
fn test_short_lists_ignore_exhausted_budget() {
    let source = scene_with_data_buffers(TIME_CHECK_MIN_ACTION_COUNT as u64);
    let mut uploader = RecordingUploader::default();
    let mut log = SceneResourceActionLog::new();
    log.consolidate(&create_actions(TIME_CHECK_MIN_ACTION_COUNT as u64));

    let progress = log.apply(SCENE, &source, &mut uploader, Some(&exhausted_timer()));

    assert!(progress.finished);
    assert_eq!(uploader.calls.len(), TIME_CHECK_MIN_ACTION_COUNT);
}

#[test]
fn test_long_list_stops_at_check_interval_when_budget_exceeded() {
    let source = scene_with_data_buffers(150);
    let mut uploader = RecordingUploader::default();
    let mut log = SceneResourceActionLog::new();
    log.consolidate(&create_actions(150));

    let progress = log.apply(SCENE, &source, &mut uploader, Some(&exhausted_timer()));

    assert_eq!(progress, ApplyProgress { executed: TIME_CHECK_INTERVAL, finished: false });
    assert_eq!(log.len(), 150 - TIME_CHECK_INTERVAL);
    assert_eq!(log.pending_actions()[0].handle, SceneResourceHandle(TIME_CHECK_INTERVAL as u64));
}

#[test]
fn test_interrupted_then_resumed_replay_matches_single_replay() {
    let source = scene_with_data_buffers(130);

    let mut reference = RecordingUploader::default();
    let mut single = SceneResourceActionLog::new();
    single.consolidate(&create_actions(130));
    single.apply(SCENE, &source, &mut reference, None);

    let mut resumed = RecordingUploader::default();
    let mut log = SceneResourceActionLog::new();
    log.consolidate(&create_actions(130));
    let first = log.apply(SCENE, &source, &mut resumed, Some(&exhausted_timer()));
    let second = log.apply(SCENE, &source, &mut resumed, None);

    assert!(!first.finished);
    assert!(second.finished);
    assert_eq!(first.executed + second.executed, 130);
    assert_eq!(resumed.calls, reference.calls);
}

#[test]
fn test_budget_with_time_left_finishes_long_list() {
    let source = scene_with_data_buffers(120);
    let mut uploader = RecordingUploader::default();
    let mut log = SceneResourceActionLog::new();
    log.consolidate(&create_actions(120));
    let timer = FrameTimer::new();

    let progress = log.apply(SCENE, &source, &mut uploader, Some(&timer));

    assert_eq!(progress, ApplyProgress { executed: 120, finished: true });
}

#[test]
fn test_new_actions_consolidate_against_unexecuted_remainder() {
    let source = scene_with_data_buffers(150);
    let mut uploader = RecordingUploader::default();
    let mut log = SceneResourceActionLog::new();
    log.consolidate(&create_actions(150));
    log.apply(SCENE, &source, &mut uploader, Some(&exhausted_timer()));

    // h5 was created already, h140 was not
    log.consolidate(&[
        SceneResourceAction::destroy(SceneResourceKind::DataBuffer, SceneResourceHandle(5)),
        SceneResourceAction::destroy(SceneResourceKind::DataBuffer, SceneResourceHandle(140)),
    ]);

    let pending = log.pending_actions();
    assert_eq!(pending.len(), 150 - TIME_CHECK_INTERVAL);
    assert_eq!(
        pending.last(),
        Some(&SceneResourceAction::destroy(SceneResourceKind::DataBuffer, SceneResourceHandle(5)))
    );
    assert!(!pending.iter().any(|a| a.handle == SceneResourceHandle(140)));
}

#[test]
fn test_missing_object_is_skipped() {
    let source = SceneResourceSnapshot::new();
    let mut uploader = RecordingUploader::default();
    let mut log = SceneResourceActionLog::new();
    log.consolidate(&create_actions(1));

    let progress = log.apply(SCENE, &source, &mut uploader, None);

    assert!(progress.finished);
    assert!(uploader.calls.is_empty());
    assert!(log.is_empty());
}

#[test]
fn test_update_of_render_target_is_ignored() {
    let source = SceneResourceSnapshot::new();
    let mut uploader = RecordingUploader::default();

    execute_scene_resource_action(
        SCENE,
        &SceneResourceAction::update(SceneResourceKind::RenderTarget, SceneResourceHandle(1)),
        &source,
        &mut uploader,
    );

    assert!(uploader.calls.is_empty());
}

// ============================================================================
// Tests: collection on map
// ============================================================================

#[test]
fn test_collect_orders_by_kind_and_adds_content_updates() {
    let color = RenderBufferDesc {
        width: 4,
        height: 4,
        format: RenderBufferFormat::Rgba8,
        access: RenderBufferAccess::ReadWrite,
        samples: 0,
    };
    let source = SceneResourceSnapshot::new()
        .with_vertex_array(
            SceneResourceHandle(9),
            VertexArraySource { effect: Default::default(), vertex_buffers: Vec::new(), index_buffer: None },
        )
        .with_uniform_buffer(SceneResourceHandle(8), UniformBufferSource { size: 4, data: vec![0; 4] })
        .with_data_buffer(SceneResourceHandle(3), data_buffer())
        .with_render_target(SceneResourceHandle(2), vec![SceneResourceHandle(1)])
        .with_render_buffer(SceneResourceHandle(1), color);

    let actions = collect_scene_resource_actions(&source);

    assert_eq!(
        actions,
        vec![
            SceneResourceAction::create(SceneResourceKind::RenderBuffer, SceneResourceHandle(1)),
            SceneResourceAction::create(SceneResourceKind::RenderTarget, SceneResourceHandle(2)),
            SceneResourceAction::create(SceneResourceKind::DataBuffer, SceneResourceHandle(3)),
            SceneResourceAction::update(SceneResourceKind::DataBuffer, SceneResourceHandle(3)),
            SceneResourceAction::create(SceneResourceKind::UniformBuffer, SceneResourceHandle(8)),
            SceneResourceAction::update(SceneResourceKind::UniformBuffer, SceneResourceHandle(8)),
            SceneResourceAction::create(SceneResourceKind::VertexArray, SceneResourceHandle(9)),
        ]
    );
}
