//! Integration tests for the frame pipeline
//!
//! These tests drive `FramePipeline` through its command queue only, the way
//! a client would, against a recording graphics device.
//! No GPU required.
//!
//! Run with: cargo test --test pipeline_integration_tests


use galaxy_3d_frame_pipeline::galaxy3d::command::{RendererCommand, RendererEvent};
use galaxy_3d_frame_pipeline::galaxy3d::device::{TextureFormat, TextureInfo};
use galaxy_3d_frame_pipeline::galaxy3d::display::{DisplayBufferId, DisplayConfig};
use galaxy_3d_frame_pipeline::galaxy3d::frame::FrameTimerSection;
use galaxy_3d_frame_pipeline::galaxy3d::handles::{DisplayHandle, OffscreenBufferHandle, SceneId, SceneResourceHandle};
use galaxy_3d_frame_pipeline::galaxy3d::resource::{EffectResource, OffscreenBufferDesc, ResourceData};
use galaxy_3d_frame_pipeline::galaxy3d::scene::{SceneState, SceneUpdate};
use galaxy_3d_frame_pipeline::galaxy3d::scene_resource::{
    SceneResourceSnapshot, UniformBufferSource, VertexArraySource,
};
use galaxy_3d_frame_pipeline::galaxy3d::FramePipeline;
use std::thread;
use std::time::{Duration, Instant};
use test_device_utils::{create_test_pipeline, device, run_command};

const DISPLAY: DisplayHandle = DisplayHandle(1);

// ============================================================================
// HELPERS
// ============================================================================

fn config(async_effect_upload: bool) -> DisplayConfig {
    DisplayConfig { width: 320, height: 240, async_effect_upload, ..Default::default() }
}

fn create_display(pipeline: &mut FramePipeline, async_effect_upload: bool) {
    let events = run_command(
        pipeline,
        RendererCommand::CreateDisplay { display: DISPLAY, config: config(async_effect_upload), binary_shader_cache: None },
    );
    assert_eq!(events, vec![RendererEvent::DisplayCreated { display: DISPLAY }]);
}

fn shared_effect() -> ResourceData {
    ResourceData::effect(EffectResource::new("textured", "void main() {}", "void main() {}"))
}

fn shared_texture() -> ResourceData {
    ResourceData::texture(TextureInfo::texture_2d(TextureFormat::Rgba8, 2, 2), vec![vec![255; 16]])
}

fn textured_quad() -> SceneResourceSnapshot {
    let effect = shared_effect();
    SceneResourceSnapshot::new()
        .with_resource(effect.hash())
        .with_resource(shared_texture().hash())
        .with_uniform_buffer(SceneResourceHandle(1), UniformBufferSource { size: 16, data: vec![0; 16] })
        .with_vertex_array(
            SceneResourceHandle(2),
            VertexArraySource { effect: effect.hash(), vertex_buffers: Vec::new(), index_buffer: None },
        )
}

/// Publish a scene with its resource payloads; mapping happens separately
fn publish_scene(pipeline: &mut FramePipeline, scene: SceneId) {
    pipeline.enqueue_command(RendererCommand::ReceiveScene { scene, source: Box::new(textured_quad()) });
    let update = SceneUpdate { resources: vec![shared_effect(), shared_texture()], ..Default::default() };
    pipeline.enqueue_command(RendererCommand::UpdateScene { scene, update });
    pipeline.update();
    assert_eq!(pipeline.take_events(), vec![RendererEvent::SceneReceived { scene }]);
}

/// Run frames until `event` shows up or five seconds pass
fn update_until(pipeline: &mut FramePipeline, event: RendererEvent) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        pipeline.update();
        if pipeline.take_events().contains(&event) {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

// ============================================================================
// INTEGRATION TESTS
// ============================================================================

#[test]
fn test_integration_shared_resource_uploaded_and_unloaded_once() {
    let (devices, mut pipeline) = create_test_pipeline();
    create_display(&mut pipeline, false);
    let (first, second) = (SceneId(1), SceneId(2));
    publish_scene(&mut pipeline, first);
    publish_scene(&mut pipeline, second);

    pipeline.enqueue_command(RendererCommand::MapScene { scene: first, display: DISPLAY });
    pipeline.enqueue_command(RendererCommand::MapScene { scene: second, display: DISPLAY });
    pipeline.update();
    let events = pipeline.take_events();
    assert!(events.contains(&RendererEvent::SceneMapped { scene: first, display: DISPLAY }));
    assert!(events.contains(&RendererEvent::SceneMapped { scene: second, display: DISPLAY }));

    let device = device(&devices, 0);
    {
        let device = device.lock().unwrap();
        assert_eq!(device.count_calls("allocate_texture"), 1);
        assert_eq!(device.count_calls("register_shader(textured)"), 1);
        assert_eq!(device.count_calls("allocate_uniform_buffer"), 2);
        assert_eq!(device.count_calls("allocate_vertex_array"), 2);
    }

    run_command(&mut pipeline, RendererCommand::UnmapScene { scene: first });
    assert_eq!(device.lock().unwrap().count_calls("delete_texture"), 0);

    run_command(&mut pipeline, RendererCommand::UnmapScene { scene: second });
    {
        let device = device.lock().unwrap();
        assert_eq!(device.count_calls("delete_texture"), 1);
        assert_eq!(device.count_calls("delete_shader"), 1);
        assert_eq!(device.live_object_count(), 0);
    }

    let events = run_command(&mut pipeline, RendererCommand::DestroyDisplay { display: DISPLAY });
    assert_eq!(events, vec![RendererEvent::DisplayDestroyed { display: DISPLAY }]);
}

#[test]
fn test_integration_async_effect_upload_maps_scene() {
    let (devices, mut pipeline) = create_test_pipeline();
    create_display(&mut pipeline, true);
    let scene = SceneId(7);
    publish_scene(&mut pipeline, scene);

    pipeline.enqueue_command(RendererCommand::MapScene { scene, display: DISPLAY });
    assert!(update_until(&mut pipeline, RendererEvent::SceneMapped { scene, display: DISPLAY }));
    assert_eq!(pipeline.scene_state(scene), Some(SceneState::Mapped));

    let stats = *pipeline.display(DISPLAY).unwrap().resources().statistics();
    assert_eq!(stats.effects_compiled_async, 1);
    assert_eq!(device(&devices, 0).lock().unwrap().count_calls("register_shader(textured)"), 1);
}

#[test]
fn test_integration_set_frame_timer_limits() {
    let (_devices, mut pipeline) = create_test_pipeline();

    run_command(
        &mut pipeline,
        RendererCommand::SetFrameTimerLimits {
            scene_resources_upload: 4,
            resources_upload: 1,
            scene_actions_apply: 2,
            offscreen_buffer_render: 3,
        },
    );

    let timer = pipeline.frame_timer();
    assert_eq!(timer.section_time_budget(FrameTimerSection::SceneResourcesUpload), Duration::from_micros(4));
    assert_eq!(timer.section_time_budget(FrameTimerSection::ResourcesUpload), Duration::from_micros(1));
    assert_eq!(timer.section_time_budget(FrameTimerSection::SceneActionsApply), Duration::from_micros(2));
    assert_eq!(timer.section_time_budget(FrameTimerSection::OffscreenBufferRender), Duration::from_micros(3));
}

#[test]
fn test_integration_tight_budget_still_makes_progress() {
    let (_devices, mut pipeline) = create_test_pipeline();
    create_display(&mut pipeline, false);
    run_command(
        &mut pipeline,
        RendererCommand::SetFrameTimerLimits {
            scene_resources_upload: 0,
            resources_upload: 0,
            scene_actions_apply: 0,
            offscreen_buffer_render: 0,
        },
    );
    let scene = SceneId(3);
    publish_scene(&mut pipeline, scene);

    pipeline.enqueue_command(RendererCommand::MapScene { scene, display: DISPLAY });
    assert!(update_until(&mut pipeline, RendererEvent::SceneMapped { scene, display: DISPLAY }));
}

#[test]
fn test_integration_offscreen_buffer_render_flow() {
    let (devices, mut pipeline) = create_test_pipeline();
    create_display(&mut pipeline, false);
    let buffer = OffscreenBufferHandle(4);
    let id = DisplayBufferId::Offscreen(buffer);
    let desc = OffscreenBufferDesc { interruptible: true, ..OffscreenBufferDesc::new(64, 64) };
    let events = run_command(&mut pipeline, RendererCommand::CreateOffscreenBuffer { display: DISPLAY, buffer, desc });
    assert_eq!(events, vec![RendererEvent::OffscreenBufferCreated { display: DISPLAY, buffer }]);

    let scene = SceneId(5);
    publish_scene(&mut pipeline, scene);
    pipeline.enqueue_command(RendererCommand::MapScene { scene, display: DISPLAY });
    pipeline.enqueue_command(RendererCommand::AssignSceneToDisplayBuffer { scene, buffer: id, render_order: 1 });
    pipeline.enqueue_command(RendererCommand::ShowScene { scene });
    pipeline.update();
    let events = pipeline.take_events();
    assert!(events.contains(&RendererEvent::SceneAssignedToDisplayBuffer { scene, buffer: id }));
    // Shown only once mapping completed, so the first attempt in this frame fails
    assert!(events.contains(&RendererEvent::SceneShowFailed { scene }));
    let events = run_command(&mut pipeline, RendererCommand::ShowScene { scene });
    assert_eq!(events, vec![RendererEvent::SceneShown { scene }]);

    // Draw loop: interrupted once, resumed next frame, then clean
    assert_eq!(pipeline.interruptible_offscreen_buffers_to_render(DISPLAY), vec![id]);
    pipeline.begin_display_buffer_render(DISPLAY, id).unwrap();
    pipeline.mark_offscreen_buffer_interrupted(DISPLAY, id).unwrap();
    pipeline.update();
    assert_eq!(pipeline.interruptible_offscreen_buffers_to_render(DISPLAY), vec![id]);
    pipeline.begin_display_buffer_render(DISPLAY, id).unwrap();
    pipeline.finish_display_buffer_render(DISPLAY, id).unwrap();
    assert!(pipeline.interruptible_offscreen_buffers_to_render(DISPLAY).is_empty());
    assert!(pipeline.is_display_buffer_dirty(DISPLAY, DisplayBufferId::Framebuffer));

    // Destroying needs the scene moved away first
    let events = run_command(&mut pipeline, RendererCommand::DestroyOffscreenBuffer { display: DISPLAY, buffer });
    assert_eq!(events, vec![RendererEvent::OffscreenBufferDestroyFailed { display: DISPLAY, buffer }]);
    pipeline.enqueue_command(RendererCommand::AssignSceneToDisplayBuffer {
        scene,
        buffer: DisplayBufferId::Framebuffer,
        render_order: 0,
    });
    pipeline.enqueue_command(RendererCommand::DestroyOffscreenBuffer { display: DISPLAY, buffer });
    pipeline.update();
    assert!(pipeline
        .take_events()
        .contains(&RendererEvent::OffscreenBufferDestroyed { display: DISPLAY, buffer }));

    let device = device(&devices, 0);
    assert_eq!(device.lock().unwrap().count_calls("unpair_render_targets"), 1);
}

#[test]
fn test_integration_commands_enqueued_from_other_thread() {
    let (_devices, mut pipeline) = create_test_pipeline();
    let queue = pipeline.command_buffer();

    let producer = thread::spawn(move || {
        for id in 0..4 {
            queue.enqueue_command(RendererCommand::ReceiveScene {
                scene: SceneId(100 + id),
                source: Box::new(SceneResourceSnapshot::new()),
            });
        }
    });
    producer.join().unwrap();

    assert_eq!(pipeline.command_buffer().len(), 4);
    pipeline.update();
    assert_eq!(pipeline.take_events().len(), 4);
    assert_eq!(pipeline.scenes().len(), 4);
    assert!(pipeline.command_buffer().is_empty());
}
