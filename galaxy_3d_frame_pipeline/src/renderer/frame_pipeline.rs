/// Frame pipeline - owns every display and scene and runs the per-frame tick.
///
/// One call to [`FramePipeline::update`] does, in order:
///
/// 1. execute the commands queued since the last frame
/// 2. apply queued scene updates (`SceneActionsApply` budget, at least one),
///    then drop mapped scenes over the force unsubscribe limit
/// 3. upload and unload client resources of every display (`ResourcesUpload`)
/// 4. replay the action logs of mapped scenes whose resources are settled, or
///    whose blocked updates exceed the force apply limit (`SceneResourcesUpload`)
/// 5. mark every display buffer dirty when skipping of unmodified buffers is off
///
/// Drawing is left to the caller, which asks which display buffers need
/// rendering and reports back through the draw-loop hooks.

use std::mem;
use std::sync::Arc;
use glam::Vec4;
use rustc_hash::FxHashMap;
use crate::command::{
    ReadPixelsParams, RendererCommand, RendererCommandBuffer, RendererCommandExecutor, RendererEvent,
    RendererEventCollector, SystemCompositorCommand, WarpingData,
};
use crate::display::{ClearFlags, DisplayBufferId, DisplayConfig, DisplaySetup, Viewport};
use crate::error::Result;
use crate::frame::{FrameTimer, FrameTimerSection};
use crate::handles::{DataSlotId, DisplayHandle, OffscreenBufferHandle, SceneId};
use crate::resource::{
    BinaryShaderCache, OffscreenBufferDesc, RendererResourceManager, ResourceRegistry, ResourceStatus,
};
use crate::scene::{LinkProvider, RendererScene, RendererScenes, SceneLinks, SceneState, SceneUpdate};
use crate::scene_resource::{collect_scene_resource_actions, DataSlotKind, SceneResourceSource};
use crate::{engine_bail, engine_debug, engine_error, engine_info, engine_warn};
use super::display_device_factory::DisplayDeviceFactory;
use super::system_compositor::SystemCompositorController;

const SOURCE: &str = "galaxy3d::FramePipeline";

/// Blocked updates a mapped scene may collect before they are applied with missing resources
pub const DEFAULT_FORCE_APPLY_PENDING_UPDATES_LIMIT: usize = 60;
/// Blocked and queued updates a mapped scene may collect before it is dropped
pub const DEFAULT_FORCE_UNSUBSCRIBE_PENDING_UPDATES_LIMIT: usize = 120;

/// Everything the pipeline keeps per display
pub struct DisplayBundle {
    config: DisplayConfig,
    resources: RendererResourceManager,
    setup: DisplaySetup,
    /// Interruptible buffer whose rendering was cut short last frame
    interrupted_buffer: Option<DisplayBufferId>,
    warping_data: Option<WarpingData>,
}

impl DisplayBundle {
    /// Configuration the display was created with
    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Device objects and resource registry of the display
    pub fn resources(&self) -> &RendererResourceManager {
        &self.resources
    }

    /// Display buffers and scene assignments
    pub fn setup(&self) -> &DisplaySetup {
        &self.setup
    }

    /// Offscreen buffer whose render was interrupted last
    pub fn interrupted_buffer(&self) -> Option<DisplayBufferId> {
        self.interrupted_buffer
    }

    /// Last accepted warping data
    pub fn warping_data(&self) -> Option<&WarpingData> {
        self.warping_data.as_ref()
    }
}

/// Accepted `ReadPixels` command, waiting for the draw loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPixelsRequest {
    pub display: DisplayHandle,
    pub buffer: DisplayBufferId,
    pub params: ReadPixelsParams,
}

pub struct FramePipeline {
    command_buffer: Arc<RendererCommandBuffer>,
    executor: RendererCommandExecutor,
    device_factory: Box<dyn DisplayDeviceFactory>,
    compositor: Option<Box<dyn SystemCompositorController>>,
    displays: FxHashMap<DisplayHandle, DisplayBundle>,
    /// Display each offscreen buffer was created on
    offscreen_buffer_displays: FxHashMap<OffscreenBufferHandle, DisplayHandle>,
    scenes: RendererScenes,
    links: SceneLinks,
    timer: FrameTimer,
    events: RendererEventCollector,
    read_pixels_requests: Vec<ReadPixelsRequest>,
    frame_count: u64,
    /// When false every display buffer is rerendered each frame
    skip_unmodified_buffers: bool,
    force_apply_pending_updates_limit: usize,
    force_unsubscribe_pending_updates_limit: usize,
}

impl FramePipeline {
    /// Pipeline with no display, creating devices through `device_factory`
    pub fn new(device_factory: Box<dyn DisplayDeviceFactory>) -> Self {
        Self {
            command_buffer: Arc::new(RendererCommandBuffer::new()),
            executor: RendererCommandExecutor::new(),
            device_factory,
            compositor: None,
            displays: FxHashMap::default(),
            offscreen_buffer_displays: FxHashMap::default(),
            scenes: RendererScenes::new(),
            links: SceneLinks::new(),
            timer: FrameTimer::new(),
            events: RendererEventCollector::new(),
            read_pixels_requests: Vec::new(),
            frame_count: 0,
            skip_unmodified_buffers: true,
            force_apply_pending_updates_limit: DEFAULT_FORCE_APPLY_PENDING_UPDATES_LIMIT,
            force_unsubscribe_pending_updates_limit: DEFAULT_FORCE_UNSUBSCRIBE_PENDING_UPDATES_LIMIT,
        }
    }

    /// Route system compositor commands to `compositor`
    pub fn with_system_compositor(mut self, compositor: Box<dyn SystemCompositorController>) -> Self {
        self.compositor = Some(compositor);
        self
    }

    // ===== TICK =====

    /// Run one frame's worth of non-drawing work
    pub fn update(&mut self) {
        self.timer.start_frame();
        self.frame_count += 1;

        let buffer = Arc::clone(&self.command_buffer);
        let mut executor = mem::take(&mut self.executor);
        executor.execute_pending_commands(&buffer, self);
        self.executor = executor;

        self.apply_pending_scene_updates();
        self.force_unsubscribe_overloaded_scenes();

        for bundle in self.displays.values_mut() {
            bundle.resources.upload_and_unload_pending_resources(&self.timer);
        }

        self.update_scene_resources();

        if !self.skip_unmodified_buffers {
            for bundle in self.displays.values_mut() {
                bundle.setup.set_all_display_buffers_to_be_rerendered();
            }
        }
    }

    fn apply_pending_scene_updates(&mut self) {
        let mut applied = 0usize;
        for id in self.scenes.scene_ids() {
            loop {
                if applied > 0 && self.timer.is_time_budget_exceeded_for_section(FrameTimerSection::SceneActionsApply) {
                    engine_debug!(SOURCE, "scene update budget exceeded after {} updates", applied);
                    return;
                }
                let Some(update) = self.scenes.scene_mut(id).and_then(|s| s.pending_updates.pop_front()) else {
                    break;
                };
                self.apply_scene_update(id, update);
                applied += 1;
            }
        }
    }

    fn apply_scene_update(&mut self, id: SceneId, update: SceneUpdate) {
        let Some(scene) = self.scenes.scene_mut(id) else {
            return;
        };
        let SceneUpdate { actions, source, resources } = update;

        if let Some(source) = source {
            scene.source = source;
            let current = scene.resource_hashes();
            scene.resource_data.retain(|hash, _| current.binary_search(hash).is_ok());
        }
        for data in resources {
            scene.resource_data.insert(data.hash(), data);
        }

        let Some(bundle) = scene.display.and_then(|display| self.displays.get_mut(&display)) else {
            return;
        };
        scene.action_log.consolidate(&actions);
        sync_resource_references(scene, bundle.resources.registry_mut());
        provide_resource_data(scene, bundle.resources.registry_mut());
        if !bundle.resources.registry().are_resources_settled(&scene.referenced_resources) {
            scene.blocked_updates += 1;
        }

        if scene.state == SceneState::Rendered {
            bundle.setup.set_display_buffer_of_scene_to_be_rerendered(id);
        }
    }

    /// Drop mapped scenes whose updates pile up behind resources that never arrive
    fn force_unsubscribe_overloaded_scenes(&mut self) {
        let limit = self.force_unsubscribe_pending_updates_limit;
        let overloaded: Vec<SceneId> = self
            .scenes
            .scene_ids()
            .into_iter()
            .filter(|id| {
                self.scenes.scene(*id).is_some_and(|scene| {
                    scene.state.is_mapped() && scene.blocked_updates + scene.pending_updates.len() > limit
                })
            })
            .collect();

        for scene in overloaded {
            engine_error!(SOURCE, "{} exceeded {} pending updates, force unsubscribing", scene, limit);
            self.unmap_scene(scene);
            self.events.add_event(RendererEvent::SceneUnmapped { scene });
            self.remove_scene_links(scene);
            self.scenes.destroy_scene(scene);
            self.events.add_event(RendererEvent::SceneForceUnsubscribed { scene });
        }
    }

    fn update_scene_resources(&mut self) {
        let force_apply_limit = self.force_apply_pending_updates_limit;
        for id in self.scenes.scene_ids() {
            let Some(scene) = self.scenes.scene_mut(id) else {
                continue;
            };
            let Some(display) = scene.display else {
                continue;
            };
            let Some(bundle) = self.displays.get_mut(&display) else {
                continue;
            };
            let settled = bundle.resources.registry().are_resources_settled(&scene.referenced_resources);
            if scene.action_log.is_empty()
                && scene.state != SceneState::MappingAndUploading
                && (settled || scene.blocked_updates == 0)
            {
                scene.blocked_updates = 0;
                continue;
            }
            if !settled {
                let forced = matches!(scene.state, SceneState::Mapped | SceneState::Rendered)
                    && scene.blocked_updates > force_apply_limit;
                if !forced {
                    continue;
                }
                engine_warn!(
                    SOURCE,
                    "{} applying {} blocked updates with resources still missing",
                    id,
                    scene.blocked_updates
                );
            }

            let progress = scene.action_log.apply(
                id,
                scene.source.as_ref(),
                &mut bundle.resources,
                Some(&self.timer),
            );
            bundle.resources.record_scene_resource_actions_applied(progress.executed);
            if progress.finished {
                scene.blocked_updates = 0;
            }

            if progress.executed > 0 && scene.state == SceneState::Rendered {
                bundle.setup.set_display_buffer_of_scene_to_be_rerendered(id);
            }
            if progress.finished && scene.state == SceneState::MappingAndUploading {
                scene.state = SceneState::Mapped;
                engine_info!(SOURCE, "{} mapped to {}", id, display);
                self.events.add_event(RendererEvent::SceneMapped { scene: id, display });
            }
        }
    }

    // ===== DISPLAYS =====

    pub(crate) fn handle_create_display(
        &mut self,
        display: DisplayHandle,
        config: DisplayConfig,
        binary_shader_cache: Option<Arc<dyn BinaryShaderCache>>,
    ) {
        if self.displays.contains_key(&display) {
            engine_error!(SOURCE, "{} already exists", display);
            self.events.add_event(RendererEvent::DisplayCreateFailed { display });
            return;
        }

        match self.create_display_bundle(display, config, binary_shader_cache) {
            Ok(bundle) => {
                self.displays.insert(display, bundle);
                engine_info!(SOURCE, "created {}", display);
                self.events.add_event(RendererEvent::DisplayCreated { display });
            }
            Err(error) => {
                engine_error!(SOURCE, "failed to create {}: {}", display, error);
                self.events.add_event(RendererEvent::DisplayCreateFailed { display });
            }
        }
    }

    fn create_display_bundle(
        &mut self,
        display: DisplayHandle,
        config: DisplayConfig,
        binary_shader_cache: Option<Arc<dyn BinaryShaderCache>>,
    ) -> Result<DisplayBundle> {
        let device = self.device_factory.create_device(display, &config)?;
        let resources = RendererResourceManager::new(device, &config, binary_shader_cache)?;
        let mut setup = DisplaySetup::new();
        setup.register_display_buffer(
            DisplayBufferId::Framebuffer,
            Viewport::new(config.width, config.height),
            config.clear_color,
            config.clear_flags,
            false,
        )?;
        Ok(DisplayBundle {
            config,
            resources,
            setup,
            interrupted_buffer: None,
            warping_data: None,
        })
    }

    pub(crate) fn handle_destroy_display(&mut self, display: DisplayHandle) {
        if !self.displays.contains_key(&display) {
            engine_error!(SOURCE, "cannot destroy unknown {}", display);
            self.events.add_event(RendererEvent::DisplayDestroyFailed { display });
            return;
        }
        let mapped = self.scenes.scenes_on_display(display);
        if !mapped.is_empty() {
            engine_error!(SOURCE, "cannot destroy {}, {} scenes are still mapped to it", display, mapped.len());
            self.events.add_event(RendererEvent::DisplayDestroyFailed { display });
            return;
        }

        if let Some(bundle) = self.displays.remove(&display) {
            for buffer in bundle.resources.offscreen_buffer_handles() {
                self.offscreen_buffer_displays.remove(&buffer);
                for link in self.links.remove_links_for_offscreen_buffer(buffer) {
                    self.events.add_event(RendererEvent::SceneDataUnlinked {
                        consumer_scene: link.consumer_scene,
                        consumer_slot: link.consumer_slot,
                    });
                }
            }
            // Dropping the bundle releases every device object of the display
            drop(bundle);
        }
        self.read_pixels_requests.retain(|request| request.display != display);

        engine_info!(SOURCE, "destroyed {}", display);
        self.events.add_event(RendererEvent::DisplayDestroyed { display });
    }

    // ===== SCENES =====

    pub(crate) fn handle_receive_scene(&mut self, scene: SceneId, source: Box<dyn SceneResourceSource>) {
        if self.scenes.create_scene(scene, source) {
            self.events.add_event(RendererEvent::SceneReceived { scene });
        } else {
            engine_error!(SOURCE, "{} was already received", scene);
            self.events.add_event(RendererEvent::SceneReceiveFailed { scene });
        }
    }

    pub(crate) fn handle_update_scene(&mut self, scene: SceneId, update: SceneUpdate) {
        match self.scenes.scene_mut(scene) {
            Some(target) => target.pending_updates.push_back(update),
            None => engine_error!(SOURCE, "dropping update for unknown {}", scene),
        }
    }

    pub(crate) fn handle_unpublish_scene(&mut self, scene: SceneId) {
        let Some(state) = self.scenes.scene_state(scene) else {
            engine_error!(SOURCE, "cannot unpublish unknown {}", scene);
            return;
        };
        if state.is_mapped() {
            self.unmap_scene(scene);
        }
        self.remove_scene_links(scene);
        self.scenes.destroy_scene(scene);
        engine_info!(SOURCE, "{} unpublished", scene);
        self.events.add_event(RendererEvent::SceneUnpublished { scene });
    }

    fn remove_scene_links(&mut self, scene: SceneId) {
        for link in self.links.remove_links_for_scene(scene) {
            self.events.add_event(RendererEvent::SceneDataUnlinked {
                consumer_scene: link.consumer_scene,
                consumer_slot: link.consumer_slot,
            });
        }
    }

    pub(crate) fn handle_map_scene(&mut self, scene: SceneId, display: DisplayHandle) {
        let Some(bundle) = self.displays.get_mut(&display) else {
            engine_error!(SOURCE, "cannot map {} to unknown {}", scene, display);
            self.events.add_event(RendererEvent::SceneMapFailed { scene, display });
            return;
        };
        let Some(target) = self.scenes.scene_mut(scene).filter(|s| s.state == SceneState::Available) else {
            engine_error!(SOURCE, "cannot map {}, it is unknown or already mapped", scene);
            self.events.add_event(RendererEvent::SceneMapFailed { scene, display });
            return;
        };

        target.state = SceneState::MappingAndUploading;
        target.display = Some(display);
        sync_resource_references(target, bundle.resources.registry_mut());
        provide_resource_data(target, bundle.resources.registry_mut());
        target.action_log.consolidate(&collect_scene_resource_actions(target.source.as_ref()));

        if bundle.setup.find_display_buffer_scene_is_assigned_to(scene).is_none() {
            if let Err(error) = bundle.setup.assign_scene_to_display_buffer(scene, DisplayBufferId::Framebuffer, 0) {
                engine_warn!(SOURCE, "{} has no display buffer: {}", scene, error);
            }
        }
        engine_info!(SOURCE, "mapping {} to {}", scene, display);
    }

    pub(crate) fn handle_unmap_scene(&mut self, scene: SceneId) {
        if !self.scenes.scene_state(scene).is_some_and(SceneState::is_mapped) {
            engine_error!(SOURCE, "cannot unmap {}, it is not mapped", scene);
            self.events.add_event(RendererEvent::SceneUnmapFailed { scene });
            return;
        }
        self.unmap_scene(scene);
        engine_info!(SOURCE, "{} unmapped", scene);
        self.events.add_event(RendererEvent::SceneUnmapped { scene });
    }

    fn unmap_scene(&mut self, id: SceneId) {
        let Some(scene) = self.scenes.scene_mut(id) else {
            return;
        };
        let display = scene.display.take();
        scene.state = SceneState::Available;
        scene.action_log.clear();
        let referenced = mem::take(&mut scene.referenced_resources);

        let Some(bundle) = display.and_then(|display| self.displays.get_mut(&display)) else {
            return;
        };
        bundle.setup.unassign_scene(id);
        bundle.resources.registry_mut().unreference_resources_for_scene(id, &referenced);
        bundle.resources.unload_all_scene_resources_for_scene(id);
    }

    pub(crate) fn handle_show_scene(&mut self, scene: SceneId) {
        if self.set_scene_shown(scene, SceneState::Mapped, SceneState::Rendered) {
            self.events.add_event(RendererEvent::SceneShown { scene });
        } else {
            self.events.add_event(RendererEvent::SceneShowFailed { scene });
        }
    }

    pub(crate) fn handle_hide_scene(&mut self, scene: SceneId) {
        if self.set_scene_shown(scene, SceneState::Rendered, SceneState::Mapped) {
            self.events.add_event(RendererEvent::SceneHidden { scene });
        } else {
            self.events.add_event(RendererEvent::SceneHideFailed { scene });
        }
    }

    fn set_scene_shown(&mut self, id: SceneId, from: SceneState, to: SceneState) -> bool {
        let Some(scene) = self.scenes.scene_mut(id) else {
            engine_error!(SOURCE, "unknown {}", id);
            return false;
        };
        if scene.state != from {
            engine_error!(SOURCE, "{} is {:?}, expected {:?}", id, scene.state, from);
            return false;
        }
        let Some(bundle) = scene.display.and_then(|display| self.displays.get_mut(&display)) else {
            return false;
        };
        if bundle.setup.set_scene_shown(id, to == SceneState::Rendered).is_err() {
            return false;
        }
        scene.state = to;
        true
    }

    pub(crate) fn handle_assign_scene_to_display_buffer(
        &mut self,
        scene: SceneId,
        buffer: DisplayBufferId,
        render_order: i32,
    ) {
        let display = self.scenes.scene(scene).and_then(|s| s.display);
        let assigned = match display.and_then(|display| self.displays.get_mut(&display)) {
            Some(bundle) => bundle.setup.assign_scene_to_display_buffer(scene, buffer, render_order).is_ok(),
            None => {
                engine_error!(SOURCE, "cannot assign {} to {}, the scene is not mapped", scene, buffer);
                false
            }
        };
        if assigned {
            self.events.add_event(RendererEvent::SceneAssignedToDisplayBuffer { scene, buffer });
        } else {
            self.events.add_event(RendererEvent::SceneAssignedToDisplayBufferFailed { scene, buffer });
        }
    }

    // ===== OFFSCREEN BUFFERS =====

    pub(crate) fn handle_create_offscreen_buffer(
        &mut self,
        display: DisplayHandle,
        buffer: OffscreenBufferHandle,
        desc: OffscreenBufferDesc,
    ) {
        if let Err(error) = self.create_offscreen_buffer(display, buffer, &desc) {
            engine_error!(SOURCE, "failed to create {} on {}: {}", buffer, display, error);
            self.events.add_event(RendererEvent::OffscreenBufferCreateFailed { display, buffer });
            return;
        }
        self.offscreen_buffer_displays.insert(buffer, display);
        self.events.add_event(RendererEvent::OffscreenBufferCreated { display, buffer });
    }

    fn create_offscreen_buffer(
        &mut self,
        display: DisplayHandle,
        buffer: OffscreenBufferHandle,
        desc: &OffscreenBufferDesc,
    ) -> Result<()> {
        if self.offscreen_buffer_displays.contains_key(&buffer) {
            engine_bail!(SOURCE, "{} already exists", buffer);
        }
        let Some(bundle) = self.displays.get_mut(&display) else {
            engine_bail!(SOURCE, "unknown {}", display);
        };

        bundle.resources.upload_offscreen_buffer(buffer, desc)?;
        let registered = bundle.setup.register_display_buffer(
            DisplayBufferId::Offscreen(buffer),
            Viewport::new(desc.width, desc.height),
            bundle.config.clear_color,
            bundle.config.clear_flags,
            desc.interruptible,
        );
        if let Err(error) = registered {
            bundle.resources.unload_offscreen_buffer(buffer)?;
            return Err(error);
        }
        Ok(())
    }

    pub(crate) fn handle_destroy_offscreen_buffer(&mut self, display: DisplayHandle, buffer: OffscreenBufferHandle) {
        let id = DisplayBufferId::Offscreen(buffer);
        let known = self.offscreen_buffer_displays.get(&buffer) == Some(&display);
        let Some(bundle) = self.displays.get_mut(&display).filter(|_| known) else {
            engine_error!(SOURCE, "cannot destroy unknown {} on {}", buffer, display);
            self.events.add_event(RendererEvent::OffscreenBufferDestroyFailed { display, buffer });
            return;
        };
        if bundle.setup.display_buffer(id).is_some_and(|info| !info.scenes.is_empty()) {
            engine_error!(SOURCE, "cannot destroy {}, scenes are still assigned to it", buffer);
            self.events.add_event(RendererEvent::OffscreenBufferDestroyFailed { display, buffer });
            return;
        }

        if let Err(error) = bundle.setup.unregister_display_buffer(id) {
            engine_warn!(SOURCE, "{} was not registered: {}", buffer, error);
        }
        if bundle.interrupted_buffer == Some(id) {
            bundle.interrupted_buffer = None;
        }
        if let Err(error) = bundle.resources.unload_offscreen_buffer(buffer) {
            engine_warn!(SOURCE, "{} had no device objects: {}", buffer, error);
        }
        self.offscreen_buffer_displays.remove(&buffer);

        for link in self.links.remove_links_for_offscreen_buffer(buffer) {
            self.events.add_event(RendererEvent::SceneDataUnlinked {
                consumer_scene: link.consumer_scene,
                consumer_slot: link.consumer_slot,
            });
        }
        self.read_pixels_requests
            .retain(|request| !(request.display == display && request.buffer == id));

        self.events.add_event(RendererEvent::OffscreenBufferDestroyed { display, buffer });
    }

    // ===== DATA LINKS =====

    pub(crate) fn handle_link_data(
        &mut self,
        provider_scene: SceneId,
        provider_slot: DataSlotId,
        consumer_scene: SceneId,
        consumer_slot: DataSlotId,
    ) {
        match self.check_data_link(provider_scene, provider_slot, consumer_scene, consumer_slot) {
            Ok(()) => {
                let provider = LinkProvider::SceneSlot { scene: provider_scene, slot: provider_slot };
                self.links.add_link(consumer_scene, consumer_slot, provider);
                self.events.add_event(RendererEvent::SceneDataLinked {
                    provider_scene,
                    provider_slot,
                    consumer_scene,
                    consumer_slot,
                });
            }
            Err(_) => self.events.add_event(RendererEvent::SceneDataLinkFailed {
                provider_scene,
                provider_slot,
                consumer_scene,
                consumer_slot,
            }),
        }
    }

    fn check_data_link(
        &self,
        provider_scene: SceneId,
        provider_slot: DataSlotId,
        consumer_scene: SceneId,
        consumer_slot: DataSlotId,
    ) -> Result<()> {
        if provider_scene == consumer_scene {
            engine_bail!(SOURCE, "cannot link {} to itself", provider_scene);
        }
        let provider = slot_kind(self.scenes.scene(provider_scene), provider_slot)?;
        let consumer = slot_kind(self.scenes.scene(consumer_scene), consumer_slot)?;
        let compatible = matches!(
            (provider, consumer),
            (DataSlotKind::DataProvider, DataSlotKind::DataConsumer)
                | (DataSlotKind::TextureProvider, DataSlotKind::TextureConsumer)
        );
        if !compatible {
            engine_bail!(
                SOURCE,
                "cannot link {:?} {}/{} to {:?} {}/{}",
                provider,
                provider_scene,
                provider_slot,
                consumer,
                consumer_scene,
                consumer_slot
            );
        }
        Ok(())
    }

    pub(crate) fn handle_link_offscreen_buffer(
        &mut self,
        buffer: OffscreenBufferHandle,
        consumer_scene: SceneId,
        consumer_slot: DataSlotId,
    ) {
        match self.check_offscreen_buffer_link(buffer, consumer_scene, consumer_slot) {
            Ok(()) => {
                self.links.add_link(consumer_scene, consumer_slot, LinkProvider::OffscreenBuffer(buffer));
                self.events.add_event(RendererEvent::SceneDataBufferLinked { buffer, consumer_scene, consumer_slot });
            }
            Err(_) => self.events.add_event(RendererEvent::SceneDataBufferLinkFailed {
                buffer,
                consumer_scene,
                consumer_slot,
            }),
        }
    }

    fn check_offscreen_buffer_link(
        &self,
        buffer: OffscreenBufferHandle,
        consumer_scene: SceneId,
        consumer_slot: DataSlotId,
    ) -> Result<()> {
        let Some(display) = self.offscreen_buffer_displays.get(&buffer).copied() else {
            engine_bail!(SOURCE, "unknown {}", buffer);
        };
        let scene = self.scenes.scene(consumer_scene);
        if slot_kind(scene, consumer_slot)? != DataSlotKind::TextureConsumer {
            engine_bail!(SOURCE, "{}/{} is not a texture consumer", consumer_scene, consumer_slot);
        }
        if scene.and_then(|s| s.display) != Some(display) {
            engine_bail!(SOURCE, "{} is not mapped to {}, the display of {}", consumer_scene, display, buffer);
        }
        Ok(())
    }

    pub(crate) fn handle_unlink_data(&mut self, consumer_scene: SceneId, consumer_slot: DataSlotId) {
        if self.links.remove_link(consumer_scene, consumer_slot).is_some() {
            self.events.add_event(RendererEvent::SceneDataUnlinked { consumer_scene, consumer_slot });
        } else {
            engine_error!(SOURCE, "{}/{} is not linked", consumer_scene, consumer_slot);
            self.events.add_event(RendererEvent::SceneDataUnlinkFailed { consumer_scene, consumer_slot });
        }
    }

    // ===== DISPLAY SETTINGS =====

    pub(crate) fn handle_set_clear_color(&mut self, display: DisplayHandle, buffer: DisplayBufferId, color: Vec4) {
        match self.displays.get_mut(&display) {
            // Unknown buffers are logged by the setup
            Some(bundle) => {
                let _ = bundle.setup.set_clear_color(buffer, color);
            }
            None => engine_error!(SOURCE, "cannot set clear color on unknown {}", display),
        }
    }

    pub(crate) fn handle_set_clear_flags(&mut self, display: DisplayHandle, buffer: DisplayBufferId, flags: ClearFlags) {
        match self.displays.get_mut(&display) {
            Some(bundle) => {
                let _ = bundle.setup.set_clear_flags(buffer, flags);
            }
            None => engine_error!(SOURCE, "cannot set clear flags on unknown {}", display),
        }
    }

    /// Budgets in microseconds
    pub(crate) fn handle_set_frame_timer_limits(
        &mut self,
        scene_resources_upload: u64,
        resources_upload: u64,
        scene_actions_apply: u64,
        offscreen_buffer_render: u64,
    ) {
        self.timer
            .set_section_time_budget(FrameTimerSection::SceneResourcesUpload, scene_resources_upload);
        self.timer.set_section_time_budget(FrameTimerSection::ResourcesUpload, resources_upload);
        self.timer.set_section_time_budget(FrameTimerSection::SceneActionsApply, scene_actions_apply);
        self.timer
            .set_section_time_budget(FrameTimerSection::OffscreenBufferRender, offscreen_buffer_render);
        engine_info!(
            SOURCE,
            "frame budgets (us): scene resources {}, resources {}, scene actions {}, offscreen render {}",
            scene_resources_upload,
            resources_upload,
            scene_actions_apply,
            offscreen_buffer_render
        );
    }

    pub(crate) fn handle_set_skipping_of_unmodified_buffers(&mut self, enabled: bool) {
        self.skip_unmodified_buffers = enabled;
        engine_info!(SOURCE, "skipping of unmodified buffers {}", if enabled { "enabled" } else { "disabled" });
    }

    pub(crate) fn handle_set_force_apply_pending_updates_limit(&mut self, limit: usize) {
        self.force_apply_pending_updates_limit = limit;
        engine_info!(SOURCE, "force apply pending updates limit: {}", limit);
    }

    pub(crate) fn handle_set_force_unsubscribe_pending_updates_limit(&mut self, limit: usize) {
        self.force_unsubscribe_pending_updates_limit = limit;
        engine_info!(SOURCE, "force unsubscribe pending updates limit: {}", limit);
    }

    pub(crate) fn handle_update_warping_data(&mut self, display: DisplayHandle, data: WarpingData) {
        match self.displays.get_mut(&display) {
            Some(bundle) if bundle.config.warping_enabled => {
                bundle.warping_data = Some(data);
                let _ = bundle.setup.set_display_buffer_to_be_rerendered(DisplayBufferId::Framebuffer, true);
                self.events.add_event(RendererEvent::WarpingDataUpdated { display });
            }
            Some(_) => {
                engine_error!(SOURCE, "warping is disabled on {}", display);
                self.events.add_event(RendererEvent::WarpingDataUpdateFailed { display });
            }
            None => {
                engine_error!(SOURCE, "cannot update warping data of unknown {}", display);
                self.events.add_event(RendererEvent::WarpingDataUpdateFailed { display });
            }
        }
    }

    pub(crate) fn handle_read_pixels(&mut self, display: DisplayHandle, buffer: DisplayBufferId, params: ReadPixelsParams) {
        let info = self.displays.get(&display).and_then(|bundle| bundle.setup.display_buffer(buffer));
        let valid = info.is_some_and(|info| {
            params.full_screen
                || (params.width > 0
                    && params.height > 0
                    && info.viewport.contains_rect(params.x, params.y, params.width, params.height))
        });
        if valid {
            self.read_pixels_requests.push(ReadPixelsRequest { display, buffer, params });
        } else {
            engine_error!(SOURCE, "invalid read pixels request on {} {}: {:?}", display, buffer, params);
            self.events.add_event(RendererEvent::ReadPixelsFailed { display, buffer });
        }
    }

    // ===== SYSTEM COMPOSITOR =====

    pub(crate) fn handle_system_compositor_command(&mut self, command: SystemCompositorCommand) {
        let Some(compositor) = self.compositor.as_mut() else {
            engine_warn!(SOURCE, "no system compositor controller, ignoring {:?}", command);
            return;
        };
        match command {
            SystemCompositorCommand::ListIviSurfaces => compositor.list_ivi_surfaces(),
            SystemCompositorCommand::SetIviSurfaceVisibility { surface, visible } => {
                compositor.set_ivi_surface_visibility(surface, visible)
            }
            SystemCompositorCommand::SetIviSurfaceOpacity { surface, opacity } => {
                compositor.set_ivi_surface_opacity(surface, opacity)
            }
            SystemCompositorCommand::SetIviSurfaceDestRectangle { surface, x, y, width, height } => {
                compositor.set_ivi_surface_dest_rectangle(surface, x, y, width, height)
            }
            SystemCompositorCommand::SetIviLayerVisibility { layer, visible } => {
                compositor.set_ivi_layer_visibility(layer, visible)
            }
            SystemCompositorCommand::AddIviSurfaceToIviLayer { surface, layer } => {
                compositor.add_ivi_surface_to_ivi_layer(surface, layer)
            }
            SystemCompositorCommand::RemoveIviSurfaceFromIviLayer { surface, layer } => {
                compositor.remove_ivi_surface_from_ivi_layer(surface, layer)
            }
            SystemCompositorCommand::DestroyIviSurface { surface } => compositor.destroy_ivi_surface(surface),
            SystemCompositorCommand::Screenshot { file_name, screen } => compositor.screenshot(&file_name, screen),
        }
    }

    // ===== DIAGNOSTICS =====

    pub(crate) fn handle_log_statistics(&mut self) {
        engine_info!(SOURCE, "frame {}, {} displays, {} scenes", self.frame_count, self.displays.len(), self.scenes.len());
        for display in self.display_handles() {
            if let Some(bundle) = self.displays.get(&display) {
                engine_info!(SOURCE, "{}: {}", display, bundle.resources.statistics());
            }
        }
    }

    pub(crate) fn handle_log_info(&mut self, verbose: bool) {
        for id in self.scenes.scene_ids() {
            let Some(scene) = self.scenes.scene(id) else {
                continue;
            };
            match scene.display {
                Some(display) => engine_info!(SOURCE, "{}: {:?} on {}", id, scene.state, display),
                None => engine_info!(SOURCE, "{}: {:?}", id, scene.state),
            }
            if verbose {
                engine_info!(
                    SOURCE,
                    "  {} resources referenced, {} pending actions, {} pending updates",
                    scene.referenced_resources.len(),
                    scene.action_log.len(),
                    scene.pending_updates.len()
                );
            }
        }

        for display in self.display_handles() {
            let Some(bundle) = self.displays.get(&display) else {
                continue;
            };
            engine_info!(
                SOURCE,
                "{}: {} resources, {} offscreen buffers",
                display,
                bundle.resources.registry().resource_count(),
                bundle.resources.offscreen_buffer_handles().len()
            );
            if verbose {
                for (buffer, info) in bundle.setup.display_buffers() {
                    let scenes: Vec<String> = info.scenes.iter().map(|s| s.scene.to_string()).collect();
                    engine_info!(
                        SOURCE,
                        "  {} {}x{} dirty={} scenes=[{}]",
                        buffer,
                        info.viewport.width,
                        info.viewport.height,
                        info.needs_rerender,
                        scenes.join(", ")
                    );
                }
            }
        }

        if verbose {
            for link in self.links.links() {
                engine_info!(SOURCE, "link {}/{} <- {:?}", link.consumer_scene, link.consumer_slot, link.provider);
            }
        }
    }

    pub(crate) fn handle_confirmation_echo(&mut self, text: &str) {
        engine_info!(SOURCE, "confirmation: {}", text);
    }

    // ===== DRAW LOOP =====

    /// Dirty non-interruptible offscreen buffers of `display`
    pub fn non_interruptible_offscreen_buffers_to_render(&self, display: DisplayHandle) -> Vec<DisplayBufferId> {
        self.displays
            .get(&display)
            .map(|bundle| bundle.setup.non_interruptible_offscreen_buffers_to_render())
            .unwrap_or_default()
    }

    /// Dirty interruptible buffers of `display`, resuming at the interrupted one
    pub fn interruptible_offscreen_buffers_to_render(&self, display: DisplayHandle) -> Vec<DisplayBufferId> {
        self.displays
            .get(&display)
            .map(|bundle| bundle.setup.interruptible_offscreen_buffers_to_render(bundle.interrupted_buffer))
            .unwrap_or_default()
    }

    /// True when the buffer must be rendered this frame
    pub fn is_display_buffer_dirty(&self, display: DisplayHandle, buffer: DisplayBufferId) -> bool {
        self.displays
            .get(&display)
            .and_then(|bundle| bundle.setup.display_buffer(buffer))
            .is_some_and(|info| info.needs_rerender)
    }

    /// True once this frame's offscreen render budget is spent
    pub fn is_offscreen_buffer_render_budget_exceeded(&self) -> bool {
        self.timer
            .is_time_budget_exceeded_for_section(FrameTimerSection::OffscreenBufferRender)
    }

    /// Rendering into `buffer` starts
    ///
    /// A fresh render clears the dirty flag up front, so changes made while
    /// the buffer is being rendered (possibly across frames) dirty it again.
    /// Resuming the interrupted buffer leaves the flag alone.
    pub fn begin_display_buffer_render(&mut self, display: DisplayHandle, buffer: DisplayBufferId) -> Result<()> {
        let Some(bundle) = self.displays.get_mut(&display) else {
            engine_bail!(SOURCE, "unknown {}", display);
        };
        if bundle.interrupted_buffer == Some(buffer) {
            return Ok(());
        }
        bundle.setup.set_display_buffer_to_be_rerendered(buffer, false)
    }

    /// Remember that rendering into `buffer` stopped before it was complete
    pub fn mark_offscreen_buffer_interrupted(&mut self, display: DisplayHandle, buffer: DisplayBufferId) -> Result<()> {
        let Some(bundle) = self.displays.get_mut(&display) else {
            engine_bail!(SOURCE, "unknown {}", display);
        };
        if !bundle.setup.display_buffer(buffer).is_some_and(|info| info.is_interruptible) {
            engine_bail!(SOURCE, "{} on {} is not interruptible", buffer, display);
        }
        bundle.interrupted_buffer = Some(buffer);
        Ok(())
    }

    /// Rendering of `buffer` completed
    ///
    /// Clears the interruption marker. A finished offscreen buffer dirties the
    /// framebuffer, which shows its new content next frame.
    pub fn finish_display_buffer_render(&mut self, display: DisplayHandle, buffer: DisplayBufferId) -> Result<()> {
        let Some(bundle) = self.displays.get_mut(&display) else {
            engine_bail!(SOURCE, "unknown {}", display);
        };
        if !bundle.setup.contains_display_buffer(buffer) {
            engine_bail!(SOURCE, "{} is not registered on {}", buffer, display);
        }
        if bundle.interrupted_buffer == Some(buffer) {
            bundle.interrupted_buffer = None;
        }
        if let DisplayBufferId::Offscreen(_) = buffer {
            bundle.setup.set_display_buffer_to_be_rerendered(DisplayBufferId::Framebuffer, true)?;
        }
        Ok(())
    }

    /// Drain the accepted `ReadPixels` requests
    pub fn take_read_pixels_requests(&mut self) -> Vec<ReadPixelsRequest> {
        mem::take(&mut self.read_pixels_requests)
    }

    // ===== ACCESSORS =====

    /// Shared queue; commands enqueued from any thread run on the next `update`
    pub fn command_buffer(&self) -> Arc<RendererCommandBuffer> {
        Arc::clone(&self.command_buffer)
    }

    /// Queue a command for the next `update`
    pub fn enqueue_command(&self, command: RendererCommand) {
        self.command_buffer.enqueue_command(command);
    }

    /// Drain the events emitted so far
    pub fn take_events(&mut self) -> Vec<RendererEvent> {
        self.events.take_events()
    }

    /// Events emitted and not yet taken
    pub fn events(&self) -> &[RendererEvent] {
        self.events.events()
    }

    /// Budgets and start time of the current frame
    pub fn frame_timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Number of `update` calls so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Bundle of a created display
    pub fn display(&self, display: DisplayHandle) -> Option<&DisplayBundle> {
        self.displays.get(&display)
    }

    /// Sorted
    pub fn display_handles(&self) -> Vec<DisplayHandle> {
        let mut handles: Vec<DisplayHandle> = self.displays.keys().copied().collect();
        handles.sort();
        handles
    }

    /// Every received scene
    pub fn scenes(&self) -> &RendererScenes {
        &self.scenes
    }

    /// State of a received scene
    pub fn scene_state(&self, scene: SceneId) -> Option<SceneState> {
        self.scenes.scene_state(scene)
    }

    /// Data links between scenes
    pub fn links(&self) -> &SceneLinks {
        &self.links
    }
}

fn slot_kind(scene: Option<&RendererScene>, slot: DataSlotId) -> Result<DataSlotKind> {
    let Some(scene) = scene else {
        engine_bail!(SOURCE, "unknown scene for {}", slot);
    };
    match scene.source.data_slot(slot) {
        Some(data_slot) => Ok(data_slot.kind),
        None => engine_bail!(SOURCE, "{} has no {}", scene.id, slot),
    }
}

/// Bring the registry references of `scene` in line with its current content
fn sync_resource_references(scene: &mut RendererScene, registry: &mut ResourceRegistry) {
    let current = scene.resource_hashes();
    let added: Vec<_> = current
        .iter()
        .filter(|hash| !scene.referenced_resources.contains(hash))
        .copied()
        .collect();
    let removed: Vec<_> = scene
        .referenced_resources
        .iter()
        .filter(|hash| current.binary_search(hash).is_err())
        .copied()
        .collect();
    registry.reference_resources_for_scene(scene.id, &added);
    registry.unreference_resources_for_scene(scene.id, &removed);
    scene.referenced_resources = current;
}

/// Hand payloads the registry is still waiting for
fn provide_resource_data(scene: &RendererScene, registry: &mut ResourceRegistry) {
    for hash in &scene.referenced_resources {
        if registry.resource_status(*hash) != Some(ResourceStatus::Registered) {
            continue;
        }
        if let Some(data) = scene.resource_data.get(hash) {
            registry.provide_resource_data(data.clone());
        }
    }
}

#[cfg(test)]
#[path = "frame_pipeline_tests.rs"]
mod tests;
