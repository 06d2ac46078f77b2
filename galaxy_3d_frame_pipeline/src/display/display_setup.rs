/// Bookkeeping of the buffers a display renders into.
///
/// A display owns its framebuffer plus any number of offscreen buffers.
/// Each buffer keeps its viewport, clear state, the scenes assigned to it
/// (sorted by render order, ties in assignment order) and a dirty flag
/// telling the draw loop whether it must be rendered again. Clear state is
/// display-global for dirtiness: changing it on one buffer dirties all.

use std::fmt;
use glam::Vec4;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::handles::{OffscreenBufferHandle, SceneId};
use crate::engine_bail;
use super::display_config::ClearFlags;

const SOURCE: &str = "galaxy3d::DisplaySetup";

/// A buffer of a display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayBufferId {
    Framebuffer,
    Offscreen(OffscreenBufferHandle),
}

impl fmt::Display for DisplayBufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayBufferId::Framebuffer => write!(f, "framebuffer"),
            DisplayBufferId::Offscreen(handle) => write!(f, "{}", handle),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Viewport at the origin
    pub fn new(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// True if the rectangle lies inside the viewport
    pub fn contains_rect(&self, x: i32, y: i32, width: u32, height: u32) -> bool {
        let right = x as i64 + width as i64;
        let bottom = y as i64 + height as i64;
        x >= self.x
            && y >= self.y
            && right <= self.x as i64 + self.width as i64
            && bottom <= self.y as i64 + self.height as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignedScene {
    pub scene: SceneId,
    pub render_order: i32,
    pub shown: bool,
}

#[derive(Debug, Clone)]
pub struct DisplayBufferInfo {
    pub is_offscreen: bool,
    pub is_interruptible: bool,
    pub viewport: Viewport,
    pub clear_color: Vec4,
    pub clear_flags: ClearFlags,
    pub needs_rerender: bool,
    /// Sorted by `render_order`, stable
    pub scenes: Vec<AssignedScene>,
}

#[derive(Debug, Default)]
pub struct DisplaySetup {
    buffers: FxHashMap<DisplayBufferId, DisplayBufferInfo>,
    registration_order: Vec<DisplayBufferId>,
}

impl DisplaySetup {
    /// Setup with no display buffer registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a buffer; it starts dirty with no scenes
    pub fn register_display_buffer(
        &mut self,
        id: DisplayBufferId,
        viewport: Viewport,
        clear_color: Vec4,
        clear_flags: ClearFlags,
        is_interruptible: bool,
    ) -> Result<()> {
        if self.buffers.contains_key(&id) {
            engine_bail!(SOURCE, "display buffer {} is already registered", id);
        }
        let is_offscreen = matches!(id, DisplayBufferId::Offscreen(_));
        if is_interruptible && !is_offscreen {
            engine_bail!(SOURCE, "the framebuffer cannot be interruptible");
        }
        self.buffers.insert(
            id,
            DisplayBufferInfo {
                is_offscreen,
                is_interruptible,
                viewport,
                clear_color,
                clear_flags,
                needs_rerender: true,
                scenes: Vec::new(),
            },
        );
        self.registration_order.push(id);
        Ok(())
    }

    /// Remove a buffer together with its scene assignments
    pub fn unregister_display_buffer(&mut self, id: DisplayBufferId) -> Result<()> {
        if self.buffers.remove(&id).is_none() {
            engine_bail!(SOURCE, "display buffer {} is not registered", id);
        }
        self.registration_order.retain(|b| *b != id);
        Ok(())
    }

    /// Info of a registered display buffer
    pub fn display_buffer(&self, id: DisplayBufferId) -> Option<&DisplayBufferInfo> {
        self.buffers.get(&id)
    }

    /// True when `id` is registered
    pub fn contains_display_buffer(&self, id: DisplayBufferId) -> bool {
        self.buffers.contains_key(&id)
    }

    /// Buffers in registration order
    pub fn display_buffers(&self) -> impl Iterator<Item = (DisplayBufferId, &DisplayBufferInfo)> + '_ {
        self.registration_order
            .iter()
            .filter_map(move |id| self.buffers.get(id).map(|info| (*id, info)))
    }

    fn buffer_mut(&mut self, id: DisplayBufferId) -> Result<&mut DisplayBufferInfo> {
        match self.buffers.get_mut(&id) {
            Some(info) => Ok(info),
            None => Err(crate::engine_err!(SOURCE, "display buffer {} is not registered", id)),
        }
    }

    /// Set or clear the dirty flag of one buffer
    pub fn set_display_buffer_to_be_rerendered(&mut self, id: DisplayBufferId, rerender: bool) -> Result<()> {
        self.buffer_mut(id)?.needs_rerender = rerender;
        Ok(())
    }

    /// Dirty every registered buffer
    pub fn set_all_display_buffers_to_be_rerendered(&mut self) {
        for info in self.buffers.values_mut() {
            info.needs_rerender = true;
        }
    }

    /// Change the clear color of one buffer and dirty every buffer
    pub fn set_clear_color(&mut self, id: DisplayBufferId, color: Vec4) -> Result<()> {
        self.buffer_mut(id)?.clear_color = color;
        self.set_all_display_buffers_to_be_rerendered();
        Ok(())
    }

    /// Change the clear flags of one buffer and dirty every buffer
    pub fn set_clear_flags(&mut self, id: DisplayBufferId, flags: ClearFlags) -> Result<()> {
        self.buffer_mut(id)?.clear_flags = flags;
        self.set_all_display_buffers_to_be_rerendered();
        Ok(())
    }

    /// Change the viewport and dirty the buffer
    pub fn set_viewport(&mut self, id: DisplayBufferId, viewport: Viewport) -> Result<()> {
        let info = self.buffer_mut(id)?;
        info.viewport = viewport;
        info.needs_rerender = true;
        Ok(())
    }

    /// Move (or add) a scene into a buffer's list at `render_order`
    ///
    /// A scene already assigned somewhere keeps its `shown` flag.
    pub fn assign_scene_to_display_buffer(
        &mut self,
        scene: SceneId,
        id: DisplayBufferId,
        render_order: i32,
    ) -> Result<()> {
        if !self.buffers.contains_key(&id) {
            engine_bail!(SOURCE, "cannot assign {} to unknown display buffer {}", scene, id);
        }
        let shown = self.take_scene(scene).map_or(false, |assigned| assigned.shown);

        let info = self.buffer_mut(id)?;
        let position = info
            .scenes
            .iter()
            .position(|s| s.render_order > render_order)
            .unwrap_or(info.scenes.len());
        info.scenes.insert(position, AssignedScene { scene, render_order, shown });
        info.needs_rerender = true;
        Ok(())
    }

    /// Remove a scene from whichever buffer it is assigned to
    pub fn unassign_scene(&mut self, scene: SceneId) -> bool {
        self.take_scene(scene).is_some()
    }

    fn take_scene(&mut self, scene: SceneId) -> Option<AssignedScene> {
        for info in self.buffers.values_mut() {
            if let Some(index) = info.scenes.iter().position(|s| s.scene == scene) {
                info.needs_rerender = true;
                return Some(info.scenes.remove(index));
            }
        }
        None
    }

    /// Show or hide an assigned scene, dirtying its buffer
    pub fn set_scene_shown(&mut self, scene: SceneId, shown: bool) -> Result<()> {
        for info in self.buffers.values_mut() {
            if let Some(assigned) = info.scenes.iter_mut().find(|s| s.scene == scene) {
                assigned.shown = shown;
                info.needs_rerender = true;
                return Ok(());
            }
        }
        engine_bail!(SOURCE, "{} is not assigned to any display buffer", scene)
    }

    /// Dirty the buffer the scene is assigned to; false if it is not assigned
    pub fn set_display_buffer_of_scene_to_be_rerendered(&mut self, scene: SceneId) -> bool {
        for info in self.buffers.values_mut() {
            if info.scenes.iter().any(|s| s.scene == scene) {
                info.needs_rerender = true;
                return true;
            }
        }
        false
    }

    /// Buffer the scene renders into, if any
    pub fn find_display_buffer_scene_is_assigned_to(&self, scene: SceneId) -> Option<DisplayBufferId> {
        self.registration_order.iter().copied().find(|id| {
            self.buffers
                .get(id)
                .map_or(false, |info| info.scenes.iter().any(|s| s.scene == scene))
        })
    }

    /// Assignment record of a scene
    pub fn assigned_scene(&self, scene: SceneId) -> Option<&AssignedScene> {
        self.buffers
            .values()
            .flat_map(|info| info.scenes.iter())
            .find(|s| s.scene == scene)
    }

    /// Dirty non-interruptible offscreen buffers, in registration order
    pub fn non_interruptible_offscreen_buffers_to_render(&self) -> Vec<DisplayBufferId> {
        self.display_buffers()
            .filter(|(_, info)| info.is_offscreen && !info.is_interruptible && info.needs_rerender)
            .map(|(id, _)| id)
            .collect()
    }

    /// Interruptible buffers to render this pass, in registration order
    ///
    /// With an interruption point, rendering resumes at that buffer (always
    /// included) followed by the dirty interruptible buffers registered after
    /// it. Without one, or if it is not a registered interruptible buffer,
    /// all dirty interruptible buffers are returned.
    pub fn interruptible_offscreen_buffers_to_render(
        &self,
        interrupted: Option<DisplayBufferId>,
    ) -> Vec<DisplayBufferId> {
        let interruptible: Vec<(DisplayBufferId, &DisplayBufferInfo)> = self
            .display_buffers()
            .filter(|(_, info)| info.is_interruptible)
            .collect();

        let start = interrupted.and_then(|id| interruptible.iter().position(|(b, _)| *b == id));
        match start {
            Some(start) => interruptible[start..]
                .iter()
                .enumerate()
                .filter(|(offset, (_, info))| *offset == 0 || info.needs_rerender)
                .map(|(_, (id, _))| *id)
                .collect(),
            None => interruptible
                .iter()
                .filter(|(_, info)| info.needs_rerender)
                .map(|(id, _)| *id)
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "display_setup_tests.rs"]
mod tests;
