/// Events reporting the outcome of renderer commands.

use crate::display::DisplayBufferId;
use crate::handles::{DataSlotId, DisplayHandle, OffscreenBufferHandle, SceneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererEvent {
    DisplayCreated { display: DisplayHandle },
    DisplayCreateFailed { display: DisplayHandle },
    DisplayDestroyed { display: DisplayHandle },
    DisplayDestroyFailed { display: DisplayHandle },

    SceneReceived { scene: SceneId },
    SceneReceiveFailed { scene: SceneId },
    SceneUnpublished { scene: SceneId },
    /// Dropped after accumulating too many pending updates; must be received again
    SceneForceUnsubscribed { scene: SceneId },
    SceneMapped { scene: SceneId, display: DisplayHandle },
    SceneMapFailed { scene: SceneId, display: DisplayHandle },
    SceneUnmapped { scene: SceneId },
    SceneUnmapFailed { scene: SceneId },
    SceneShown { scene: SceneId },
    SceneShowFailed { scene: SceneId },
    SceneHidden { scene: SceneId },
    SceneHideFailed { scene: SceneId },
    SceneAssignedToDisplayBuffer { scene: SceneId, buffer: DisplayBufferId },
    SceneAssignedToDisplayBufferFailed { scene: SceneId, buffer: DisplayBufferId },

    OffscreenBufferCreated { display: DisplayHandle, buffer: OffscreenBufferHandle },
    OffscreenBufferCreateFailed { display: DisplayHandle, buffer: OffscreenBufferHandle },
    OffscreenBufferDestroyed { display: DisplayHandle, buffer: OffscreenBufferHandle },
    OffscreenBufferDestroyFailed { display: DisplayHandle, buffer: OffscreenBufferHandle },

    SceneDataLinked {
        provider_scene: SceneId,
        provider_slot: DataSlotId,
        consumer_scene: SceneId,
        consumer_slot: DataSlotId,
    },
    SceneDataLinkFailed {
        provider_scene: SceneId,
        provider_slot: DataSlotId,
        consumer_scene: SceneId,
        consumer_slot: DataSlotId,
    },
    SceneDataBufferLinked { buffer: OffscreenBufferHandle, consumer_scene: SceneId, consumer_slot: DataSlotId },
    SceneDataBufferLinkFailed { buffer: OffscreenBufferHandle, consumer_scene: SceneId, consumer_slot: DataSlotId },
    SceneDataUnlinked { consumer_scene: SceneId, consumer_slot: DataSlotId },
    SceneDataUnlinkFailed { consumer_scene: SceneId, consumer_slot: DataSlotId },

    WarpingDataUpdated { display: DisplayHandle },
    WarpingDataUpdateFailed { display: DisplayHandle },
    ReadPixelsFailed { display: DisplayHandle, buffer: DisplayBufferId },
}

/// Events in emission order
#[derive(Debug, Default)]
pub struct RendererEventCollector {
    events: Vec<RendererEvent>,
}

impl RendererEventCollector {
    /// Empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event after the ones already collected
    pub fn add_event(&mut self, event: RendererEvent) {
        self.events.push(event);
    }

    /// Events collected so far, oldest first
    pub fn events(&self) -> &[RendererEvent] {
        &self.events
    }

    /// Drain every collected event in emission order
    pub fn take_events(&mut self) -> Vec<RendererEvent> {
        std::mem::take(&mut self.events)
    }
}
