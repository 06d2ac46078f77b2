/// Counters reported by the `LogStatistics` command.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStatistics {
    pub resources_uploaded: u64,
    pub resources_unloaded: u64,
    pub upload_failures: u64,
    pub effects_compiled_async: u64,
    pub bytes_uploaded: u64,
    /// Upload passes cut short by the frame budget
    pub upload_passes_interrupted: u64,
    pub scene_resource_actions_applied: u64,
}

impl fmt::Display for ResourceStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uploaded {} ({} bytes), unloaded {}, failed {}, async effects {}, interrupted passes {}, scene actions {}",
            self.resources_uploaded,
            self.bytes_uploaded,
            self.resources_unloaded,
            self.upload_failures,
            self.effects_compiled_async,
            self.upload_passes_interrupted,
            self.scene_resource_actions_applied,
        )
    }
}
