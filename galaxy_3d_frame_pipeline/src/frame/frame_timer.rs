/// Wall-clock budget tracker for the work done in one frame.
///
/// The timer stores the instant the frame started and one budget per
/// section. A section is exceeded once the time elapsed since the frame
/// start reaches its budget; the check is re-evaluated on every call.

use std::time::{Duration, Instant};

/// Categories of per-frame work with independent budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTimerSection {
    /// Scene resource actions (render targets, data/texture buffers, ...)
    SceneResourcesUpload,
    /// Content-addressed client resources (buffers, textures, effects)
    ResourcesUpload,
    /// Scene action application
    SceneActionsApply,
    /// Rendering of interruptible offscreen buffers
    OffscreenBufferRender,
}

impl FrameTimerSection {
    /// Number of sections
    pub const COUNT: usize = 4;

    /// All sections, in the order used by `SetFrameTimerLimits`
    pub const ALL: [FrameTimerSection; Self::COUNT] = [
        FrameTimerSection::SceneResourcesUpload,
        FrameTimerSection::ResourcesUpload,
        FrameTimerSection::SceneActionsApply,
        FrameTimerSection::OffscreenBufferRender,
    ];

    fn index(self) -> usize {
        match self {
            FrameTimerSection::SceneResourcesUpload => 0,
            FrameTimerSection::ResourcesUpload => 1,
            FrameTimerSection::SceneActionsApply => 2,
            FrameTimerSection::OffscreenBufferRender => 3,
        }
    }
}

pub struct FrameTimer {
    frame_start: Instant,
    budgets: [Duration; FrameTimerSection::COUNT],
}

impl FrameTimer {
    /// Budget meaning "never preempt". Finite so that budget arithmetic
    /// cannot overflow.
    pub const INFINITE_BUDGET: Duration = Duration::from_secs(u32::MAX as u64);

    /// Create a timer with every section unlimited
    pub fn new() -> Self {
        Self {
            frame_start: Instant::now(),
            budgets: [Self::INFINITE_BUDGET; FrameTimerSection::COUNT],
        }
    }

    /// Mark the beginning of a new frame
    pub fn start_frame(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Set the budget of one section, in microseconds
    ///
    /// Values beyond `INFINITE_BUDGET` are clamped to it.
    pub fn set_section_time_budget(&mut self, section: FrameTimerSection, micros: u64) {
        self.budgets[section.index()] = Duration::from_micros(micros).min(Self::INFINITE_BUDGET);
    }

    /// Current budget of a section
    pub fn section_time_budget(&self, section: FrameTimerSection) -> Duration {
        self.budgets[section.index()]
    }

    /// True once the time spent in this frame reaches the section budget
    pub fn is_time_budget_exceeded_for_section(&self, section: FrameTimerSection) -> bool {
        self.frame_start.elapsed() >= self.budgets[section.index()]
    }

    /// Time elapsed since `start_frame`
    pub fn elapsed(&self) -> Duration {
        self.frame_start.elapsed()
    }

    /// Instant recorded by the last `start_frame`
    pub fn frame_start(&self) -> Instant {
        self.frame_start
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "frame_timer_tests.rs"]
mod tests;
