/// Per-frame time budgeting

pub mod frame_timer;

pub use frame_timer::*;
