/// Per-display configuration and display buffer bookkeeping

pub mod display_config;
pub mod display_setup;

pub use display_config::*;
pub use display_setup::*;
