/// Graphics device module - the device-side collaborator interfaces

pub mod device_types;
pub mod graphics_device;

pub use device_types::*;
pub use graphics_device::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
