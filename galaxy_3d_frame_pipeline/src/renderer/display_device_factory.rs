/// DisplayDeviceFactory trait - creates the graphics device of a display

use std::sync::{Arc, Mutex};
use crate::display::DisplayConfig;
use crate::error::Result;
use crate::graphics_device::GraphicsDevice;
use crate::handles::DisplayHandle;

/// Backend entry point used by `CreateDisplay`
///
/// Window and surface creation happen behind this trait.
pub trait DisplayDeviceFactory: Send {
    fn create_device(
        &mut self,
        display: DisplayHandle,
        config: &DisplayConfig,
    ) -> Result<Arc<Mutex<dyn GraphicsDevice>>>;
}
