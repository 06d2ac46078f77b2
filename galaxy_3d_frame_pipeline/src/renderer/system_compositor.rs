/// SystemCompositorController trait - control of the platform compositor

/// Receives the `SystemCompositor` commands
///
/// Without a controller installed those commands only log a warning.
pub trait SystemCompositorController: Send {
    fn list_ivi_surfaces(&mut self);
    fn set_ivi_surface_visibility(&mut self, surface: u32, visible: bool);
    fn set_ivi_surface_opacity(&mut self, surface: u32, opacity: f32);
    fn set_ivi_surface_dest_rectangle(&mut self, surface: u32, x: i32, y: i32, width: u32, height: u32);
    fn set_ivi_layer_visibility(&mut self, layer: u32, visible: bool);
    fn add_ivi_surface_to_ivi_layer(&mut self, surface: u32, layer: u32);
    fn remove_ivi_surface_from_ivi_layer(&mut self, surface: u32, layer: u32);
    fn destroy_ivi_surface(&mut self, surface: u32);
    fn screenshot(&mut self, file_name: &str, screen: i32);
}
