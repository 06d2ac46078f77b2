/// Logical identifiers used across the pipeline.
///
/// These are chosen by the client side and are stable for the lifetime of
/// the object they name. Device-side handles live in `graphics_device`.

use std::fmt;

macro_rules! logical_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

logical_handle!(
    /// Identity of a published scene
    SceneId, "scene:"
);

logical_handle!(
    /// Identity of a display (one graphics device each)
    DisplayHandle, "display:"
);

logical_handle!(
    /// Identity of an offscreen buffer within a display
    OffscreenBufferHandle, "obuffer:"
);

logical_handle!(
    /// Scene-local handle of a render buffer, render target, data buffer, ...
    SceneResourceHandle, "h"
);

logical_handle!(
    /// Identity of a data slot inside a scene (link endpoint)
    DataSlotId, "slot:"
);
