//! Offscreen raster surfaces and the interactive preview.

pub(crate) mod composite;
/// Owned RGBA frame buffers.
pub mod frame;
/// Draws the current pose onto the display surface.
pub mod preview;
/// Drawable RGBA surfaces.
pub mod surface;
