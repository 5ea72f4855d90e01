/// Per-pose placement of the source image.
pub mod placement;
