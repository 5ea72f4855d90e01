use std::sync::Arc;

use crate::assets::source::{SourceImage, SpriteSheet};
use crate::foundation::core::{PoseIndex, Rect};
use crate::geometry::placement::{TransformState, placement_for};
use crate::render::frame::FrameBuffer;
use crate::render::surface::Surface;

/// Draw the source image for `pose`, then that pose's sprite cell over the full frame.
///
/// Does not clear `surface` first.
pub fn compose_pose(
    surface: &mut Surface,
    pose: PoseIndex,
    transform: &TransformState,
    source: &SourceImage,
    sprite: &SpriteSheet,
) {
    let placement = placement_for(pose, transform);
    if placement.is_drawable() {
        surface.draw_image(source.image(), placement.to_rect());
    }
    let side = f64::from(sprite.frame_size());
    surface.draw_image_region(
        sprite.image(),
        sprite.cell_rect(pose),
        Rect::new(0.0, 0.0, side, side),
    );
}

/// Clear `surface` and draw one pose on it.
pub fn draw_pose(
    surface: &mut Surface,
    pose: PoseIndex,
    transform: &TransformState,
    source: &SourceImage,
    sprite: &SpriteSheet,
) {
    surface.clear();
    compose_pose(surface, pose, transform, source, sprite);
}

/// Something that can show the pose held in a [`TransformState`].
pub trait PoseTarget {
    /// Render `transform.current_pose`.
    fn render_pose(&mut self, transform: &TransformState);
}

/// Owns the interactive display surface and draws poses onto it.
#[derive(Debug)]
pub struct PreviewRenderer {
    surface: Surface,
    source: Arc<SourceImage>,
    sprite: Arc<SpriteSheet>,
    frames_drawn: u64,
}

impl PreviewRenderer {
    /// A renderer with a display surface sized to one sprite cell.
    pub fn new(source: Arc<SourceImage>, sprite: Arc<SpriteSheet>) -> Self {
        let side = sprite.frame_size();
        Self {
            surface: Surface::new(side, side),
            source,
            sprite,
            frames_drawn: 0,
        }
    }

    /// Swap in a newly loaded source image. The next render picks it up.
    pub fn set_source(&mut self, source: Arc<SourceImage>) {
        self.source = source;
    }

    /// The display surface as last drawn.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Copy of the displayed pixels.
    pub fn snapshot(&self) -> FrameBuffer {
        self.surface.image_data()
    }

    /// How many times a pose has been drawn.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

impl PoseTarget for PreviewRenderer {
    fn render_pose(&mut self, transform: &TransformState) {
        draw_pose(
            &mut self.surface,
            transform.current_pose,
            transform,
            &self.source,
            &self.sprite,
        );
        self.frames_drawn += 1;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/preview.rs"]
mod tests;
