use crate::foundation::config::StudioConfig;
use crate::foundation::core::{POSE_COUNT, PoseIndex, Rect};

/// Where and how large to draw the source image for one pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Left edge in frame pixels.
    pub x: f64,
    /// Top edge in frame pixels.
    pub y: f64,
    /// Drawn width; may be zero or negative for tiny scales, which draws nothing.
    pub width: f64,
    /// Drawn height; may be zero or negative for tiny scales, which draws nothing.
    pub height: f64,
}

impl Placement {
    /// The destination rectangle in frame space.
    pub fn to_rect(self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Whether the placement covers any area at all.
    pub fn is_drawable(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.x.is_finite() && self.y.is_finite()
    }
}

/// Position, base size and scale of the source image, plus the pose on display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformState {
    /// Horizontal offset of the source image.
    pub offset_x: f64,
    /// Vertical offset of the source image.
    pub offset_y: f64,
    /// Unscaled width (the frame size).
    pub base_width: f64,
    /// Unscaled height (frame size times the source aspect ratio).
    pub base_height: f64,
    /// Multiplier applied to the base size before pose offsets.
    pub scale: f64,
    /// Pose currently shown by the preview.
    pub current_pose: PoseIndex,
}

impl Default for TransformState {
    fn default() -> Self {
        Self::from_config(&StudioConfig::default())
    }
}

impl TransformState {
    /// Seed a transform from configuration, assuming a square source until
    /// [`TransformState::set_aspect_ratio`] is called.
    pub fn from_config(cfg: &StudioConfig) -> Self {
        let side = f64::from(cfg.frame_size);
        Self {
            offset_x: cfg.offset_x,
            offset_y: cfg.offset_y,
            base_width: side,
            base_height: side,
            scale: cfg.scale,
            current_pose: PoseIndex::FIRST,
        }
    }

    /// Shift the image by whole pixels (arrow-key nudges).
    pub fn nudge(&mut self, dx: i32, dy: i32) {
        self.offset_x += f64::from(dx);
        self.offset_y += f64::from(dy);
    }

    /// Set the scale; non-finite or negative values are ignored.
    pub fn set_scale(&mut self, scale: f64) {
        if scale.is_finite() && scale >= 0.0 {
            self.scale = scale;
        }
    }

    /// Set the scale from a slider percentage (`87` means `0.87`).
    pub fn set_scale_percent(&mut self, percent: u32) {
        self.set_scale(f64::from(percent) / 100.0);
    }

    /// Fit the base height to a source image with `ratio = height / width`.
    pub fn set_aspect_ratio(&mut self, ratio: f64) {
        if ratio.is_finite() && ratio > 0.0 {
            self.base_height = self.base_width * ratio;
        }
    }

    /// Placement of the source image for `pose`.
    pub fn placement(&self, pose: PoseIndex) -> Placement {
        placement_for(pose, self)
    }
}

#[derive(Clone, Copy, Debug)]
struct PoseOffset {
    dx: f64,
    dy: f64,
    dw: f64,
    dh: f64,
}

impl PoseOffset {
    const fn new(dx: f64, dy: f64, dw: f64, dh: f64) -> Self {
        Self { dx, dy, dw, dh }
    }
}

// Pixel offsets layered on the scaled base size; they are never scaled themselves.
const POSE_OFFSETS: [PoseOffset; POSE_COUNT] = [
    PoseOffset::new(0.0, 0.0, 0.0, 0.0),
    PoseOffset::new(-4.0, 12.0, 4.0, -12.0),
    PoseOffset::new(-12.0, 18.0, 12.0, -18.0),
    PoseOffset::new(-4.0, 12.0, 4.0, -12.0),
    PoseOffset::new(-4.0, 0.0, 0.0, 0.0),
];

/// Compute where to draw the source image for `pose`.
///
/// Pure: identical inputs always yield identical placements. `current_pose` in
/// `transform` is not consulted.
pub fn placement_for(pose: PoseIndex, transform: &TransformState) -> Placement {
    let off = POSE_OFFSETS[pose.get()];
    Placement {
        x: transform.offset_x + off.dx,
        y: transform.offset_y + off.dy,
        width: transform.base_width * transform.scale + off.dw,
        height: transform.base_height * transform.scale + off.dh,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/placement.rs"]
mod tests;
