use std::path::Path;

use anyhow::Context as _;
use image::{DynamicImage, RgbaImage, imageops::FilterType};

use crate::foundation::core::{POSE_COUNT, PoseIndex, Rect};
use crate::foundation::error::{PetError, PetResult};

/// A decoded user image, kept as a display-scaled copy.
///
/// The cached copy is `cache_size` wide with the natural aspect ratio preserved, which
/// keeps per-frame scaling cheap regardless of the upload size.
#[derive(Clone, Debug)]
pub struct SourceImage {
    cached: RgbaImage,
    natural_width: u32,
    natural_height: u32,
}

impl SourceImage {
    /// Build from an already decoded image.
    pub fn from_image(img: DynamicImage, cache_size: u32) -> PetResult<Self> {
        let (natural_width, natural_height) = (img.width(), img.height());
        if natural_width == 0 || natural_height == 0 {
            return Err(PetError::source_image("image has zero width or height"));
        }
        if cache_size == 0 {
            return Err(PetError::validation("cache_size must be non-zero"));
        }

        let ratio = f64::from(natural_height) / f64::from(natural_width);
        let cache_h = ((f64::from(cache_size) * ratio).round() as u32).max(1);
        let cached = image::imageops::resize(&img.to_rgba8(), cache_size, cache_h, FilterType::Triangle);
        tracing::debug!(
            natural_width,
            natural_height,
            cache_w = cache_size,
            cache_h,
            "prepared source image"
        );

        Ok(Self {
            cached,
            natural_width,
            natural_height,
        })
    }

    /// Decode encoded image bytes (PNG, JPEG, GIF, ...).
    pub fn decode(bytes: &[u8], cache_size: u32) -> PetResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| PetError::source_image(format!("decode image from memory: {e}")))?;
        Self::from_image(img, cache_size)
    }

    /// Read and decode an image file.
    pub fn open(path: &Path, cache_size: u32) -> PetResult<Self> {
        let img = image::open(path).map_err(|e| {
            PetError::source_image(format!("could not load image '{}': {e}", path.display()))
        })?;
        Self::from_image(img, cache_size)
    }

    /// `height / width` of the original image.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.natural_height) / f64::from(self.natural_width)
    }

    /// Original decoded dimensions.
    pub fn natural_size(&self) -> (u32, u32) {
        (self.natural_width, self.natural_height)
    }

    /// The display-scaled pixels that get drawn.
    pub fn image(&self) -> &RgbaImage {
        &self.cached
    }
}

/// Overlay animation: `POSE_COUNT` square cells of side `frame_size`, tiled left to right.
#[derive(Clone, Debug)]
pub struct SpriteSheet {
    image: RgbaImage,
    frame_size: u32,
}

impl SpriteSheet {
    /// Wrap a decoded sheet, checking that every pose cell fits.
    pub fn new(image: RgbaImage, frame_size: u32) -> PetResult<Self> {
        if frame_size == 0 {
            return Err(PetError::validation("sprite frame_size must be non-zero"));
        }
        let need_w = u64::from(frame_size) * POSE_COUNT as u64;
        if u64::from(image.width()) < need_w || image.height() < frame_size {
            return Err(PetError::validation(format!(
                "sprite sheet is {}x{}, need at least {need_w}x{frame_size} for {POSE_COUNT} poses",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image, frame_size })
    }

    /// Read and decode a sprite sheet file.
    pub fn open(path: &Path, frame_size: u32) -> PetResult<Self> {
        let img = image::open(path)
            .with_context(|| format!("load sprite sheet '{}'", path.display()))?;
        Self::new(img.to_rgba8(), frame_size)
    }

    /// Side of one cell.
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    /// The whole sheet.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Source rectangle of the cell for `pose`.
    pub fn cell_rect(&self, pose: PoseIndex) -> Rect {
        let side = f64::from(self.frame_size);
        let x0 = pose.get() as f64 * side;
        Rect::new(x0, 0.0, x0 + side, side)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
