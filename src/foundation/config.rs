use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;

use crate::foundation::core::{CACHE_SIZE, CHROMA_KEY, FRAME_SIZE};
use crate::foundation::error::{PetError, PetResult};

/// User-tunable settings for previewing and exporting.
///
/// Every field has a default, so a JSON file only needs to name what it changes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Side of a sprite cell and of each exported frame, in pixels.
    pub frame_size: u32,
    /// Width of the display-scaled source image cache.
    pub cache_size: u32,
    /// Delay between frames in milliseconds.
    pub delay_ms: u32,
    /// Encoder worker count.
    pub worker_count: usize,
    /// Encoder quantizer speed, 1 (best) to 30 (fastest).
    pub quality: u8,
    /// Initial horizontal offset of the source image.
    pub offset_x: f64,
    /// Initial vertical offset of the source image.
    pub offset_y: f64,
    /// Initial scale applied to the source image base size.
    pub scale: f64,
    /// Background colour that becomes transparent in the exported GIF.
    pub chroma_key: [u8; 3],
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            frame_size: FRAME_SIZE,
            cache_size: CACHE_SIZE,
            delay_ms: 63,
            worker_count: 2,
            quality: 10,
            offset_x: 18.0,
            offset_y: 18.0,
            scale: 0.875,
            chroma_key: CHROMA_KEY,
        }
    }
}

impl StudioConfig {
    /// Load a JSON config file, filling missing fields with defaults.
    pub fn from_json_path(path: &Path) -> PetResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config JSON '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that the configuration can drive a preview and an export.
    pub fn validate(&self) -> PetResult<()> {
        if self.frame_size == 0 || self.frame_size > u32::from(u16::MAX) {
            return Err(PetError::validation(
                "frame_size must be in 1..=65535 (GIF dimensions are 16-bit)",
            ));
        }
        if self.cache_size == 0 {
            return Err(PetError::validation("cache_size must be non-zero"));
        }
        if self.delay_ms == 0 {
            return Err(PetError::validation("delay_ms must be non-zero"));
        }
        if self.worker_count == 0 {
            return Err(PetError::validation("worker_count must be >= 1"));
        }
        if !(1..=30).contains(&self.quality) {
            return Err(PetError::validation("quality must be in 1..=30"));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PetError::validation("scale must be finite and > 0"));
        }
        if !self.offset_x.is_finite() || !self.offset_y.is_finite() {
            return Err(PetError::validation("offsets must be finite"));
        }
        Ok(())
    }
}

/// Convert a frame rate into a timer delay, `round(1000 / fps)` milliseconds.
pub fn delay_ms_for_fps(fps: u32) -> PetResult<u32> {
    if fps == 0 {
        return Err(PetError::validation("fps must be non-zero"));
    }
    Ok((1000.0 / f64::from(fps)).round() as u32)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
