use crate::render::frame::FrameBuffer;

/// Highest green value a foreground pixel may keep.
pub const GREEN_CEILING: u8 = 250;
/// Alpha values above this become opaque, the rest fully transparent.
pub const ALPHA_THRESHOLD: u8 = 127;

/// Prepare a frame for palette encoding with a hard chroma-key cutout.
///
/// Greens above [`GREEN_CEILING`] are capped so foreground pixels never match the key, and
/// alpha is collapsed to 0 or 255. Idempotent.
pub fn optimize(frame: &mut FrameBuffer) {
    optimize_rgba8(&mut frame.data);
}

/// [`optimize`] over raw RGBA8 bytes. Trailing bytes that do not form a pixel are left alone.
pub fn optimize_rgba8(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        px[1] = px[1].min(GREEN_CEILING);
        px[3] = if px[3] > ALPHA_THRESHOLD { 255 } else { 0 };
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/chroma.rs"]
mod tests;
