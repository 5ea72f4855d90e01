use image::{RgbaImage, imageops::FilterType};

use crate::foundation::core::Rect;
use crate::foundation::error::{PetError, PetResult};
use crate::render::composite::{blit_over, over};
use crate::render::frame::FrameBuffer;

/// A 2D raster drawing target with canvas-like primitives.
///
/// Coordinates are snapped to whole pixels. Rectangles that are empty, negative, or
/// non-finite draw nothing.
#[derive(Clone, Debug)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// A transparent surface of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    /// Surface width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Surface height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Bounds of the whole surface.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width()), f64::from(self.height()))
    }

    /// Borrow the pixels.
    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Reset the pixels inside `rect` to transparent.
    pub fn clear_rect(&mut self, rect: Rect) {
        self.write_rect(rect, |_| [0, 0, 0, 0]);
    }

    /// Paint `rect` with a colour using source-over.
    pub fn fill_rect(&mut self, rect: Rect, rgba: [u8; 4]) {
        self.write_rect(rect, |dst| over(dst, rgba));
    }

    /// Draw all of `image` scaled into `dst`.
    pub fn draw_image(&mut self, image: &RgbaImage, dst: Rect) {
        let Some((x, y, w, h)) = snap(dst) else {
            return;
        };
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        if w == image.width() && h == image.height() {
            blit_over(&mut self.pixels, image, x, y);
        } else if w <= image.width() && h <= image.height() {
            let scaled = image::imageops::resize(image, w, h, FilterType::Triangle);
            blit_over(&mut self.pixels, &scaled, x, y);
        } else {
            self.draw_image_sampled(image, x, y, w, h);
        }
    }

    /// Bilinear upscale of `image` into `(x, y, w, h)`, evaluated only for pixels on the surface.
    fn draw_image_sampled(&mut self, image: &RgbaImage, x: i64, y: i64, w: u32, h: u32) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(i64::from(w)).min(i64::from(self.width()));
        let y1 = y.saturating_add(i64::from(h)).min(i64::from(self.height()));
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let step_x = f64::from(image.width()) / f64::from(w);
        let step_y = f64::from(image.height()) / f64::from(h);
        for py in y0..y1 {
            let v = ((py - y) as f64 + 0.5) * step_y - 0.5;
            for px in x0..x1 {
                let u = ((px - x) as f64 + 0.5) * step_x - 0.5;
                let src = sample_bilinear(image, u, v);
                let dst = self.pixels.get_pixel_mut(px as u32, py as u32);
                dst.0 = over(dst.0, src);
            }
        }
    }

    /// Draw the `src` region of `image` scaled into `dst`.
    ///
    /// The source region is clipped to the image; nothing is drawn if the clip is empty.
    pub fn draw_image_region(&mut self, image: &RgbaImage, src: Rect, dst: Rect) {
        let bounds = Rect::new(0.0, 0.0, f64::from(image.width()), f64::from(image.height()));
        let Some((sx, sy, sw, sh)) = snap(src.intersect(bounds)) else {
            return;
        };
        if sx == 0 && sy == 0 && sw == image.width() && sh == image.height() {
            self.draw_image(image, dst);
            return;
        }
        let region = image::imageops::crop_imm(image, sx as u32, sy as u32, sw, sh).to_image();
        self.draw_image(&region, dst);
    }

    /// Draw another surface 1:1 with its top-left corner at `(x, y)`.
    pub fn draw_surface(&mut self, other: &Surface, x: i64, y: i64) {
        blit_over(&mut self.pixels, &other.pixels, x, y);
    }

    /// Copy out the raw pixels.
    pub fn image_data(&self) -> FrameBuffer {
        FrameBuffer::from(self.pixels.clone())
    }

    /// Overwrite pixels with `frame` (no blending), top-left at the origin.
    pub fn put_image_data(&mut self, frame: &FrameBuffer) -> PetResult<()> {
        if frame.width != self.width() || frame.height != self.height() {
            return Err(PetError::validation(format!(
                "image data is {}x{}, surface is {}x{}",
                frame.width,
                frame.height,
                self.width(),
                self.height()
            )));
        }
        if frame.data.len() != self.pixels.as_raw().len() {
            return Err(PetError::validation("image data length mismatch"));
        }
        let raw: &mut [u8] = &mut self.pixels;
        raw.copy_from_slice(&frame.data);
        Ok(())
    }

    fn write_rect(&mut self, rect: Rect, mut f: impl FnMut([u8; 4]) -> [u8; 4]) {
        let Some((x, y, w, h)) = snap(rect.intersect(self.bounds())) else {
            return;
        };
        for py in y as u32..y as u32 + h {
            for px in x as u32..x as u32 + w {
                let p = self.pixels.get_pixel_mut(px, py);
                p.0 = f(p.0);
            }
        }
    }
}

/// Round a rect to whole pixels as `(x, y, width, height)`, or `None` if it covers nothing.
fn snap(rect: Rect) -> Option<(i64, i64, u32, u32)> {
    let coords = [rect.x0, rect.y0, rect.x1, rect.y1];
    if coords.iter().any(|c| !c.is_finite()) || rect.x1 <= rect.x0 || rect.y1 <= rect.y0 {
        return None;
    }
    let x = rect.x0.round() as i64;
    let y = rect.y0.round() as i64;
    let w = (rect.x1.round() as i64 - x).clamp(0, i64::from(u32::MAX)) as u32;
    let h = (rect.y1.round() as i64 - y).clamp(0, i64::from(u32::MAX)) as u32;
    if w == 0 || h == 0 {
        return None;
    }
    Some((x, y, w, h))
}

/// Straight-alpha bilinear sample at continuous pixel coordinates, clamped to the edges.
fn sample_bilinear(image: &RgbaImage, u: f64, v: f64) -> [u8; 4] {
    let (max_x, max_y) = (image.width() - 1, image.height() - 1);
    let u = u.clamp(0.0, f64::from(max_x));
    let v = v.clamp(0.0, f64::from(max_y));
    let (x0, y0) = (u.floor() as u32, v.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(max_x), (y0 + 1).min(max_y));
    let (fx, fy) = (u - f64::from(x0), v - f64::from(y0));

    let [a, b, c, d] = [(x0, y0), (x1, y0), (x0, y1), (x1, y1)].map(|(x, y)| image.get_pixel(x, y).0);
    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = f64::from(a[i]) * (1.0 - fx) + f64::from(b[i]) * fx;
        let bottom = f64::from(c[i]) * (1.0 - fx) + f64::from(d[i]) * fx;
        out[i] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
