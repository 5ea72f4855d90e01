use image::RgbaImage;

use crate::foundation::math::{mul_div255_u8, unpremul_u8};

pub type StraightRgba8 = [u8; 4];
pub type PremulRgba8 = [u8; 4];

pub fn premul(px: StraightRgba8) -> PremulRgba8 {
    let a = u16::from(px[3]);
    [
        mul_div255_u8(u16::from(px[0]), a),
        mul_div255_u8(u16::from(px[1]), a),
        mul_div255_u8(u16::from(px[2]), a),
        px[3],
    ]
}

pub fn unpremul(px: PremulRgba8) -> StraightRgba8 {
    let a = px[3];
    if a == 0 {
        return [0, 0, 0, 0];
    }
    [
        unpremul_u8(px[0], a),
        unpremul_u8(px[1], a),
        unpremul_u8(px[2], a),
        a,
    ]
}

pub fn over_premul(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255_u8(u16::from(dst[i]), inv));
    }
    out
}

/// Source-over for straight-alpha pixels.
pub fn over(dst: StraightRgba8, src: StraightRgba8) -> StraightRgba8 {
    match (dst[3], src[3]) {
        (_, 0) => dst,
        (0, _) | (_, 255) => src,
        _ => unpremul(over_premul(premul(dst), premul(src))),
    }
}

/// Composite `src` over `dst` with its top-left corner at `(x, y)`, clipped to `dst`.
pub fn blit_over(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));
    let (sw, sh) = (i64::from(src.width()), i64::from(src.height()));

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + sw).min(dw);
    let y1 = (y + sh).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for dy in y0..y1 {
        for dx in x0..x1 {
            let s = src.get_pixel((dx - x) as u32, (dy - y) as u32).0;
            let d = dst.get_pixel_mut(dx as u32, dy as u32);
            d.0 = over(d.0, s);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
