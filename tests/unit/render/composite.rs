use super::*;

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    assert_eq!(over(dst, [255, 255, 255, 0]), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    assert_eq!(over([0, 0, 0, 255], [255, 0, 0, 255]), [255, 0, 0, 255]);
}

#[test]
fn over_transparent_dst_keeps_src_color() {
    assert_eq!(over([0, 0, 0, 0], [200, 100, 50, 128]), [200, 100, 50, 128]);
}

#[test]
fn half_red_over_opaque_green() {
    let out = over([0, 255, 0, 255], [255, 0, 0, 128]);
    assert_eq!(out[3], 255);
    assert_eq!(out[0], 128);
    assert_eq!(out[1], 127);
    assert_eq!(out[2], 0);
}

#[test]
fn blit_clips_negative_and_overflowing_offsets() {
    let mut dst = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
    let src = RgbaImage::from_pixel(3, 3, image::Rgba([9, 9, 9, 255]));

    blit_over(&mut dst, &src, -2, 3);
    assert_eq!(dst.get_pixel(0, 3).0, [9, 9, 9, 255]);
    assert_eq!(dst.get_pixel(1, 3).0, [0, 0, 0, 255]);
    assert_eq!(dst.get_pixel(0, 2).0, [0, 0, 0, 255]);

    blit_over(&mut dst, &src, 10, 10);
    blit_over(&mut dst, &src, -3, 0);
    assert_eq!(dst.get_pixel(0, 0).0, [0, 0, 0, 255]);
}
