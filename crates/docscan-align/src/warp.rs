use docscan_core::Homography;
use image::RgbImage;
use nalgebra::Point2;

/// Warp an RGB source into a new `out_w x out_h` buffer.
///
/// `h_src_from_out` maps *output* pixel coordinates into *source* pixel
/// coordinates; samples outside the source come out black, which is what
/// the downstream padding crop expects.
pub fn warp_perspective_rgb(
    src: &RgbImage,
    h_src_from_out: &Homography,
    out_w: u32,
    out_h: u32,
) -> RgbImage {
    let mut out = RgbImage::new(out_w, out_h);

    for y in 0..out_h {
        for x in 0..out_w {
            let po = Point2::new(x as f32 + 0.5, y as f32 + 0.5);
            let ps = h_src_from_out.apply(po);
            let p = sample_bilinear_rgb(src, ps.x - 0.5, ps.y - 0.5);
            out.put_pixel(x, y, image::Rgb(p));
        }
    }

    out
}

#[inline]
fn get_rgb(src: &RgbImage, x: i32, y: i32) -> [f32; 3] {
    if x < 0 || y < 0 || x >= src.width() as i32 || y >= src.height() as i32 {
        return [0.0; 3];
    }
    let p = src.get_pixel(x as u32, y as u32).0;
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

#[inline]
fn sample_bilinear_rgb(src: &RgbImage, x: f32, y: f32) -> [u8; 3] {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = (a + fy * (b - a)).clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_warp_preserves_pixels() {
        let mut src = RgbImage::new(6, 5);
        for (x, y, p) in src.enumerate_pixels_mut() {
            p.0 = [(x * 40) as u8, (y * 50) as u8, 200];
        }
        let out = warp_perspective_rgb(&src, &Homography::identity(), 6, 5);
        assert_eq!(src.as_raw(), out.as_raw());
    }

    #[test]
    fn out_of_range_samples_are_black() {
        let src = RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));
        // Shift output far outside the source.
        let shift = Homography::from_array([[1.0, 0.0, 100.0], [0.0, 1.0, 100.0], [0.0, 0.0, 1.0]]);
        let out = warp_perspective_rgb(&src, &shift, 4, 4);
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
