use docscan_core::{clahe, gaussian_blur3, luma_from_rgb};
use image::RgbImage;

/// CLAHE clip factor, OpenCV convention.
const CLAHE_CLIP: f32 = 2.0;
/// CLAHE tile grid.
const CLAHE_GRID: (usize, usize) = (8, 8);

/// Feature-detection preprocessing: grayscale, local contrast
/// equalization, then a light blur to knock down sensor noise.
pub fn enhance(img: &RgbImage) -> image::GrayImage {
    let gray = luma_from_rgb(img);
    let equalized = clahe(&gray.view(), CLAHE_CLIP, CLAHE_GRID);
    gaussian_blur3(&equalized.view()).to_luma8()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dimensions_match_input() {
        let img = RgbImage::new(123, 77);
        let out = enhance(&img);
        assert_eq!(out.width(), 123);
        assert_eq!(out.height(), 77);
    }

    #[test]
    fn enhancement_widens_low_contrast_range() {
        let mut img = RgbImage::new(128, 128);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let v = 110 + ((x / 8 + y / 8) % 12) as u8;
            p.0 = [v, v, v];
        }
        let out = enhance(&img);
        let min = out.pixels().map(|p| p.0[0]).min().unwrap();
        let max = out.pixels().map(|p| p.0[0]).max().unwrap();
        assert!(max - min > 40, "range {} too narrow", max - min);
    }
}
