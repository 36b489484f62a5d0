//! Shared pre/post-processing for concrete detector backends.
//!
//! Detector models run on a fixed square input; these helpers perform the
//! letterbox resize into that space and map predicted boxes back into
//! original image coordinates.

use docscan_core::{clahe, luma_from_rgb};
use image::{imageops, RgbImage};

use crate::bbox::Rect;

/// Boxes smaller than this on either side after back-mapping are noise.
pub const MIN_BOX_SIDE: f32 = 5.0;

/// Geometry of a letterbox resize: uniform scale plus centering padding.
#[derive(Clone, Copy, Debug)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub size: u32,
}

impl Letterbox {
    /// Map a detector-space rectangle back into original image
    /// coordinates: remove the padding, undo the scale, clamp to bounds.
    /// Returns `None` for boxes that collapse below [`MIN_BOX_SIDE`].
    pub fn unmap_rect(&self, rect: Rect, orig_w: u32, orig_h: u32) -> Option<Rect> {
        let r = Rect::new(
            (rect.x1 - self.pad_x as f32) / self.scale,
            (rect.y1 - self.pad_y as f32) / self.scale,
            (rect.x2 - self.pad_x as f32) / self.scale,
            (rect.y2 - self.pad_y as f32) / self.scale,
        )
        .clamp_to(orig_w, orig_h);

        if r.width() < MIN_BOX_SIDE || r.height() < MIN_BOX_SIDE {
            return None;
        }
        Some(r)
    }
}

/// Aspect-preserving resize onto a black square canvas of `target_size`.
pub fn letterbox_resize(img: &RgbImage, target_size: u32) -> (RgbImage, Letterbox) {
    let (w, h) = (img.width().max(1), img.height().max(1));
    let scale = (target_size as f32 / w as f32).min(target_size as f32 / h as f32);
    let new_w = ((w as f32 * scale) as u32).max(1);
    let new_h = ((h as f32 * scale) as u32).max(1);

    let resized = imageops::resize(img, new_w, new_h, imageops::FilterType::Triangle);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let mut canvas = RgbImage::new(target_size, target_size);
    imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    (
        canvas,
        Letterbox {
            scale,
            pad_x,
            pad_y,
            size: target_size,
        },
    )
}

/// Luminance-only contrast enhancement.
///
/// Equalizes the luma plane with CLAHE and rescales each RGB pixel by the
/// resulting luminance gain, leaving chroma ratios untouched.
pub fn enhance_contrast(img: &RgbImage) -> RgbImage {
    let luma = luma_from_rgb(img);
    let equalized = clahe(&luma.view(), 2.0, (8, 8));

    let mut out = img.clone();
    for (i, p) in out.pixels_mut().enumerate() {
        let before = luma.data[i].max(1) as f32;
        let after = equalized.data[i] as f32;
        let gain = after / before;
        for c in 0..3 {
            p.0[c] = (p.0[c] as f32 * gain).clamp(0.0, 255.0) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letterbox_centers_landscape_input() {
        let img = RgbImage::from_pixel(200, 100, image::Rgb([10, 20, 30]));
        let (canvas, lb) = letterbox_resize(&img, 640);

        assert_eq!(canvas.width(), 640);
        assert_eq!(canvas.height(), 640);
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 160);
        assert!((lb.scale - 3.2).abs() < 1e-6);
        // Padding stays black, content area does not.
        assert_eq!(canvas.get_pixel(320, 10).0, [0, 0, 0]);
        assert_eq!(canvas.get_pixel(320, 320).0, [10, 20, 30]);
    }

    #[test]
    fn unmap_round_trips_within_a_pixel() {
        let lb = Letterbox {
            scale: 3.2,
            pad_x: 0,
            pad_y: 160,
            size: 640,
        };
        // A box covering x in [32, 96], y in [16, 48] of the 200x100 original.
        let detector_space = Rect::new(
            32.0 * 3.2,
            16.0 * 3.2 + 160.0,
            96.0 * 3.2,
            48.0 * 3.2 + 160.0,
        );
        let back = lb.unmap_rect(detector_space, 200, 100).expect("box");
        assert!((back.x1 - 32.0).abs() < 1.0);
        assert!((back.y1 - 16.0).abs() < 1.0);
        assert!((back.x2 - 96.0).abs() < 1.0);
        assert!((back.y2 - 48.0).abs() < 1.0);
    }

    #[test]
    fn tiny_boxes_are_rejected() {
        let lb = Letterbox {
            scale: 1.0,
            pad_x: 0,
            pad_y: 0,
            size: 640,
        };
        assert!(lb.unmap_rect(Rect::new(10.0, 10.0, 13.0, 40.0), 640, 640).is_none());
    }

    #[test]
    fn enhancement_preserves_dimensions() {
        let img = RgbImage::from_pixel(64, 48, image::Rgb([100, 110, 120]));
        let out = enhance_contrast(&img);
        assert_eq!(out.dimensions(), img.dimensions());
    }
}
