use image::RgbImage;

use crate::detection::Detection;

/// Outline colors keyed by position rank.
const RANK_COLORS: [[u8; 3]; 3] = [
    [0, 255, 0],   // rank 0
    [255, 165, 0], // rank 1
    [80, 165, 255],
];

const OUTLINE: u32 = 2;

/// Draw detection rectangles onto an image, colored by position rank.
/// Debug aid only; the pipeline never mutates caller images.
pub fn draw_detections(img: &mut RgbImage, detections: &[Detection]) {
    for det in detections {
        let rect = det.rect().clamp_to(img.width(), img.height());
        let color = RANK_COLORS[det.position_rank % RANK_COLORS.len()];

        let x1 = rect.x1 as u32;
        let y1 = rect.y1 as u32;
        let x2 = (rect.x2 as u32).min(img.width().saturating_sub(1));
        let y2 = (rect.y2 as u32).min(img.height().saturating_sub(1));

        for t in 0..OUTLINE {
            for x in x1..=x2 {
                put(img, x, y1 + t, color);
                put(img, x, y2.saturating_sub(t), color);
            }
            for y in y1..=y2 {
                put(img, x1 + t, y, color);
                put(img, x2.saturating_sub(t), y, color);
            }
        }
    }
}

#[inline]
fn put(img: &mut RgbImage, x: u32, y: u32, color: [u8; 3]) {
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, image::Rgb(color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::{BBox, Rect};

    #[test]
    fn outlines_touch_the_box_border() {
        let mut img = RgbImage::new(100, 100);
        let det = Detection::new("id", BBox::Rect(Rect::new(10.0, 10.0, 50.0, 40.0)), 0.9);
        draw_detections(&mut img, &[det]);

        assert_eq!(img.get_pixel(10, 10).0, RANK_COLORS[0]);
        assert_eq!(img.get_pixel(30, 10).0, RANK_COLORS[0]);
        assert_eq!(img.get_pixel(50, 40).0, RANK_COLORS[0]);
        // Interior stays untouched.
        assert_eq!(img.get_pixel(30, 25).0, [0, 0, 0]);
    }
}
