use image::{imageops, RgbImage};

use crate::AlignError;

/// An image rescaled so its longest side equals the target dimension,
/// together with the applied scale. Scoped to a single `align` call.
#[derive(Clone, Debug)]
pub struct NormalizedImage {
    pub image: RgbImage,
    /// `target_dimension / max(width, height)` of the source.
    pub scale: f64,
}

/// Aspect-preserving resize onto the shared working resolution.
pub fn normalize(img: &RgbImage, target_dimension: u32) -> Result<NormalizedImage, AlignError> {
    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 || target_dimension == 0 {
        return Err(AlignError::InvalidInput {
            width: w,
            height: h,
        });
    }

    let scale = target_dimension as f64 / w.max(h) as f64;
    let new_w = ((w as f64 * scale) as u32).max(1);
    let new_h = ((h as f64 * scale) as u32).max(1);
    let image = imageops::resize(img, new_w, new_h, imageops::FilterType::Triangle);

    Ok(NormalizedImage { image, scale })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_side_hits_target() {
        let img = RgbImage::new(400, 300);
        let n = normalize(&img, 800).expect("normalize");
        assert_eq!(n.image.width(), 800);
        assert_eq!(n.image.height(), 600);
        assert!((n.scale - 2.0).abs() < 1e-9);
    }

    #[test]
    fn portrait_orientation_preserved() {
        let img = RgbImage::new(300, 1200);
        let n = normalize(&img, 800).expect("normalize");
        assert_eq!(n.image.height(), 800);
        assert_eq!(n.image.width(), 200);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let img = RgbImage::new(0, 100);
        assert!(matches!(
            normalize(&img, 800),
            Err(AlignError::InvalidInput { .. })
        ));
    }
}
