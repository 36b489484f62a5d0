use docscan_core::luma_from_rgb;
use image::{imageops, RgbImage};

/// Structural similarity proxy between the template and a warped scan.
///
/// Both images are brought to the common minimal shared size and compared
/// in grayscale: normalized cross-correlation times one minus the
/// normalized mean-squared error, clamped to `[0, 1]`. This is
/// independent of the RANSAC statistics and catches warps that succeed
/// numerically but are visually degenerate.
pub fn quality_score(base: &RgbImage, aligned: &RgbImage) -> f64 {
    let w = base.width().min(aligned.width());
    let h = base.height().min(aligned.height());
    if w == 0 || h == 0 {
        return 0.0;
    }

    let a = resized_gray(base, w, h);
    let b = resized_gray(aligned, w, h);

    let mut dot = 0.0f64;
    let mut energy_a = 0.0f64;
    let mut energy_b = 0.0f64;
    let mut sq_err = 0.0f64;
    for (pa, pb) in a.pixels().zip(b.pixels()) {
        let va = pa.0[0] as f64;
        let vb = pb.0[0] as f64;
        dot += va * vb;
        energy_a += va * va;
        energy_b += vb * vb;
        let d = va - vb;
        sq_err += d * d;
    }

    let norm = (energy_a * energy_b).sqrt();
    if norm < 1e-12 {
        return 0.0;
    }
    let correlation = dot / norm;

    let n = (w * h) as f64;
    let mse = sq_err / n / (255.0 * 255.0);

    (correlation * (1.0 - mse)).clamp(0.0, 1.0)
}

fn resized_gray(img: &RgbImage, w: u32, h: u32) -> image::GrayImage {
    let gray = luma_from_rgb(img).to_luma8();
    if gray.width() == w && gray.height() == h {
        gray
    } else {
        imageops::resize(&gray, w, h, imageops::FilterType::Triangle)
    }
}
