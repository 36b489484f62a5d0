//! Shared synthetic images for unit tests.

use image::GrayImage;

/// Deterministic block-noise image: dense in FAST corners and free of the
/// repeated structure that would confuse the ratio test.
pub(crate) fn block_noise(w: u32, h: u32, seed: u64) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    let mut state = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    let cell = 12u32;
    let cols = w.div_ceil(cell);
    let rows = h.div_ceil(cell);
    let shades: Vec<u8> = (0..cols * rows).map(|_| (next() % 256) as u8).collect();

    for y in 0..h {
        for x in 0..w {
            let idx = (y / cell) * cols + (x / cell);
            img.put_pixel(x, y, image::Luma([shades[idx as usize]]));
        }
    }
    img
}
