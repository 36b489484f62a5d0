/// Borrowed row-major grayscale buffer.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

/// Owned row-major grayscale buffer.
#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    /// Adapt an `image::GrayImage` without copying pixel semantics.
    pub fn from_luma8(img: &image::GrayImage) -> Self {
        Self {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().clone(),
        }
    }

    /// Convert into an `image::GrayImage` for ecosystem interop (resizing,
    /// encoding). Returns a black 1x1 image if the buffer is inconsistent.
    pub fn to_luma8(&self) -> image::GrayImage {
        image::GrayImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .unwrap_or_else(|| image::GrayImage::new(1, 1))
    }
}

/// BT.601 luma conversion from an RGB buffer.
pub fn luma_from_rgb(img: &image::RgbImage) -> GrayImage {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let mut data = Vec::with_capacity(width * height);
    for p in img.pixels() {
        let [r, g, b] = p.0;
        let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        data.push(y.round().clamp(0.0, 255.0) as u8);
    }
    GrayImage {
        width,
        height,
        data,
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
fn get_gray_clamped(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    let x = x.clamp(0, src.width as i32 - 1);
    let y = y.clamp(0, src.height as i32 - 1);
    src.data[y as usize * src.width + x as usize]
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).clamp(0.0, 255.0) as u8
}

/// Variance of the 4-neighbor Laplacian response over interior pixels.
///
/// Higher values mean sharper images; uniform or heavily blurred inputs
/// score near zero.
pub fn laplacian_variance(src: &GrayImageView<'_>) -> f64 {
    if src.width < 3 || src.height < 3 {
        return 0.0;
    }

    let w = src.width;
    let n = ((src.width - 2) * (src.height - 2)) as f64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;

    for y in 1..src.height - 1 {
        for x in 1..w - 1 {
            let c = src.data[y * w + x] as f64;
            let r = src.data[y * w + x + 1] as f64
                + src.data[y * w + x - 1] as f64
                + src.data[(y + 1) * w + x] as f64
                + src.data[(y - 1) * w + x] as f64
                - 4.0 * c;
            sum += r;
            sum_sq += r * r;
        }
    }

    let mean = sum / n;
    (sum_sq / n) - mean * mean
}

/// 3x3 Gaussian blur (kernel 1-2-1, replicated borders).
pub fn gaussian_blur3(src: &GrayImageView<'_>) -> GrayImage {
    let w = src.width as i32;
    let h = src.height as i32;
    let mut tmp = vec![0u16; src.width * src.height];
    let mut out = GrayImage::new(src.width, src.height);

    // Horizontal pass, values scaled by 4.
    for y in 0..h {
        for x in 0..w {
            let v = get_gray_clamped(src, x - 1, y) as u16
                + 2 * get_gray_clamped(src, x, y) as u16
                + get_gray_clamped(src, x + 1, y) as u16;
            tmp[y as usize * src.width + x as usize] = v;
        }
    }

    // Vertical pass, total scale 16.
    for y in 0..h {
        for x in 0..w {
            let at = |yy: i32| {
                let yy = yy.clamp(0, h - 1);
                tmp[yy as usize * src.width + x as usize] as u32
            };
            let v = at(y - 1) + 2 * at(y) + at(y + 1);
            out.data[y as usize * src.width + x as usize] = ((v + 8) / 16).min(255) as u8;
        }
    }

    out
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is divided into a `grid.0 x grid.1` tile grid; each tile gets a
/// clipped-histogram equalization lookup table, and every output pixel blends
/// the four nearest tile tables bilinearly. `clip_limit` is the histogram
/// clip factor relative to a uniform distribution (OpenCV convention).
pub fn clahe(src: &GrayImageView<'_>, clip_limit: f32, grid: (usize, usize)) -> GrayImage {
    let (gx, gy) = grid;
    if src.width == 0 || src.height == 0 || gx == 0 || gy == 0 {
        return GrayImage::new(src.width, src.height);
    }

    let tile_w = src.width.div_ceil(gx);
    let tile_h = src.height.div_ceil(gy);

    // Per-tile equalization LUTs.
    let mut luts = vec![[0u8; 256]; gx * gy];
    for ty in 0..gy {
        for tx in 0..gx {
            let x0 = (tx * tile_w).min(src.width);
            let y0 = (ty * tile_h).min(src.height);
            let x1 = (x0 + tile_w).min(src.width);
            let y1 = (y0 + tile_h).min(src.height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[src.data[y * src.width + x] as usize] += 1;
                }
            }

            let pixels = ((x1 - x0) * (y1 - y0)) as u32;
            if pixels == 0 {
                continue;
            }

            let limit = ((clip_limit * pixels as f32 / 256.0) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > limit {
                    excess += *bin - limit;
                    *bin = limit;
                }
            }
            let bonus = excess / 256;
            let mut residual = (excess % 256) as usize;
            for bin in hist.iter_mut() {
                *bin += bonus;
                if residual > 0 {
                    *bin += 1;
                    residual -= 1;
                }
            }

            let lut = &mut luts[ty * gx + tx];
            let mut cdf = 0u32;
            for (v, bin) in hist.iter().enumerate() {
                cdf += *bin;
                lut[v] = ((cdf as u64 * 255) / pixels as u64) as u8;
            }
        }
    }

    // Bilinear blend of the four surrounding tile tables. Clamping both
    // neighbor indices before weighting keeps border pixels on their own
    // tile's table.
    let clamp_pair = |f: f32, n: usize| -> (usize, usize, f32) {
        let f0 = f.floor();
        let i0 = (f0.max(0.0) as usize).min(n - 1);
        let i1 = (((f0 + 1.0).max(0.0)) as usize).min(n - 1);
        (i0, i1, f - f0)
    };

    let mut out = GrayImage::new(src.width, src.height);
    for y in 0..src.height {
        let fy = (y as f32 + 0.5 - tile_h as f32 / 2.0) / tile_h as f32;
        let (ty0, ty1, wy) = clamp_pair(fy, gy);

        for x in 0..src.width {
            let fx = (x as f32 + 0.5 - tile_w as f32 / 2.0) / tile_w as f32;
            let (tx0, tx1, wx) = clamp_pair(fx, gx);

            let v = src.data[y * src.width + x] as usize;
            let p00 = luts[ty0 * gx + tx0][v] as f32;
            let p10 = luts[ty0 * gx + tx1][v] as f32;
            let p01 = luts[ty1 * gx + tx0][v] as f32;
            let p11 = luts[ty1 * gx + tx1][v] as f32;

            let top = p00 + wx * (p10 - p00);
            let bottom = p01 + wx * (p11 - p01);
            out.data[y * src.width + x] = (top + wy * (bottom - top)).round() as u8;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(w: usize, h: usize, cell: usize) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                if ((x / cell) + (y / cell)) % 2 == 0 {
                    img.data[y * w + x] = 220;
                } else {
                    img.data[y * w + x] = 30;
                }
            }
        }
        img
    }

    #[test]
    fn bilinear_interpolates_midpoints() {
        let img = GrayImage {
            width: 2,
            height: 2,
            data: vec![0, 100, 100, 200],
        };
        let v = sample_bilinear(&img.view(), 0.5, 0.5);
        assert!((v - 100.0).abs() < 1e-3);
    }

    #[test]
    fn laplacian_variance_ranks_sharpness() {
        let sharp = checkerboard(64, 64, 4);
        let blurred = gaussian_blur3(&gaussian_blur3(&sharp.view()).view());

        let v_sharp = laplacian_variance(&sharp.view());
        let v_blur = laplacian_variance(&blurred.view());
        assert!(v_sharp > v_blur);
        assert!(v_sharp > 0.0);
    }

    #[test]
    fn laplacian_variance_of_flat_image_is_zero() {
        let img = GrayImage {
            width: 16,
            height: 16,
            data: vec![128u8; 256],
        };
        assert_eq!(laplacian_variance(&img.view()), 0.0);
    }

    #[test]
    fn clahe_stretches_low_contrast() {
        let mut img = GrayImage::new(64, 64);
        for y in 0..64 {
            for x in 0..64 {
                // Narrow band around mid-gray.
                img.data[y * 64 + x] = 120 + ((x + y) % 16) as u8;
            }
        }
        let eq = clahe(&img.view(), 2.0, (8, 8));

        let spread = |d: &[u8]| {
            let min = *d.iter().min().unwrap() as i32;
            let max = *d.iter().max().unwrap() as i32;
            max - min
        };
        assert!(spread(&eq.data) > spread(&img.data));
    }

    #[test]
    fn luma_matches_gray_input() {
        let mut rgb = image::RgbImage::new(4, 4);
        for p in rgb.pixels_mut() {
            p.0 = [77, 77, 77];
        }
        let gray = luma_from_rgb(&rgb);
        assert!(gray.data.iter().all(|&v| v == 77));
    }
}
