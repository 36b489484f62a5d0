use image::{imageops, GrayImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::keypoint::{Descriptor, Feature, Keypoint};
use crate::pattern::ORB_PATTERN;

/// Detector parameters.
///
/// Defaults follow the usual ORB configuration for document photos:
/// 2000 features, 1.2x pyramid with 8 levels, FAST threshold 20 and a
/// 31 px patch/edge margin. Raise `max_features` (up to ~5000) for scans
/// where the default yield is too sparse.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrbParams {
    pub max_features: usize,
    pub fast_threshold: u8,
    pub pyramid_levels: u8,
    pub scale_factor: f32,
    /// Keypoints closer than this to a level border are discarded so the
    /// rotated descriptor pattern always samples valid pixels.
    pub edge_margin: u32,
}

impl Default for OrbParams {
    fn default() -> Self {
        Self {
            max_features: 2000,
            fast_threshold: 20,
            pyramid_levels: 8,
            scale_factor: 1.2,
            edge_margin: 31,
        }
    }
}

impl OrbParams {
    pub fn with_max_features(max_features: usize) -> Self {
        Self {
            max_features,
            ..Self::default()
        }
    }
}

/// Pyramid ORB detector: FAST-9 corners, intensity-centroid orientation,
/// rotated-BRIEF descriptors.
#[derive(Clone, Debug)]
pub struct OrbDetector {
    params: OrbParams,
}

// Offsets of the 16-pixel Bresenham circle used by FAST-9.
const FAST_CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

const NMS_RADIUS: f32 = 5.0;
const ORIENTATION_RADIUS: i32 = 15;

impl OrbDetector {
    pub fn new(params: OrbParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &OrbParams {
        &self.params
    }

    /// Detect up to `max_features` oriented keypoints with descriptors.
    ///
    /// Keypoint coordinates are expressed in the input (level-0) pixel
    /// space regardless of the pyramid level they were found on.
    pub fn detect(&self, img: &GrayImage) -> Vec<Feature> {
        let pyramid = self.build_pyramid(img);

        let mut features: Vec<Feature> = pyramid
            .par_iter()
            .enumerate()
            .flat_map(|(octave, (level, scale))| {
                self.extract_level(level, octave as u8, *scale)
            })
            .collect();

        features.sort_by(|a, b| {
            b.keypoint
                .response
                .partial_cmp(&a.keypoint.response)
                .unwrap_or(Ordering::Equal)
        });
        features.truncate(self.params.max_features);

        log::debug!(
            "orb: {} features across {} pyramid levels",
            features.len(),
            pyramid.len()
        );
        features
    }

    fn build_pyramid(&self, img: &GrayImage) -> Vec<(GrayImage, f32)> {
        let min_dim = 2 * self.params.edge_margin + 8;
        let mut pyramid = Vec::with_capacity(self.params.pyramid_levels as usize);
        pyramid.push((img.clone(), 1.0f32));

        let mut current = img.clone();
        let mut scale = 1.0f32;
        for _ in 1..self.params.pyramid_levels {
            let w = (current.width() as f32 / self.params.scale_factor) as u32;
            let h = (current.height() as f32 / self.params.scale_factor) as u32;
            if w < min_dim || h < min_dim {
                break;
            }
            scale *= self.params.scale_factor;
            current = imageops::resize(&current, w, h, imageops::FilterType::Triangle);
            pyramid.push((current.clone(), scale));
        }

        pyramid
    }

    fn extract_level(&self, img: &GrayImage, octave: u8, scale: f32) -> Vec<Feature> {
        let corners = self.detect_fast(img);
        let corners = suppress_grid(corners, self.params.max_features);

        corners
            .into_iter()
            .map(|mut kp| {
                kp.angle = orientation(img, kp.x as u32, kp.y as u32);
                kp.octave = octave;
                kp.scale = scale;
                let descriptor = self.describe(img, &kp);
                // lift level coordinates into the level-0 space
                kp.x *= scale;
                kp.y *= scale;
                Feature {
                    keypoint: kp,
                    descriptor,
                }
            })
            .collect()
    }

    fn detect_fast(&self, img: &GrayImage) -> Vec<Keypoint> {
        let margin = self.params.edge_margin.max(3);
        let (w, h) = (img.width(), img.height());
        if w <= 2 * margin || h <= 2 * margin {
            return Vec::new();
        }

        let mut corners = Vec::new();
        for y in margin..h - margin {
            for x in margin..w - margin {
                let center = img.get_pixel(x, y)[0];
                if !self.fast_pre_check(img, x, y, center) {
                    continue;
                }
                if self.is_fast_corner(img, x, y, center) {
                    corners.push(Keypoint {
                        x: x as f32,
                        y: y as f32,
                        response: corner_response(img, x, y),
                        angle: 0.0,
                        octave: 0,
                        scale: 1.0,
                    });
                }
            }
        }
        corners
    }

    /// Cheap rejection on the four cardinal circle pixels before the full
    /// segment test.
    fn fast_pre_check(&self, img: &GrayImage, x: u32, y: u32, center: u8) -> bool {
        let bright = center.saturating_add(self.params.fast_threshold);
        let dark = center.saturating_sub(self.params.fast_threshold);

        let pixels = [
            img.get_pixel(x, y - 3)[0],
            img.get_pixel(x + 3, y)[0],
            img.get_pixel(x, y + 3)[0],
            img.get_pixel(x - 3, y)[0],
        ];

        let brighter = pixels.iter().filter(|&&p| p > bright).count();
        let darker = pixels.iter().filter(|&&p| p < dark).count();
        brighter >= 3 || darker >= 3
    }

    /// FAST-9 segment test: 9 contiguous circle pixels all brighter or all
    /// darker than the center by the threshold.
    fn is_fast_corner(&self, img: &GrayImage, x: u32, y: u32, center: u8) -> bool {
        let bright = center.saturating_add(self.params.fast_threshold);
        let dark = center.saturating_sub(self.params.fast_threshold);

        let mut best_bright = 0u32;
        let mut best_dark = 0u32;
        let mut run_bright = 0u32;
        let mut run_dark = 0u32;

        // walk the circle twice to handle wraparound runs
        for i in 0..FAST_CIRCLE.len() * 2 {
            let (dx, dy) = FAST_CIRCLE[i % FAST_CIRCLE.len()];
            let p = img.get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32)[0];

            if p > bright {
                run_bright += 1;
                run_dark = 0;
                best_bright = best_bright.max(run_bright);
            } else if p < dark {
                run_dark += 1;
                run_bright = 0;
                best_dark = best_dark.max(run_dark);
            } else {
                run_bright = 0;
                run_dark = 0;
            }
        }

        best_bright >= 9 || best_dark >= 9
    }

    fn describe(&self, img: &GrayImage, kp: &Keypoint) -> Descriptor {
        let x = kp.x as i32;
        let y = kp.y as i32;
        let (sin_a, cos_a) = kp.angle.sin_cos();
        let w = img.width() as i32;
        let h = img.height() as i32;

        let sample = |dx: i8, dy: i8| -> u8 {
            let rx = (dx as f32 * cos_a - dy as f32 * sin_a).round() as i32;
            let ry = (dx as f32 * sin_a + dy as f32 * cos_a).round() as i32;
            let px = (x + rx).clamp(0, w - 1) as u32;
            let py = (y + ry).clamp(0, h - 1) as u32;
            img.get_pixel(px, py)[0]
        };

        let mut bytes = [0u8; 32];
        for (byte_idx, tests) in ORB_PATTERN.chunks(8).enumerate() {
            let mut byte = 0u8;
            for (bit, &(x1, y1, x2, y2)) in tests.iter().enumerate() {
                if sample(x1, y1) < sample(x2, y2) {
                    byte |= 1 << bit;
                }
            }
            bytes[byte_idx] = byte;
        }
        Descriptor(bytes)
    }
}

/// Local intensity standard deviation as the corner response.
fn corner_response(img: &GrayImage, x: u32, y: u32) -> f32 {
    let mut sum = 0.0f32;
    let mut sum_sq = 0.0f32;
    let mut count = 0u32;

    for dy in -2i32..=2 {
        for dx in -2i32..=2 {
            let px = x as i32 + dx;
            let py = y as i32 + dy;
            if px >= 0 && py >= 0 && (px as u32) < img.width() && (py as u32) < img.height() {
                let v = img.get_pixel(px as u32, py as u32)[0] as f32;
                sum += v;
                sum_sq += v * v;
                count += 1;
            }
        }
    }

    let mean = sum / count as f32;
    ((sum_sq / count as f32) - mean * mean).max(0.0).sqrt()
}

/// Intensity-centroid orientation over a circular patch.
fn orientation(img: &GrayImage, x: u32, y: u32) -> f32 {
    let mut m01 = 0.0f32;
    let mut m10 = 0.0f32;

    for dy in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
        for dx in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
            if dx * dx + dy * dy > ORIENTATION_RADIUS * ORIENTATION_RADIUS {
                continue;
            }
            let px = x as i32 + dx;
            let py = y as i32 + dy;
            if px < 0 || py < 0 || px >= img.width() as i32 || py >= img.height() as i32 {
                continue;
            }
            let v = img.get_pixel(px as u32, py as u32)[0] as f32;
            m10 += v * dx as f32;
            m01 += v * dy as f32;
        }
    }

    m01.atan2(m10)
}

/// Grid-occupancy non-maximum suppression: strongest corner wins each
/// `NMS_RADIUS`-sized cell and blocks its 3x3 neighborhood.
fn suppress_grid(mut corners: Vec<Keypoint>, cap: usize) -> Vec<Keypoint> {
    if corners.is_empty() {
        return corners;
    }

    corners.sort_by(|a, b| {
        b.response
            .partial_cmp(&a.response)
            .unwrap_or(Ordering::Equal)
    });

    let mut selected = Vec::new();
    let mut occupied: HashSet<(i32, i32)> = HashSet::new();

    for kp in corners {
        let gx = (kp.x / NMS_RADIUS) as i32;
        let gy = (kp.y / NMS_RADIUS) as i32;

        let mut free = true;
        'outer: for dy in -1..=1 {
            for dx in -1..=1 {
                if occupied.contains(&(gx + dx, gy + dy)) {
                    free = false;
                    break 'outer;
                }
            }
        }

        if free {
            occupied.insert((gx, gy));
            selected.push(kp);
            if selected.len() >= cap {
                break;
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::block_noise;

    #[test]
    fn detects_corners_on_block_noise() {
        let img = block_noise(320, 240, 7);
        let detector = OrbDetector::new(OrbParams::default());
        let features = detector.detect(&img);

        assert!(features.len() > 100, "got {} features", features.len());
        for f in &features {
            assert!(f.keypoint.x >= 0.0 && f.keypoint.x < 320.0);
            assert!(f.keypoint.y >= 0.0 && f.keypoint.y < 240.0);
        }
    }

    #[test]
    fn no_features_on_flat_image() {
        let img = GrayImage::from_pixel(200, 200, image::Luma([128]));
        let detector = OrbDetector::new(OrbParams::default());
        assert!(detector.detect(&img).is_empty());
    }

    #[test]
    fn respects_feature_cap() {
        let img = block_noise(400, 400, 11);
        let detector = OrbDetector::new(OrbParams::with_max_features(50));
        assert!(detector.detect(&img).len() <= 50);
    }
}
