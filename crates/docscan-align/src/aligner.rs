use docscan_core::Homography;
use docscan_orb::{match_features, OrbDetector, OrbParams, LOWE_RATIO};
use image::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::normalize::normalize;
use crate::preprocess::enhance;
use crate::quality::quality_score;
use crate::ransac::robust_homography;
use crate::result::AlignmentResult;
use crate::warp::warp_perspective_rgb;
use crate::AlignError;

/// Minimum surviving ratio-test matches required before RANSAC.
pub const MIN_GOOD_MATCHES: usize = 10;

/// Aligner configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlignerConfig {
    /// Working resolution: both images are rescaled so their longest side
    /// equals this before feature detection.
    pub target_dimension: u32,
    /// ORB feature cap per image. 2000 suits most scans; raise towards
    /// 5000 for low-texture or badly lit documents.
    pub orb_features: usize,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            target_dimension: 800,
            orb_features: 2000,
        }
    }
}

/// Compose the normalized-space homography with both normalization scales
/// to obtain a transform valid in original pixel coordinates:
/// undo the base normalization on the way out, apply the homography,
/// re-apply the target normalization on the way in.
pub fn compensate_scales(
    h_norm: &Homography,
    base_scale: f64,
    target_scale: f64,
) -> Homography {
    Homography::scaling(1.0 / base_scale)
        .compose(h_norm)
        .compose(&Homography::scaling(target_scale))
}

/// Feature-based template aligner.
///
/// The sole public entry point of the alignment subsystem. Both arguments
/// to [`Aligner::align`] are already-decoded pixel buffers; decoding is a
/// collaborator's job. The call is synchronous, CPU-bound and shares no
/// mutable state, so concurrent invocations are safe.
#[derive(Clone, Debug)]
pub struct Aligner {
    config: AlignerConfig,
    detector: OrbDetector,
}

impl Aligner {
    pub fn new(config: AlignerConfig) -> Self {
        let detector = OrbDetector::new(OrbParams::with_max_features(config.orb_features));
        Self { config, detector }
    }

    #[inline]
    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Align `target` (the photographed scan) onto `base` (the template).
    ///
    /// Never returns an error: every failure is reported through
    /// [`AlignmentResult::success`] and [`AlignmentResult::error`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, base, target), fields(
            base_w = base.width(), base_h = base.height(),
            target_w = target.width(), target_h = target.height(),
        ))
    )]
    pub fn align(&self, base: &RgbImage, target: &RgbImage) -> AlignmentResult {
        let mut result = AlignmentResult::default();

        // Stage 1: size normalization.
        let base_norm = match normalize(base, self.config.target_dimension) {
            Ok(n) => n,
            Err(e) => return result.fail(e),
        };
        let target_norm = match normalize(target, self.config.target_dimension) {
            Ok(n) => n,
            Err(e) => return result.fail(e),
        };
        result.base_scale = base_norm.scale;
        result.target_scale = target_norm.scale;

        // Stage 2: preprocessing and feature detection.
        let base_gray = enhance(&base_norm.image);
        let target_gray = enhance(&target_norm.image);

        let base_features = self.detector.detect(&base_gray);
        let target_features = self.detector.detect(&target_gray);
        result.base_features = base_features.len();
        result.target_features = target_features.len();
        log::debug!(
            "align: features base={} target={}",
            base_features.len(),
            target_features.len()
        );

        if base_features.is_empty() || target_features.is_empty() {
            return result.fail(AlignError::InsufficientFeatures {
                base: base_features.len(),
                target: target_features.len(),
            });
        }

        // Stage 3: matching with the ratio test.
        let matches = match_features(&base_features, &target_features, LOWE_RATIO);
        result.good_matches = matches.len();
        log::debug!("align: {} good matches", matches.len());

        if matches.len() < MIN_GOOD_MATCHES {
            return result.fail(AlignError::InsufficientMatches {
                found: matches.len(),
                required: MIN_GOOD_MATCHES,
            });
        }

        // Stage 4: robust homography, target-normalized -> base-normalized.
        let src: Vec<Point2<f32>> = matches
            .iter()
            .map(|m| {
                let kp = &target_features[m.target_idx].keypoint;
                Point2::new(kp.x, kp.y)
            })
            .collect();
        let dst: Vec<Point2<f32>> = matches
            .iter()
            .map(|m| {
                let kp = &base_features[m.base_idx].keypoint;
                Point2::new(kp.x, kp.y)
            })
            .collect();

        let Some(fit) = robust_homography(&src, &dst) else {
            return result.fail(AlignError::Homography);
        };
        result.inliers = fit.inlier_count;
        result.inlier_ratio = fit.inlier_count as f64 / matches.len() as f64;

        // Stage 5: scale compensation into original pixel coordinates.
        let final_transform =
            compensate_scales(&fit.homography, base_norm.scale, target_norm.scale);

        // Stage 6: warp the original-resolution target into the base frame.
        let Some(inverse) = final_transform.inverse() else {
            return result.fail(AlignError::Homography);
        };
        let aligned = warp_perspective_rgb(target, &inverse, base.width(), base.height());

        // Stage 7: structural quality against the template.
        result.quality_score = quality_score(base, &aligned);
        log::info!(
            "align: ok, inliers={} ({:.2}), quality={:.3}",
            result.inliers,
            result.inlier_ratio,
            result.quality_score
        );

        result.success = true;
        result.transform = Some(final_transform);
        result.aligned_image = Some(aligned);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scale_compensation_round_trips_points() {
        // Identity homography in normalized space, distinct scales.
        let base_scale = 0.8f64;
        let target_scale = 0.5f64;
        let h = compensate_scales(&Homography::identity(), base_scale, target_scale);

        // A target-original point maps through target-normalized space and
        // back out into base-original space.
        let p = Point2::new(200.0f32, 320.0);
        let q = h.apply(p);
        assert_relative_eq!(q.x, 200.0 * 0.5 / 0.8, epsilon = 1e-3);
        assert_relative_eq!(q.y, 320.0 * 0.5 / 0.8, epsilon = 1e-3);
    }

    #[test]
    fn equal_scales_with_identity_are_identity() {
        let h = compensate_scales(&Homography::identity(), 0.75, 0.75);
        assert!(h.max_abs_diff(&Homography::identity()) < 1e-12);
    }
}
