use docscan_core::Homography;
use image::RgbImage;

/// Outcome of one [`crate::Aligner::align`] call.
///
/// Produced once and immutable; the caller decides whether to log or
/// discard it. On failure `success` is false, `error` holds a short
/// message and the statistics gathered before the failing stage are
/// preserved (later ones stay zero).
#[derive(Clone, Debug, Default)]
pub struct AlignmentResult {
    pub success: bool,
    /// Maps target original-resolution pixels into the base image's
    /// original-resolution pixel space.
    pub transform: Option<Homography>,
    /// Target warped into the base frame; dimensions equal the base
    /// image's original dimensions.
    pub aligned_image: Option<RgbImage>,
    pub base_features: usize,
    pub target_features: usize,
    pub good_matches: usize,
    pub inliers: usize,
    /// `inliers / good_matches`, zero when no matches survived.
    pub inlier_ratio: f64,
    /// Structural similarity of the warp against the template, `[0, 1]`.
    pub quality_score: f64,
    pub base_scale: f64,
    pub target_scale: f64,
    pub error: Option<String>,
}

impl AlignmentResult {
    pub(crate) fn fail(mut self, error: impl std::fmt::Display) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }
}
