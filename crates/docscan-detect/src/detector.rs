use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::detection::Detection;

/// Errors a concrete detector backend may report.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidImage { width: u32, height: u32 },

    #[error("model inference failed: {0}")]
    Inference(String),
}

/// Recognized detector options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    /// Best positions kept per label by the ranking filter.
    pub max_positions_per_label: usize,
    /// Square input resolution of the detector model.
    pub target_size: u32,
    /// Apply luminance contrast enhancement before inference.
    pub enhance_image: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.33,
            iou_threshold: 0.25,
            max_positions_per_label: 2,
            target_size: 640,
            enhance_image: false,
        }
    }
}

/// The external field-detector model, treated as a black box.
///
/// The pipeline only consumes the returned label/bbox/confidence tuples
/// and the total label count; how detection is implemented, and how the
/// implementation serializes access to its model, is the implementor's
/// concern. Each call must be synchronous and return a full raw
/// detection set or an error.
pub trait FieldDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, DetectError>;

    /// Number of field labels the model was trained on; the acceptance
    /// gate compares detection yield against this.
    fn total_known_labels(&self) -> usize;
}
