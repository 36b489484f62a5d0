//! The acceptance gate: decide between the original photograph and its
//! template-aligned counterpart.
//!
//! The gate runs the field detector on the original image, attempts
//! alignment only when the detection yield falls short of the label set
//! by more than a tolerance, and adopts the aligned image only when it
//! demonstrably improves the yield. Alignment passing its own quality
//! gate is necessary but not sufficient.

use docscan_align::{Aligner, AlignerConfig, AlignmentResult};
use docscan_core::{laplacian_variance, luma_from_rgb};
use docscan_detect::{
    filter_detections, DetectError, Detection, DetectionConfig, FieldDetector, FilterMode,
};
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// The only error the gate propagates; everything alignment-related is a
/// decision, not a failure.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Detector(#[from] DetectError),
}

/// States visited by one gate run, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    Initial,
    PrimaryDetected,
    AlignmentSkipped,
    AlignmentAttempted,
    AlignmentRejected,
    AlignmentAccepted,
    Final,
}

/// Quality gate thresholds and tier tables.
///
/// One shared source of truth for every card type; the tables appeared
/// per-variant upstream with identical values, so they are consolidated
/// here and overridable through [`PipelineParams`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Hard floor: minimum RANSAC inliers.
    pub min_inliers: usize,
    /// Hard floor: minimum ratio-test survivors.
    pub min_good_matches: usize,
    /// Hard floor: minimum Laplacian variance of the aligned image.
    pub min_blur: f64,
    /// Acceptance threshold for the weighted score below.
    pub min_total_score: u32,
    /// `(breakpoint, points)` tiers, highest breakpoint first.
    pub inlier_tiers: Vec<(usize, u32)>,
    pub inlier_floor_points: u32,
    pub match_tiers: Vec<(usize, u32)>,
    pub match_floor_points: u32,
    pub blur_tiers: Vec<(f64, u32)>,
    pub blur_floor_points: u32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_inliers: 25,
            min_good_matches: 50,
            min_blur: 50.0,
            min_total_score: 50,
            inlier_tiers: vec![(100, 40), (60, 35), (40, 25), (25, 15)],
            inlier_floor_points: 5,
            match_tiers: vec![(300, 30), (150, 25), (80, 20), (50, 12)],
            match_floor_points: 5,
            blur_tiers: vec![(300.0, 30), (200.0, 25), (100.0, 15)],
            blur_floor_points: 10,
        }
    }
}

impl QualityThresholds {
    /// Absolute minimums an alignment must clear before scoring.
    pub fn passes_floor(&self, inliers: usize, good_matches: usize, blur: f64) -> bool {
        inliers >= self.min_inliers && good_matches >= self.min_good_matches && blur >= self.min_blur
    }

    /// Tiered 0-100 score: inliers up to 40 points, good matches and
    /// sharpness up to 30 each. Monotonic in every factor.
    pub fn weighted_score(&self, inliers: usize, good_matches: usize, blur: f64) -> u32 {
        tier_points(&self.inlier_tiers, self.inlier_floor_points, &inliers)
            + tier_points(&self.match_tiers, self.match_floor_points, &good_matches)
            + tier_points(&self.blur_tiers, self.blur_floor_points, &blur)
    }
}

fn tier_points<T: PartialOrd>(tiers: &[(T, u32)], floor: u32, value: &T) -> u32 {
    for (breakpoint, points) in tiers {
        if value >= breakpoint {
            return *points;
        }
    }
    floor
}

/// Gate configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Alignment is attempted only when more labels than this are missing.
    pub missing_tolerance: usize,
    pub aligner: AlignerConfig,
    pub detection: DetectionConfig,
    pub thresholds: QualityThresholds,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            missing_tolerance: 3,
            // Realignment works against harder inputs than first-pass
            // detection, hence the raised feature cap.
            aligner: AlignerConfig {
                target_dimension: 800,
                orb_features: 5000,
            },
            detection: DetectionConfig::default(),
            thresholds: QualityThresholds::default(),
        }
    }
}

/// Result of one gate run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Ranked detections of the chosen image.
    pub detections: Vec<Detection>,
    /// The chosen image: the original photo, or the cropped aligned scan.
    pub image: RgbImage,
    pub used_aligned: bool,
    /// States visited, in order, always ending in `Final`.
    pub states: Vec<GateState>,
    /// Alignment diagnostics when alignment was attempted; callers decide
    /// whether to log or discard.
    pub alignment: Option<AlignmentResult>,
}

/// The decision pipeline around the external field detector.
///
/// Calls the detector at most twice per document: once on the original,
/// once on an accepted aligned candidate. Holds no mutable state; one
/// gate may serve concurrent documents.
#[derive(Clone, Debug)]
pub struct AcceptanceGate {
    params: PipelineParams,
    aligner: Aligner,
}

impl AcceptanceGate {
    pub fn new(params: PipelineParams) -> Self {
        let aligner = Aligner::new(params.aligner.clone());
        Self { params, aligner }
    }

    #[inline]
    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Run the gate for one document.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, detector, template, photo), fields(
            photo_w = photo.width(), photo_h = photo.height(),
        ))
    )]
    pub fn process(
        &self,
        detector: &dyn FieldDetector,
        template: &RgbImage,
        photo: &RgbImage,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut states = vec![GateState::Initial];

        let original_detections = self.detect_ranked(detector, photo)?;
        states.push(GateState::PrimaryDetected);

        let total = detector.total_known_labels();
        let missing = total.saturating_sub(original_detections.len());
        log::info!(
            "gate: {} of {} labels found ({} missing)",
            original_detections.len(),
            total,
            missing
        );

        if missing <= self.params.missing_tolerance {
            states.push(GateState::AlignmentSkipped);
            states.push(GateState::Final);
            return Ok(PipelineOutcome {
                detections: original_detections,
                image: photo.clone(),
                used_aligned: false,
                states,
                alignment: None,
            });
        }

        states.push(GateState::AlignmentAttempted);
        let alignment = self.aligner.align(template, photo);

        if !alignment.success {
            log::warn!(
                "gate: alignment failed ({}), keeping original",
                alignment.error.as_deref().unwrap_or("unknown")
            );
            states.push(GateState::Final);
            return Ok(PipelineOutcome {
                detections: original_detections,
                image: photo.clone(),
                used_aligned: false,
                states,
                alignment: Some(alignment),
            });
        }

        let Some(aligned_image) = alignment.aligned_image.as_ref() else {
            states.push(GateState::AlignmentRejected);
            states.push(GateState::Final);
            return Ok(PipelineOutcome {
                detections: original_detections,
                image: photo.clone(),
                used_aligned: false,
                states,
                alignment: Some(alignment),
            });
        };

        let blur = laplacian_variance(&luma_from_rgb(aligned_image).view());
        let thresholds = &self.params.thresholds;

        let accepted = if !thresholds.passes_floor(alignment.inliers, alignment.good_matches, blur)
        {
            log::info!(
                "gate: below floor (inliers={}, matches={}, blur={:.1})",
                alignment.inliers,
                alignment.good_matches,
                blur
            );
            false
        } else {
            let score = thresholds.weighted_score(alignment.inliers, alignment.good_matches, blur);
            log::info!(
                "gate: quality score {}/100 (min {})",
                score,
                thresholds.min_total_score
            );
            score >= thresholds.min_total_score
        };

        if !accepted {
            states.push(GateState::AlignmentRejected);
            states.push(GateState::Final);
            return Ok(PipelineOutcome {
                detections: original_detections,
                image: photo.clone(),
                used_aligned: false,
                states,
                alignment: Some(alignment),
            });
        }

        states.push(GateState::AlignmentAccepted);

        let cropped = crop_black_padding(aligned_image);
        let aligned_detections = self.detect_ranked(detector, &cropped)?;
        log::info!(
            "gate: yield original={} aligned={}",
            original_detections.len(),
            aligned_detections.len()
        );

        // Conservative anti-regression rule: the aligned image must
        // strictly improve the yield, ties keep the original.
        let adopt = aligned_detections.len() > original_detections.len();
        states.push(GateState::Final);

        if adopt {
            Ok(PipelineOutcome {
                detections: aligned_detections,
                image: cropped,
                used_aligned: true,
                states,
                alignment: Some(alignment),
            })
        } else {
            Ok(PipelineOutcome {
                detections: original_detections,
                image: photo.clone(),
                used_aligned: false,
                states,
                alignment: Some(alignment),
            })
        }
    }

    fn detect_ranked(
        &self,
        detector: &dyn FieldDetector,
        image: &RgbImage,
    ) -> Result<Vec<Detection>, PipelineError> {
        let raw = detector.detect(image)?;
        Ok(filter_detections(
            raw,
            FilterMode::MultiPosition,
            self.params.detection.max_positions_per_label,
            self.params.detection.iou_threshold,
        ))
    }
}

/// Near-black threshold for the padding crop.
const PADDING_THRESHOLD: u8 = 10;
/// Margin kept around the detected content, pixels.
const CROP_MARGIN: u32 = 2;

/// Crop the uniform black padding a perspective warp leaves around the
/// document.
///
/// Finds the largest 4-connected region of non-near-black pixels, expands
/// its bounding box by a small margin and crops to it. An image with no
/// such region (all black) is returned unchanged.
pub fn crop_black_padding(img: &RgbImage) -> RgbImage {
    let gray = luma_from_rgb(img);
    let w = gray.width;
    let h = gray.height;
    if w == 0 || h == 0 {
        return img.clone();
    }

    let mut visited = vec![false; w * h];
    let mut best: Option<(usize, [usize; 4])> = None; // (pixel count, [x1,y1,x2,y2])
    let mut stack = Vec::new();

    for start in 0..w * h {
        if visited[start] || gray.data[start] <= PADDING_THRESHOLD {
            continue;
        }

        let mut count = 0usize;
        let (mut x1, mut y1, mut x2, mut y2) = (w, h, 0usize, 0usize);
        visited[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            count += 1;
            let x = idx % w;
            let y = idx / w;
            x1 = x1.min(x);
            y1 = y1.min(y);
            x2 = x2.max(x);
            y2 = y2.max(y);

            let mut push = |nidx: usize| {
                if !visited[nidx] && gray.data[nidx] > PADDING_THRESHOLD {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            };
            if x > 0 {
                push(idx - 1);
            }
            if x + 1 < w {
                push(idx + 1);
            }
            if y > 0 {
                push(idx - w);
            }
            if y + 1 < h {
                push(idx + w);
            }
        }

        let replace = match &best {
            None => true,
            Some((best_count, _)) => count > *best_count,
        };
        if replace {
            best = Some((count, [x1, y1, x2, y2]));
        }
    }

    let Some((_, [x1, y1, x2, y2])) = best else {
        log::debug!("crop: no content region found, keeping image unchanged");
        return img.clone();
    };

    let cx = (x1 as u32).saturating_sub(CROP_MARGIN);
    let cy = (y1 as u32).saturating_sub(CROP_MARGIN);
    let cw = ((x2 as u32 + 1 + CROP_MARGIN).min(img.width())) - cx;
    let ch = ((y2 as u32 + 1 + CROP_MARGIN).min(img.height())) - cy;

    log::debug!(
        "crop: {}x{} -> {}x{} at ({}, {})",
        img.width(),
        img.height(),
        cw,
        ch,
        cx,
        cy
    );
    imageops::crop_imm(img, cx, cy, cw, ch).to_image()
}
