//! Brute-force descriptor matching.
//!
//! Implementation note: this is an exhaustive two-nearest-neighbor search
//! over Hamming distances. For the feature caps used in scan alignment
//! (a few thousand per image) the quadratic scan parallelized over the
//! query side is fast enough and keeps memory small.

use rayon::prelude::*;

use crate::keypoint::Feature;

/// Lowe ratio threshold: the best match must beat the runner-up by this
/// factor to survive.
pub const LOWE_RATIO: f32 = 0.75;

/// An accepted correspondence between two feature sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureMatch {
    /// Index into the base (template) feature set.
    pub base_idx: usize,
    /// Index into the target (scan) feature set.
    pub target_idx: usize,
    /// Hamming distance of the winning pair.
    pub distance: u32,
}

/// Match `base` features against `target` features.
///
/// For every base descriptor the two nearest target descriptors are found
/// by Hamming distance; the pair is kept only when
/// `best < ratio * second_best`. Base features with fewer than two
/// candidates on the target side are dropped.
pub fn match_features(base: &[Feature], target: &[Feature], ratio: f32) -> Vec<FeatureMatch> {
    if target.len() < 2 {
        return Vec::new();
    }

    base.par_iter()
        .enumerate()
        .filter_map(|(base_idx, bf)| {
            let mut best = u32::MAX;
            let mut second = u32::MAX;
            let mut best_idx = 0usize;

            for (target_idx, tf) in target.iter().enumerate() {
                let d = bf.descriptor.hamming(&tf.descriptor);
                if d < best {
                    second = best;
                    best = d;
                    best_idx = target_idx;
                } else if d < second {
                    second = d;
                }
            }

            if (best as f32) < ratio * (second as f32) {
                Some(FeatureMatch {
                    base_idx,
                    target_idx: best_idx,
                    distance: best,
                })
            } else {
                None
            }
        })
        .collect()
}
