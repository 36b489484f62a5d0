//! Oriented FAST keypoints with rotated-BRIEF binary descriptors.
//!
//! This is the feature side of the scan alignment pipeline: a pyramid ORB
//! detector bounded by a feature cap, and a brute-force two-nearest-neighbor
//! Hamming matcher with Lowe ratio filtering. Inputs are preprocessed
//! grayscale images; the crate performs no I/O and holds no state between
//! calls.

mod detect;
mod keypoint;
mod matcher;
mod pattern;
#[cfg(test)]
mod testutil;

pub use detect::{OrbDetector, OrbParams};
pub use keypoint::{Descriptor, Feature, Keypoint};
pub use matcher::{match_features, FeatureMatch, LOWE_RATIO};
