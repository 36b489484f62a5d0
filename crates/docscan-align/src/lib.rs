//! Template alignment for photographed documents.
//!
//! Given a canonical template (*base*) and a photographed scan (*target*),
//! [`Aligner::align`] recovers the projective transform that maps the scan
//! into the template's pixel space and returns the warped image together
//! with the match statistics a caller needs for quality gating.
//!
//! The stages mirror the classic feature-registration recipe: size
//! normalization, contrast-enhancing preprocessing, ORB feature matching,
//! multi-configuration RANSAC, scale compensation and a cheap structural
//! quality score. Failures never cross the `align` boundary as errors;
//! they come back as [`AlignmentResult`] values with `success == false`.

mod aligner;
mod error;
mod normalize;
mod preprocess;
mod quality;
mod ransac;
mod result;
mod warp;

pub use aligner::{compensate_scales, Aligner, AlignerConfig, MIN_GOOD_MATCHES};
pub use error::AlignError;
pub use normalize::{normalize, NormalizedImage};
pub use preprocess::enhance;
pub use quality::quality_score;
pub use ransac::{robust_homography, RansacAttempt, RobustHomography, RANSAC_SCHEDULE};
pub use result::AlignmentResult;
pub use warp::warp_perspective_rgb;
