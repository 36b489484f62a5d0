/// Alignment stage failures.
///
/// These never escape [`crate::Aligner::align`]; they are rendered into
/// the `error` field of an unsuccessful [`crate::AlignmentResult`].
#[derive(thiserror::Error, Debug)]
pub enum AlignError {
    #[error("invalid input image dimensions (width={width}, height={height})")]
    InvalidInput { width: u32, height: u32 },

    #[error("insufficient features (base={base}, target={target})")]
    InsufficientFeatures { base: usize, target: usize },

    #[error("insufficient matches (found {found}, need {required})")]
    InsufficientMatches { found: usize, required: usize },

    #[error("no RANSAC configuration produced a valid homography")]
    Homography,
}
