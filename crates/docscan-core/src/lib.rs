//! Core types and utilities for document scan alignment.
//!
//! This crate is intentionally small: lightweight grayscale buffers, the
//! pixel-level operations the alignment pipeline shares (sampling, local
//! contrast equalization, sharpness statistics) and projective geometry.
//! It does *not* depend on any feature detector or decoder.

mod homography;
mod image;
mod logger;

pub use homography::{
    estimate_homography, homography_from_4pt, warp_perspective_gray, Homography,
};
pub use image::{
    clahe, gaussian_blur3, laplacian_variance, luma_from_rgb, sample_bilinear, sample_bilinear_u8,
    GrayImage, GrayImageView,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
