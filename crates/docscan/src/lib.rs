//! High-level facade crate for the `docscan-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying crates
//! - the acceptance-gate pipeline that decides whether a photographed
//!   document should be processed as-is or replaced by its
//!   template-aligned counterpart.
//!
//! ## Quickstart
//!
//! ```no_run
//! use docscan::pipeline::{AcceptanceGate, PipelineParams};
//! use docscan::FieldDetector;
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # fn load_detector() -> Box<dyn FieldDetector> { unimplemented!() }
//! let template = ImageReader::open("template.png")?.decode()?.to_rgb8();
//! let photo = ImageReader::open("scan.jpg")?.decode()?.to_rgb8();
//! let detector = load_detector();
//!
//! let gate = AcceptanceGate::new(PipelineParams::default());
//! let outcome = gate.process(detector.as_ref(), &template, &photo)?;
//! println!("fields: {}, aligned: {}", outcome.detections.len(), outcome.used_aligned);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `docscan::core`: gray buffers, homographies, sampling, the logger.
//! - `docscan::orb`: pyramid ORB features and Hamming matching.
//! - `docscan::align`: the `Aligner` facade and its `AlignmentResult`.
//! - `docscan::detect`: detection model, IOU ranking filter, detector trait.
//! - `docscan::pipeline`: the acceptance gate tying it all together.

pub use docscan_align as align;
pub use docscan_core as core;
pub use docscan_detect as detect;
pub use docscan_orb as orb;

pub use docscan_align::{Aligner, AlignerConfig, AlignmentResult};
pub use docscan_detect::{
    filter_detections, Detection, DetectionConfig, FieldDetector, FilterMode,
};

pub mod pipeline;

pub use pipeline::{AcceptanceGate, GateState, PipelineError, PipelineOutcome, PipelineParams};
