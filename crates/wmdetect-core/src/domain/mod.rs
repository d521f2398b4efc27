//! Core domain types for watermark detection.

mod image_ref;
mod outcome;

pub use image_ref::{Batch, ImageRef};
pub use outcome::{BatchSummary, Classification, DetectionOutcome, Failure, Label, Prediction};
