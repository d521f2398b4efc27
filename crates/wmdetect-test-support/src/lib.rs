//! Test support utilities for wmdetect.
//!
//! Provides scripted and gated classifiers, an in-memory image loader,
//! recording sinks, synthetic image builders and a builder for ResNet-18
//! weight files with a predictable output.
//!
//! # Example
//!
//! ```
//! use wmdetect_core::Label;
//! use wmdetect_test_support::{MockImageLoader, ScriptedClassifier, SyntheticImageBuilder};
//!
//! let loader = MockImageLoader::new()
//!     .with_image("a.png", SyntheticImageBuilder::solid(32, 32, [200, 10, 10]))
//!     .with_decode_error("b.png", "truncated file");
//!
//! let classifier = ScriptedClassifier::always(Label::Watermarked, 0.9);
//! ```

mod builders;
mod mocks;

pub use builders::{ModelWeightsBuilder, SyntheticImageBuilder};
pub use mocks::{
    GatedClassifier, MockEventSink, MockImageLoader, MockResultOutput, ScriptedClassifier,
    ScriptedResponse,
};
