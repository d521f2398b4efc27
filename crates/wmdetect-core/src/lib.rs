//! wmdetect core - watermark classification pipeline.
//!
//! This crate contains the domain types, the port traits for image loading,
//! classification and event delivery, the batch runner that drives a batch of
//! images through them on a background thread, the aggregator that folds the
//! resulting events into a summary, and the model-backed classifier.

pub mod domain;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod ports;

pub use domain::{
    Batch, BatchSummary, Classification, DetectionOutcome, Failure, ImageRef, Label, Prediction,
};
pub use error::{ItemError, LoadError, ModelLoadError, RunnerError};
pub use pipeline::{BatchRunner, OutcomeStatus, ResultAggregator, RunHandle, RunId, RunStatus};
pub use ports::{
    ChannelSink, Classifier, EventSink, ImageLoader, ProgressEvent, RawImage, ResultOutput,
    RunEvent,
};
