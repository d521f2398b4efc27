//! The batch classification pipeline.
//!
//! `BatchRunner` drives a batch through an `ImageLoader` and a `Classifier` on
//! a background thread and reports `RunEvent`s to an `EventSink`.
//! `ResultAggregator` folds those events into watermarked/clean/failed buckets.

mod aggregator;
mod handle;
mod runner;

pub use aggregator::{BucketEntry, OutcomeStatus, ResultAggregator};
pub use handle::{RunHandle, RunId, RunStatus};
pub use runner::BatchRunner;
