//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the pipeline core and external adapters.

mod classifier;
mod events;
mod image_loader;
mod result_output;

pub use classifier::{Classifier, RawImage};
pub use events::{ChannelSink, EventSink, ProgressEvent, RunEvent};
pub use image_loader::ImageLoader;
pub use result_output::ResultOutput;
