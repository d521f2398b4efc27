//! Output formatting for CLI.

mod json;
mod progress;

pub use json::{JsonOutput, Report};
pub use progress::ProgressBar;
