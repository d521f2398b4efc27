//! CLI command definitions and handlers.

pub mod detect;
pub mod model;

use clap::{Parser, Subcommand};

/// wmdetect - batch watermark detection
#[derive(Parser)]
#[command(name = "wmdetect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared detect arguments (paths, selection, output flags).
    #[command(flatten)]
    pub detect: detect::DetectArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Classify images as watermarked or clean
    Detect(detect::DetectArgs),
    /// Inspect the model weights file
    Model(model::ModelArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// No watermark found (or nothing to do).
    Success = 0,
    /// At least one image was classified as watermarked.
    WatermarkFound = 1,
    /// Fatal error, including model load failure and an empty selection.
    Error = 2,
    /// The run was cancelled before every image was processed.
    Cancelled = 3,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
