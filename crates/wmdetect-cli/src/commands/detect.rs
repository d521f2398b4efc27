//! Detect command - classify images as watermarked or clean.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing::{debug, info, warn};
use wmdetect_adapters::{collect_images, FsImageLoader};
use wmdetect_core::{
    Batch, BatchRunner, BatchSummary, ChannelSink, EventSink, ImageRef, ResultAggregator,
    ResultOutput, RunEvent, RunHandle, RunStatus,
};

use super::model::ModelSource;
use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressBar, Report};

/// Reported when discovery and selection leave nothing to classify.
pub const NO_SELECTION_MESSAGE: &str = "No images selected for detection.";

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per image, written as it finishes)
    #[default]
    Jsonl,
    /// Single JSON report with per-label buckets and the summary
    Json,
}

/// Shared arguments for detection.
#[derive(Args, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct DetectArgs {
    /// Files or directories to scan for images
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Classify only this image (repeatable); defaults to every image found
    #[arg(long = "select", value_name = "PATH")]
    pub select: Vec<PathBuf>,

    /// Weights location and device.
    #[command(flatten)]
    pub model: ModelSource,

    /// Stop after the first image that fails (exit code 3)
    #[arg(long)]
    pub fail_fast: bool,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress and summary output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,
}

impl DetectArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    #[must_use]
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(false);
        }

        args.model = args.model.with_config(config);

        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }

        args
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

/// Run the detect command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
///
/// # Errors
///
/// Returns an error if no paths are given, nothing is selected, the model
/// cannot be loaded, or output cannot be written.
pub fn run(args: &DetectArgs) -> Result<ExitCode> {
    info!("Running detect command on {} paths", args.paths.len());

    if args.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }

    let found = collect_images(&args.paths, args.recursive);
    let batch = select_batch(found, &args.select);
    if batch.is_empty() {
        anyhow::bail!(NO_SELECTION_MESSAGE);
    }

    let classifier = args.model.load()?;
    let runner =
        BatchRunner::new(Arc::new(FsImageLoader::new()), classifier).fail_fast(args.fail_fast);

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = ProgressBar::new(batch.len() as u64, args.quiet, show_progress);
    let output = JsonOutput::stdout();

    let (sink, events) = ChannelSink::new();
    let handle = runner.submit(batch, Arc::new(sink))?;
    let aggregator = drain_events(&handle, &events, &output, &progress, args.format())?;
    handle.wait();

    if args.format() == OutputFormat::Json {
        output.write_report(&Report::from_aggregator(&aggregator), args.pretty)?;
    }
    output.flush()?;

    let summary = aggregator
        .summary()
        .unwrap_or_else(|| aggregator.running_counts());
    if !args.quiet {
        let verb = if aggregator.terminal() == Some(RunStatus::Cancelled) {
            "cancelled"
        } else {
            "complete"
        };
        eprintln!(
            "Analysis {verb}: {} images processed\n{summary}",
            summary.total()
        );
    }

    Ok(exit_code(aggregator.terminal(), &summary))
}

/// Consumes run events until the terminal one, streaming JSONL output.
fn drain_events(
    handle: &RunHandle,
    events: &Receiver<RunEvent>,
    output: &JsonOutput,
    progress: &ProgressBar,
    format: OutputFormat,
) -> Result<ResultAggregator> {
    let mut aggregator = ResultAggregator::new();

    for event in events {
        aggregator.on_event(&event);

        if let Some((index, outcome)) = event.outcome() {
            if format == OutputFormat::Jsonl {
                if let Err(e) = output.write(&outcome) {
                    warn!("Writing result {index} failed; cancelling run");
                    handle.cancel();
                    return Err(e);
                }
            }
        }

        let terminal = event.is_terminal();
        progress.on_event(event);
        if terminal {
            break;
        }
    }

    Ok(aggregator)
}

/// Builds the batch: the explicit selection (in discovery order), or every
/// discovered image when nothing was selected.
#[must_use]
pub fn select_batch(found: Vec<ImageRef>, selection: &[PathBuf]) -> Batch {
    if selection.is_empty() {
        return found.into_iter().collect();
    }

    let wanted: Vec<PathBuf> = selection.iter().map(|p| normalise(p)).collect();
    let batch: Batch = found
        .into_iter()
        .filter(|image| wanted.contains(&normalise(image.path())))
        .collect();

    debug!(
        "Selection of {} paths matched {} images",
        selection.len(),
        batch.len()
    );
    if batch.len() < selection.len() {
        warn!("Some selected paths were not among the discovered images");
    }
    batch
}

fn normalise(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn exit_code(status: Option<RunStatus>, summary: &BatchSummary) -> ExitCode {
    match status {
        Some(RunStatus::Cancelled) => ExitCode::Cancelled,
        Some(_) if summary.watermarked > 0 => ExitCode::WatermarkFound,
        Some(_) => ExitCode::Success,
        None => ExitCode::Error,
    }
}
