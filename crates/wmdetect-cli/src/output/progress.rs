//! Progress bar adapter using indicatif.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use wmdetect_core::{EventSink, RunEvent};

/// Progress bar adapter for CLI output.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of images in the batch
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show a bar; otherwise only failures are printed
    #[must_use]
    pub fn new(total: u64, quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = show_bar.then(|| {
            let bar = IndicatifBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        });

        Self { bar, quiet }
    }

    fn warn(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl EventSink for ProgressBar {
    fn on_event(&self, event: RunEvent) {
        if self.quiet {
            return;
        }

        match event {
            RunEvent::Progress(p) => {
                if let Some(bar) = &self.bar {
                    bar.set_length(p.total_count as u64);
                    bar.set_position(p.completed_count.saturating_sub(1) as u64);
                    bar.set_message(format!(
                        "Processing image {} of {}",
                        p.completed_count, p.total_count
                    ));
                }
            }
            RunEvent::ItemResult { .. } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
            }
            RunEvent::ItemError { failure, .. } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                self.warn(&format!("WARN: {}: {}", failure.image, failure.reason));
            }
            RunEvent::Completed { summary } => {
                if let Some(bar) = &self.bar {
                    bar.finish_with_message(format!("Done: {summary}"));
                }
            }
            RunEvent::Cancelled { summary } => {
                if let Some(bar) = &self.bar {
                    bar.abandon_with_message(format!("Cancelled: {summary}"));
                }
            }
        }
    }
}
