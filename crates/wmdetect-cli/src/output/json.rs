//! JSON output adapter.

use std::io::{self, Write};
use std::sync::Mutex;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;
use wmdetect_core::pipeline::BucketEntry;
use wmdetect_core::{
    BatchSummary, Classification, DetectionOutcome, Failure, ImageRef, ResultAggregator,
    ResultOutput, RunStatus,
};

/// One JSON Lines record: the outcome plus presentation fields.
#[derive(Serialize)]
struct OutcomeRecord<'a> {
    #[serde(flatten)]
    outcome: &'a DetectionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
    timestamp: String,
}

/// A classified image inside a [`Report`] bucket.
#[derive(Debug, Serialize)]
pub struct ClassifiedEntry {
    index: usize,
    image: ImageRef,
    confidence: f32,
    explanation: String,
}

impl From<&BucketEntry<Classification>> for ClassifiedEntry {
    fn from(entry: &BucketEntry<Classification>) -> Self {
        Self {
            index: entry.index,
            image: entry.outcome.image.clone(),
            confidence: entry.outcome.confidence,
            explanation: entry.outcome.explanation(),
        }
    }
}

/// A failed image inside a [`Report`] bucket.
#[derive(Debug, Serialize)]
pub struct FailedEntry {
    index: usize,
    image: ImageRef,
    reason: String,
}

impl From<&BucketEntry<Failure>> for FailedEntry {
    fn from(entry: &BucketEntry<Failure>) -> Self {
        Self {
            index: entry.index,
            image: entry.outcome.image.clone(),
            reason: entry.outcome.reason.clone(),
        }
    }
}

/// Whole-run report written by `--format json`.
#[derive(Debug, Serialize)]
pub struct Report {
    status: &'static str,
    summary: BatchSummary,
    watermarked: Vec<ClassifiedEntry>,
    clean: Vec<ClassifiedEntry>,
    failed: Vec<FailedEntry>,
    timestamp: String,
}

impl Report {
    /// Builds the report from an aggregator's buckets.
    #[must_use]
    pub fn from_aggregator(aggregator: &ResultAggregator) -> Self {
        let status = match aggregator.terminal() {
            Some(RunStatus::Cancelled) => "cancelled",
            Some(RunStatus::Completed) => "completed",
            Some(RunStatus::Active) | None => "incomplete",
        };
        Self {
            status,
            summary: aggregator
                .summary()
                .unwrap_or_else(|| aggregator.running_counts()),
            watermarked: aggregator.watermarked().iter().map(Into::into).collect(),
            clean: aggregator.clean().iter().map(Into::into).collect(),
            failed: aggregator.failed().iter().map(Into::into).collect(),
            timestamp: iso_timestamp(),
        }
    }
}

/// JSON output adapter.
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Writes the whole-run report as a single JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_report(&self, report: &Report, pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        self.write_line(&json)
    }

    #[allow(clippy::significant_drop_tightening)]
    fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{line}")?;
        Ok(())
    }
}

impl ResultOutput for JsonOutput {
    fn write(&self, outcome: &DetectionOutcome) -> Result<()> {
        let record = OutcomeRecord {
            outcome,
            explanation: match outcome {
                DetectionOutcome::Classified(c) => Some(c.explanation()),
                DetectionOutcome::Failed(_) => None,
            },
            timestamp: iso_timestamp(),
        };
        self.write_line(&serde_json::to_string(&record)?)
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writer.flush()?;
        Ok(())
    }
}

/// Generate ISO 8601 UTC timestamp (RFC 3339 format).
fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
