//! Result output port for writing detection outcomes.

use crate::domain::DetectionOutcome;

/// Port for outputting per-item outcomes.
pub trait ResultOutput: Send + Sync {
    /// Writes a single outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write(&self, outcome: &DetectionOutcome) -> anyhow::Result<()>;

    /// Flushes any buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&self) -> anyhow::Result<()>;
}
