//! Folds run events into watermarked/clean/failed buckets.

use std::collections::BTreeMap;

use crate::domain::{BatchSummary, Classification, Failure, ImageRef, Label};
use crate::ports::{EventSink, ProgressEvent, RunEvent};

use super::RunStatus;

/// An outcome together with its position in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketEntry<T> {
    /// 0-based position in the batch.
    pub index: usize,
    /// The outcome payload.
    pub outcome: T,
}

/// Processing state of one image as seen by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutcomeStatus<'a> {
    /// Not processed yet.
    Pending,
    /// Classified, watermarked or clean.
    Classified(&'a Classification),
    /// Failed to load or classify.
    Failed(&'a Failure),
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Watermarked(usize),
    Clean(usize),
    Failed(usize),
}

/// Accumulates the events of one run.
///
/// Events are folded in delivery order, never reordered or deduplicated. The
/// summary is always computed from the buckets.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    watermarked: Vec<BucketEntry<Classification>>,
    clean: Vec<BucketEntry<Classification>>,
    failed: Vec<BucketEntry<Failure>>,
    by_index: BTreeMap<usize, Slot>,
    progress: Option<ProgressEvent>,
    terminal: Option<RunStatus>,
}

impl ResultAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event.
    pub fn on_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Progress(progress) => self.progress = Some(*progress),
            RunEvent::ItemResult { index, result } => {
                let entry = BucketEntry {
                    index: *index,
                    outcome: result.clone(),
                };
                let slot = match result.label {
                    Label::Watermarked => {
                        self.watermarked.push(entry);
                        Slot::Watermarked(self.watermarked.len() - 1)
                    }
                    Label::Clean => {
                        self.clean.push(entry);
                        Slot::Clean(self.clean.len() - 1)
                    }
                };
                self.by_index.insert(*index, slot);
            }
            RunEvent::ItemError { index, failure } => {
                self.failed.push(BucketEntry {
                    index: *index,
                    outcome: failure.clone(),
                });
                self.by_index
                    .insert(*index, Slot::Failed(self.failed.len() - 1));
            }
            RunEvent::Completed { .. } => self.terminal = Some(RunStatus::Completed),
            RunEvent::Cancelled { .. } => self.terminal = Some(RunStatus::Cancelled),
        }
    }

    /// Final summary, available only after a terminal event.
    #[must_use]
    pub fn summary(&self) -> Option<BatchSummary> {
        self.terminal.map(|_| self.running_counts())
    }

    /// Counts so far, valid at any point of the run.
    #[must_use]
    pub fn running_counts(&self) -> BatchSummary {
        BatchSummary {
            watermarked: self.watermarked.len(),
            clean: self.clean.len(),
            failed: self.failed.len(),
        }
    }

    /// How the run ended, if it has.
    #[must_use]
    pub const fn terminal(&self) -> Option<RunStatus> {
        self.terminal
    }

    /// Returns true once a terminal event has been folded.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// The most recent progress event.
    #[must_use]
    pub const fn progress(&self) -> Option<ProgressEvent> {
        self.progress
    }

    /// Images classified as watermarked, in processing order.
    #[must_use]
    pub fn watermarked(&self) -> &[BucketEntry<Classification>] {
        &self.watermarked
    }

    /// Images classified as clean, in processing order.
    #[must_use]
    pub fn clean(&self) -> &[BucketEntry<Classification>] {
        &self.clean
    }

    /// Images that failed, in processing order.
    #[must_use]
    pub fn failed(&self) -> &[BucketEntry<Failure>] {
        &self.failed
    }

    /// Outcome for the batch position `index`.
    #[must_use]
    pub fn outcome_at(&self, index: usize) -> OutcomeStatus<'_> {
        self.by_index
            .get(&index)
            .map_or(OutcomeStatus::Pending, |slot| self.resolve(*slot))
    }

    /// Outcome for `image`.
    ///
    /// If the image was submitted more than once, the most recently processed
    /// position wins; use `outcome_at` to tell duplicates apart.
    #[must_use]
    pub fn outcome(&self, image: &ImageRef) -> OutcomeStatus<'_> {
        self.by_index
            .values()
            .rev()
            .map(|slot| self.resolve(*slot))
            .find(|status| match status {
                OutcomeStatus::Classified(c) => &c.image == image,
                OutcomeStatus::Failed(f) => &f.image == image,
                OutcomeStatus::Pending => false,
            })
            .unwrap_or(OutcomeStatus::Pending)
    }

    /// Forgets everything, ready for the next run.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn resolve(&self, slot: Slot) -> OutcomeStatus<'_> {
        match slot {
            Slot::Watermarked(i) => OutcomeStatus::Classified(&self.watermarked[i].outcome),
            Slot::Clean(i) => OutcomeStatus::Classified(&self.clean[i].outcome),
            Slot::Failed(i) => OutcomeStatus::Failed(&self.failed[i].outcome),
        }
    }
}

/// Shared aggregator that can be handed to a runner directly as its sink.
impl EventSink for std::sync::Mutex<ResultAggregator> {
    fn on_event(&self, event: RunEvent) {
        self.lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .on_event(&event);
    }
}
