//! Run events and the sink port that receives them.

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::debug;

use crate::domain::{BatchSummary, Classification, DetectionOutcome, Failure};

/// Progress through a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 1-based position of the item being started.
    pub completed_count: usize,
    /// Number of items in the batch.
    pub total_count: usize,
}

/// Events emitted by a run, in order.
///
/// For item `i`, `Progress` precedes its `ItemResult`/`ItemError`, and all
/// events for `i` precede those for `i + 1`. Exactly one terminal event
/// (`Completed` or `Cancelled`) ends every run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// An item is about to be processed.
    Progress(ProgressEvent),
    /// An item was classified.
    ItemResult {
        /// 0-based position in the batch.
        index: usize,
        /// The classification.
        result: Classification,
    },
    /// An item failed to load or classify.
    ItemError {
        /// 0-based position in the batch.
        index: usize,
        /// The failure.
        failure: Failure,
    },
    /// All items were processed.
    Completed {
        /// Counts over every item.
        summary: BatchSummary,
    },
    /// The run stopped early on request.
    Cancelled {
        /// Counts over the items processed before stopping.
        summary: BatchSummary,
    },
}

impl RunEvent {
    /// Returns true for `Completed` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Cancelled { .. })
    }

    /// Returns the item outcome carried by this event, if any.
    #[must_use]
    pub fn outcome(&self) -> Option<(usize, DetectionOutcome)> {
        match self {
            Self::ItemResult { index, result } => {
                Some((*index, DetectionOutcome::Classified(result.clone())))
            }
            Self::ItemError { index, failure } => {
                Some((*index, DetectionOutcome::Failed(failure.clone())))
            }
            _ => None,
        }
    }
}

/// Port for receiving run events.
///
/// Called synchronously on the run's worker thread, one event at a time.
pub trait EventSink: Send + Sync {
    /// Called for each event of a run.
    fn on_event(&self, event: RunEvent);
}

impl<F> EventSink for F
where
    F: Fn(RunEvent) + Send + Sync,
{
    fn on_event(&self, event: RunEvent) {
        self(event);
    }
}

/// Sink that forwards events into a channel, so another thread can consume them.
pub struct ChannelSink {
    sender: Sender<RunEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that yields its events.
    #[must_use]
    pub fn new() -> (Self, Receiver<RunEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: RunEvent) {
        if self.sender.send(event).is_err() {
            debug!("Event receiver dropped; discarding event");
        }
    }
}
