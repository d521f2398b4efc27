//! Sequential background runner for batches.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, info, warn};

use crate::domain::{Batch, BatchSummary, Classification, DetectionOutcome, Failure, ImageRef};
use crate::error::{ItemError, RunnerError};
use crate::ports::{Classifier, EventSink, ImageLoader, ProgressEvent, RunEvent};

use super::handle::{RunHandle, RunId, RunState, RunStatus};

/// Drives batches through an image loader and a classifier.
///
/// One run may be active at a time; items within a run are processed strictly
/// in order on a dedicated worker thread, one in flight at a time.
pub struct BatchRunner {
    loader: Arc<dyn ImageLoader>,
    classifier: Arc<dyn Classifier>,
    active: Arc<Mutex<Option<RunId>>>,
    next_id: AtomicU64,
    fail_fast: bool,
}

impl BatchRunner {
    /// Creates a runner over an already-loaded classifier.
    #[must_use]
    pub fn new(loader: Arc<dyn ImageLoader>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            loader,
            classifier,
            active: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
            fail_fast: false,
        }
    }

    /// Makes every run stop after its first failed item, ending `Cancelled`.
    #[must_use]
    pub const fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Starts processing `batch` in the background, reporting to `sink`.
    ///
    /// An empty batch completes immediately: the sink receives a single
    /// `Completed` event with an all-zero summary before this returns.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Busy` if another run is still active, or
    /// `RunnerError::Spawn` if the worker thread cannot be started. Neither
    /// affects the active run.
    ///
    /// A run stays active until its terminal event has been delivered, so a
    /// sink that resubmits from inside that event is rejected. Resubmit after
    /// [`RunHandle::wait`] returns; until then the handle reports `Active`.
    pub fn submit(&self, batch: Batch, sink: Arc<dyn EventSink>) -> Result<RunHandle, RunnerError> {
        let mut active = lock(&self.active);
        if let Some(id) = *active {
            debug!("Rejecting submission: run {id} is active");
            return Err(RunnerError::Busy { active: id });
        }

        let id = RunId(self.next_id.fetch_add(1, Ordering::Relaxed));

        if batch.is_empty() {
            drop(active);
            info!("Run {id}: empty batch, nothing to classify");
            sink.on_event(RunEvent::Completed {
                summary: BatchSummary::default(),
            });
            return Ok(RunHandle::completed_empty(id));
        }

        let handle = RunHandle::active(id, batch.len());
        let worker = Worker {
            id,
            loader: Arc::clone(&self.loader),
            classifier: Arc::clone(&self.classifier),
            sink,
            state: handle.state(),
            fail_fast: self.fail_fast,
        };
        let runner_slot = Arc::clone(&self.active);
        let state = handle.state();

        *active = Some(id);
        let spawned = thread::Builder::new()
            .name(format!("wmdetect-run-{}", id.0))
            .spawn(move || {
                let _guard = ActiveGuard {
                    active: runner_slot,
                    state,
                };
                worker.run(&batch);
            });

        if let Err(e) = spawned {
            *active = None;
            return Err(RunnerError::Spawn(e.to_string()));
        }

        info!("Run {id} started: {} images", handle.total());
        Ok(handle)
    }

    /// Requests cooperative cancellation of `handle`'s run.
    ///
    /// Equivalent to `handle.cancel()`; idempotent and a no-op on terminal runs.
    pub fn cancel(&self, handle: &RunHandle) {
        debug!("Cancel requested for run {}", handle.id());
        handle.cancel();
    }

    /// The currently active run, if any.
    #[must_use]
    pub fn active_run(&self) -> Option<RunId> {
        *lock(&self.active)
    }

    /// Returns true while a run is active.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active_run().is_some()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Frees the runner when the worker exits, including by panic.
struct ActiveGuard {
    active: Arc<Mutex<Option<RunId>>>,
    state: Arc<RunState>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        *lock(&self.active) = None;
        self.state.release();
    }
}

struct Worker {
    id: RunId,
    loader: Arc<dyn ImageLoader>,
    classifier: Arc<dyn Classifier>,
    sink: Arc<dyn EventSink>,
    state: Arc<RunState>,
    fail_fast: bool,
}

impl Worker {
    fn run(&self, batch: &Batch) {
        let total_count = batch.len();
        let mut summary = BatchSummary::default();
        let mut status = RunStatus::Completed;

        for (index, image) in batch.iter().enumerate() {
            self.sink.on_event(RunEvent::Progress(ProgressEvent {
                completed_count: index + 1,
                total_count,
            }));

            let outcome = self.process(image);
            summary.record(&outcome);
            let failed = outcome.label().is_none();
            self.sink.on_event(match outcome {
                DetectionOutcome::Classified(result) => RunEvent::ItemResult { index, result },
                DetectionOutcome::Failed(failure) => RunEvent::ItemError { index, failure },
            });

            if self.state.is_cancel_requested() {
                status = RunStatus::Cancelled;
                break;
            }
            if failed && self.fail_fast {
                info!("Run {}: stopping after failed item {index}", self.id);
                status = RunStatus::Cancelled;
                break;
            }
        }

        let status = self.state.finish(status, summary);
        info!(
            "Run {} {}: {} of {total_count} images processed ({summary})",
            self.id,
            if status == RunStatus::Cancelled {
                "cancelled"
            } else {
                "completed"
            },
            summary.total(),
        );

        self.sink.on_event(match status {
            RunStatus::Cancelled => RunEvent::Cancelled { summary },
            _ => RunEvent::Completed { summary },
        });
    }

    /// Loads and classifies one image. Failures of either step become a `Failed` outcome.
    fn process(&self, image: &ImageRef) -> DetectionOutcome {
        match self.classify(image) {
            Ok(result) => {
                debug!(
                    "Run {}: {image} -> {} ({:.3})",
                    self.id, result.label, result.confidence
                );
                DetectionOutcome::Classified(result)
            }
            Err(e) => {
                warn!("Run {}: {image}: {e}", self.id);
                DetectionOutcome::Failed(Failure {
                    image: image.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn classify(&self, image: &ImageRef) -> Result<Classification, ItemError> {
        let raw = panic::catch_unwind(AssertUnwindSafe(|| self.loader.load(image)))
            .map_err(|payload| panicked("load", &*payload))??;

        let prediction = panic::catch_unwind(AssertUnwindSafe(|| self.classifier.classify(&raw)))
            .map_err(|payload| panicked("classification", &*payload))?
            .map_err(ItemError::Classify)?;
        if !prediction.has_valid_confidence() {
            return Err(ItemError::Classify(anyhow::anyhow!(
                "confidence {} is outside [0, 1]",
                prediction.confidence
            )));
        }

        Ok(Classification {
            image: image.clone(),
            label: prediction.label,
            confidence: prediction.confidence,
        })
    }
}

fn panicked(stage: &'static str, payload: &(dyn Any + Send)) -> ItemError {
    let message = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    ItemError::Panicked { stage, message }
}
