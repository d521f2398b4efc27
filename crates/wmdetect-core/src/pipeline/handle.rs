//! Run handles and run lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::domain::BatchSummary;

/// Identifier of a run, unique per runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Items are still being processed.
    Active,
    /// Every item was processed.
    Completed,
    /// The run stopped early after a cancel request.
    Cancelled,
}

impl RunStatus {
    /// Returns true for `Completed` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

#[derive(Debug)]
struct Lifecycle {
    /// Published status. Stays `Active` until the runner is free again.
    status: RunStatus,
    /// Terminal status decided by the worker, published on release.
    finished: Option<RunStatus>,
    summary: Option<BatchSummary>,
    /// Set once the worker has emitted its terminal event and freed the runner.
    released: bool,
}

/// State shared between a handle and the worker thread.
#[derive(Debug)]
pub(crate) struct RunState {
    cancel_requested: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
    changed: Condvar,
}

impl RunState {
    fn new(status: RunStatus, summary: Option<BatchSummary>, released: bool) -> Self {
        Self {
            cancel_requested: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle {
                status,
                finished: status.is_terminal().then_some(status),
                summary,
                released,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Records the terminal status and returns the one to report.
    ///
    /// Called before the terminal event is emitted. A cancel request that
    /// arrived after the worker's last check still turns `Completed` into
    /// `Cancelled`; later requests are ignored.
    pub(crate) fn finish(&self, status: RunStatus, summary: BatchSummary) -> RunStatus {
        let mut lifecycle = self.lock();
        let status = if self.is_cancel_requested() {
            RunStatus::Cancelled
        } else {
            status
        };
        lifecycle.finished = Some(status);
        lifecycle.summary = Some(summary);
        status
    }

    /// Publishes the terminal status, marks the runner as free and wakes waiters.
    ///
    /// A run that never reached `finish` (its worker panicked) ends as `Cancelled`.
    pub(crate) fn release(&self) {
        let mut lifecycle = self.lock();
        lifecycle.status = lifecycle.finished.unwrap_or(RunStatus::Cancelled);
        lifecycle.released = true;
        drop(lifecycle);
        self.changed.notify_all();
    }
}

/// Handle to one submitted run.
///
/// Cloning yields another handle to the same run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    id: RunId,
    total: usize,
    state: Arc<RunState>,
}

impl RunHandle {
    pub(crate) fn active(id: RunId, total: usize) -> Self {
        Self {
            id,
            total,
            state: Arc::new(RunState::new(RunStatus::Active, None, false)),
        }
    }

    /// A handle for an empty batch: already completed with an all-zero summary.
    pub(crate) fn completed_empty(id: RunId) -> Self {
        Self {
            id,
            total: 0,
            state: Arc::new(RunState::new(
                RunStatus::Completed,
                Some(BatchSummary::default()),
                true,
            )),
        }
    }

    pub(crate) fn state(&self) -> Arc<RunState> {
        Arc::clone(&self.state)
    }

    /// The run's identifier.
    #[must_use]
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// Number of items in the submitted batch.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Current lifecycle state.
    ///
    /// Reports `Active` until the runner accepts a new submission, which
    /// happens just after the terminal event has been delivered.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.state.lock().status
    }

    /// Final counts, available once the run is terminal.
    #[must_use]
    pub fn summary(&self) -> Option<BatchSummary> {
        let lifecycle = self.state.lock();
        if lifecycle.status.is_terminal() {
            lifecycle.summary
        } else {
            None
        }
    }

    /// Returns true if cancellation has been requested and accepted.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.state.is_cancel_requested()
    }

    /// Requests cooperative cancellation.
    ///
    /// The item in flight finishes; no further item is started. Cancelling a
    /// run whose worker has already finished does nothing.
    pub fn cancel(&self) {
        let lifecycle = self.state.lock();
        if lifecycle.finished.is_none() {
            self.state.cancel_requested.store(true, Ordering::SeqCst);
        }
    }

    /// Blocks until the run is terminal and the runner accepts new submissions.
    pub fn wait(&self) -> RunStatus {
        let mut lifecycle = self.state.lock();
        while !lifecycle.released {
            lifecycle = self
                .state
                .changed
                .wait(lifecycle)
                .unwrap_or_else(PoisonError::into_inner);
        }
        lifecycle.status
    }

    /// Like `wait`, but gives up after `timeout`. Returns `None` on timeout.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<RunStatus> {
        let lifecycle = self.state.lock();
        let (lifecycle, _) = self
            .state
            .changed
            .wait_timeout_while(lifecycle, timeout, |l| !l.released)
            .unwrap_or_else(PoisonError::into_inner);
        lifecycle.released.then_some(lifecycle.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_handle_is_completed() {
        let handle = RunHandle::completed_empty(RunId(1));
        assert_eq!(handle.status(), RunStatus::Completed);
        assert_eq!(handle.summary(), Some(BatchSummary::default()));
        assert_eq!(handle.wait(), RunStatus::Completed);
    }

    #[test]
    fn test_cancel_on_terminal_handle_is_noop() {
        let handle = RunHandle::completed_empty(RunId(1));
        handle.cancel();
        handle.cancel();
        assert!(!handle.is_cancel_requested());
        assert_eq!(handle.status(), RunStatus::Completed);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let handle = RunHandle::active(RunId(2), 4);
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancel_requested());
        assert_eq!(handle.status(), RunStatus::Active);
    }

    #[test]
    fn test_wait_timeout_on_active_run() {
        let handle = RunHandle::active(RunId(3), 1);
        assert_eq!(handle.wait_timeout(Duration::from_millis(10)), None);

        handle.state().finish(RunStatus::Completed, BatchSummary::default());
        handle.state().release();
        assert_eq!(
            handle.wait_timeout(Duration::from_millis(10)),
            Some(RunStatus::Completed)
        );
    }

    #[test]
    fn test_status_stays_active_until_release() {
        let handle = RunHandle::active(RunId(5), 1);
        let status = handle
            .state()
            .finish(RunStatus::Completed, BatchSummary::default());
        assert_eq!(status, RunStatus::Completed);
        assert_eq!(handle.status(), RunStatus::Active);
        assert_eq!(handle.summary(), None);

        handle.state().release();
        assert_eq!(handle.status(), RunStatus::Completed);
        assert_eq!(handle.summary(), Some(BatchSummary::default()));
    }

    #[test]
    fn test_late_cancel_before_finish_is_reported() {
        let handle = RunHandle::active(RunId(6), 1);
        handle.cancel();
        let status = handle
            .state()
            .finish(RunStatus::Completed, BatchSummary::default());
        assert_eq!(status, RunStatus::Cancelled);
        handle.state().release();
        assert_eq!(handle.wait(), RunStatus::Cancelled);
        assert!(handle.is_cancel_requested());
    }

    #[test]
    fn test_cancel_after_finish_is_ignored() {
        let handle = RunHandle::active(RunId(7), 1);
        handle
            .state()
            .finish(RunStatus::Completed, BatchSummary::default());
        handle.cancel();
        assert!(!handle.is_cancel_requested());
        handle.state().release();
        assert_eq!(handle.wait(), RunStatus::Completed);
    }

    #[test]
    fn test_release_without_finish_ends_cancelled() {
        let handle = RunHandle::active(RunId(4), 2);
        handle.state().release();
        assert_eq!(handle.wait(), RunStatus::Cancelled);
        assert_eq!(handle.summary(), None);
    }

    #[test]
    fn test_run_id_display() {
        assert_eq!(RunId(7).to_string(), "#7");
    }
}
