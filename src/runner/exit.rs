//! Exit coordination
//!
//! Tracks outstanding asynchronous result-reporting calls and defers process
//! termination until every one of them has settled and a final exit status
//! has been decided. Both the status-setting path and every report
//! settlement re-run the finish check, since completion order between "all
//! runs decided" and "all reports settled" is not guaranteed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

/// Process-wide exit gate
pub struct ExitCoordinator {
    pending_reports: AtomicUsize,
    exit_status: Mutex<Option<i32>>,
    finished: AtomicBool,
    notify: Notify,
}

/// Tracks one in-flight report call.
///
/// Created before the call is dispatched; dropping it marks the call settled
/// (success or failure) exactly once and re-runs the finish check.
pub struct ReportGuard {
    coordinator: Arc<ExitCoordinator>,
}

impl ExitCoordinator {
    /// Create a coordinator with no pending reports and no exit status
    pub fn new() -> Self {
        Self {
            pending_reports: AtomicUsize::new(0),
            exit_status: Mutex::new(None),
            finished: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Number of report calls dispatched but not yet settled
    pub fn pending_reports(&self) -> usize {
        self.pending_reports.load(Ordering::SeqCst)
    }

    /// Register an about-to-be-dispatched report call
    pub fn track_report(self: &Arc<Self>) -> ReportGuard {
        self.pending_reports.fetch_add(1, Ordering::SeqCst);
        ReportGuard {
            coordinator: Arc::clone(self),
        }
    }

    /// Record the final exit status. The first write wins; later calls only
    /// re-trigger the finish check.
    pub fn set_exit_status(&self, code: i32) {
        {
            let mut slot = self.exit_status.lock().unwrap();
            if slot.is_none() {
                *slot = Some(code);
            }
        }
        self.notify.notify_one();
    }

    /// The recorded exit status, if decided
    pub fn exit_status(&self) -> Option<i32> {
        *self.exit_status.lock().unwrap()
    }

    /// Yield the exit status exactly once, and only when no reports remain
    /// outstanding and a status has been recorded. Every other call is a
    /// no-op returning `None`.
    pub fn finish_check(&self) -> Option<i32> {
        if self.pending_reports.load(Ordering::SeqCst) > 0 {
            return None;
        }
        let status = (*self.exit_status.lock().unwrap())?;
        if self.finished.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(status)
    }

    /// Wait until the terminal condition holds, then return the exit status
    pub async fn wait_for_exit(&self) -> i32 {
        loop {
            if let Some(code) = self.finish_check() {
                return code;
            }
            self.notify.notified().await;
        }
    }
}

impl Default for ExitCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReportGuard {
    fn drop(&mut self) {
        self.coordinator
            .pending_reports
            .fetch_sub(1, Ordering::SeqCst);
        self.coordinator.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_no_exit_while_report_pending() {
        let coordinator = Arc::new(ExitCoordinator::new());
        let guard = coordinator.track_report();

        coordinator.set_exit_status(0);
        assert_eq!(coordinator.finish_check(), None);

        drop(guard);
        assert_eq!(coordinator.finish_check(), Some(0));
    }

    #[test]
    fn test_no_exit_without_status() {
        let coordinator = Arc::new(ExitCoordinator::new());
        assert_eq!(coordinator.finish_check(), None);

        coordinator.set_exit_status(1);
        assert_eq!(coordinator.finish_check(), Some(1));
    }

    #[test]
    fn test_finish_check_fires_once() {
        let coordinator = Arc::new(ExitCoordinator::new());
        coordinator.set_exit_status(1);

        assert_eq!(coordinator.finish_check(), Some(1));
        assert_eq!(coordinator.finish_check(), None);
        assert_eq!(coordinator.finish_check(), None);
    }

    #[test]
    fn test_first_status_write_wins() {
        let coordinator = Arc::new(ExitCoordinator::new());
        coordinator.set_exit_status(1);
        coordinator.set_exit_status(0);
        assert_eq!(coordinator.exit_status(), Some(1));
    }

    #[test]
    fn test_guard_settles_exactly_once() {
        let coordinator = Arc::new(ExitCoordinator::new());
        let first = coordinator.track_report();
        let second = coordinator.track_report();
        assert_eq!(coordinator.pending_reports(), 2);

        drop(first);
        assert_eq!(coordinator.pending_reports(), 1);
        drop(second);
        assert_eq!(coordinator.pending_reports(), 0);
    }

    #[test]
    fn test_wait_for_exit_blocks_on_pending_report() {
        tokio_test::block_on(async {
            let coordinator = Arc::new(ExitCoordinator::new());
            let guard = coordinator.track_report();
            coordinator.set_exit_status(0);

            let waiter = {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move { coordinator.wait_for_exit().await })
            };

            // Settle the report from another task; the waiter must then resolve
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                drop(guard);
            });

            let code = waiter.await.unwrap();
            assert_eq!(code, 0);
        });
    }
}
