//! Bounded-time condition polling
//!
//! Generic primitive used by the run state machine to wait for asynchronous
//! page-state changes. The await suspends the calling task for the whole
//! poll duration; isolation is the caller's concern.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::core::Result;

/// Repeatedly invoke `test` until it yields an outcome or `timeout` elapses.
///
/// Returns `Ok(Some(outcome))` as soon as `test` yields one, `Ok(None)` when
/// the bound elapses first. An `Err` from `test` propagates immediately and
/// is never swallowed.
pub async fn poll<T, F, Fut>(timeout: Duration, interval: Duration, test: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    poll_with_progress(timeout, interval, test, |_| {}).await
}

/// Like [`poll`], invoking `progress` with the elapsed time after every
/// unsuccessful check, before sleeping `interval`.
pub async fn poll_with_progress<T, F, Fut, P>(
    timeout: Duration,
    interval: Duration,
    mut test: F,
    mut progress: P,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
    P: FnMut(Duration),
{
    let start = Instant::now();
    loop {
        if let Some(outcome) = test().await? {
            return Ok(Some(outcome));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        progress(start.elapsed());
        sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GridRunError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_immediate_outcome() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = Arc::clone(&calls);
        let outcome = poll(
            Duration::from_secs(10),
            Duration::from_secs(1),
            move || {
                let calls = Arc::clone(&calls_in);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(42))
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome, Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_on_later_tick() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = Arc::clone(&calls);
        let outcome = poll(
            Duration::from_secs(10),
            Duration::from_secs(1),
            move || {
                let calls = Arc::clone(&calls_in);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(if n >= 3 { Some("done") } else { None })
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome, Some("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_none() {
        let outcome: Option<u32> = poll(
            Duration::from_secs(5),
            Duration::from_secs(1),
            || async { Ok(None) },
        )
        .await
        .unwrap();
        assert_eq!(outcome, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_propagates() {
        let result: Result<Option<u32>> = poll(
            Duration::from_secs(5),
            Duration::from_secs(1),
            || async { Err(GridRunError::session("lost session")) },
        )
        .await;
        assert!(matches!(result, Err(GridRunError::Session(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_runs_between_checks() {
        let ticks = Arc::new(AtomicU32::new(0));
        let progress_calls = Arc::new(AtomicU32::new(0));
        let ticks_in = Arc::clone(&ticks);
        let progress_in = Arc::clone(&progress_calls);

        let outcome = poll_with_progress(
            Duration::from_secs(10),
            Duration::from_secs(1),
            move || {
                let ticks = Arc::clone(&ticks_in);
                async move {
                    let n = ticks.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(if n >= 4 { Some(()) } else { None })
                }
            },
            move |_| {
                progress_in.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome, Some(()));
        // Three unsuccessful checks, one progress call after each
        assert_eq!(progress_calls.load(Ordering::SeqCst), 3);
    }
}
