//! Bounded retry scheduling
//!
//! Wraps one run's attempt function with a fixed number of attempts, a
//! per-attempt timeout, and a constant delay between attempts. A resolved
//! Pass or Fail verdict on any attempt ends retrying immediately; only
//! rejected attempts (session failures, poll timeouts) are retried.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::core::config::RunnerConfig;
use crate::core::{GridRunError, Result, TestResult};

/// Retry bounds for one run
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    attempt_timeout: Duration,
    retry_delay: Duration,
}

/// Final result of a retry sequence
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    /// The run's verdict: Pass/Fail from an attempt, or Error on exhaustion
    pub result: TestResult,
    /// Attempts actually made
    pub attempts: usize,
}

impl RetryPolicy {
    /// Create a policy; at least one attempt is always made
    pub fn new(max_attempts: usize, attempt_timeout: Duration, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
            retry_delay,
        }
    }

    /// Build the policy from runner configuration
    pub fn from_config(runner: &RunnerConfig) -> Self {
        Self::new(
            runner.max_attempts,
            runner.attempt_timeout(),
            runner.retry_delay(),
        )
    }

    /// Total attempts this policy allows
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Drive `operation` to a verdict.
    ///
    /// `operation` receives the zero-based attempt index and resolves to a
    /// Pass or Fail verdict, or rejects. An attempt exceeding the per-attempt
    /// timeout is abandoned and counts as a rejection. Once attempts are
    /// exhausted the outcome is an Error verdict carrying the last rejection
    /// reason. `label` prefixes the per-attempt failure log lines.
    pub async fn run<F, Fut>(&self, label: &str, mut operation: F) -> RetryOutcome
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<TestResult>>,
    {
        let mut attempt = 0usize;
        loop {
            let error = match timeout(self.attempt_timeout, operation(attempt)).await {
                Ok(Ok(result)) => {
                    return RetryOutcome {
                        result,
                        attempts: attempt + 1,
                    };
                }
                Ok(Err(error)) => error,
                Err(_) => GridRunError::timeout(format!(
                    "attempt did not finish within {}s",
                    self.attempt_timeout.as_secs()
                )),
            };

            attempt += 1;
            eprintln!(
                "[{}] attempt {}/{} failed: {}",
                label, attempt, self.max_attempts, error
            );

            if attempt >= self.max_attempts {
                return RetryOutcome {
                    result: TestResult::error(error.to_string()),
                    attempts: attempt,
                };
            }
            sleep(self.retry_delay).await;
        }
    }
}
