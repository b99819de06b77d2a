//! Per-browser test run state machine
//!
//! One `BrowserTestRun` exists per configured capability. Each attempt
//! launches a remote session, waits for the test harness to initialize,
//! then polls the status indicators until the harness reaches a verdict.
//! A poll bound elapsing is an attempt rejection for the retry layer, never
//! a Fail verdict: Fail means the harness affirmatively reported failures,
//! a timeout means the outcome is indeterminate.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::core::config::{RunnerConfig, Selectors};
use crate::core::{BrowserCapability, GridRunError, Result, StatusCounts, TestResult};
use crate::grid::{GridBackend, GridSession};
use crate::runner::poll::{poll, poll_with_progress};

/// Phase of a run's current attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Run object exists, nothing launched yet
    Created,
    /// A remote session is being requested
    Launching,
    /// Session is open, waiting for the harness to initialize
    AwaitingStart,
    /// Harness is up, polling the status indicators
    Polling,
    /// A Pass or Fail verdict was reached
    Verdicted,
    /// The attempt ended on an unrecoverable error
    Aborted,
}

/// One logical test execution for a capability, spanning its attempts
pub struct BrowserTestRun {
    index: usize,
    capability: BrowserCapability,
    min_client_passed: u32,
    min_server_passed: u32,
    try_count: AtomicU32,
    session_id: Mutex<Option<String>>,
    result: OnceLock<TestResult>,
    phase: Mutex<RunPhase>,
    debug: bool,
}

impl BrowserTestRun {
    /// Create a run for `capability` with the campaign-assigned ordinal index.
    /// Pass thresholds are fixed here and never change afterwards.
    pub fn new(index: usize, capability: BrowserCapability, runner: &RunnerConfig) -> Self {
        Self {
            index,
            capability,
            min_client_passed: runner.min_client_passed,
            min_server_passed: runner.min_server_passed,
            try_count: AtomicU32::new(0),
            session_id: Mutex::new(None),
            result: OnceLock::new(),
            phase: Mutex::new(RunPhase::Created),
            debug: runner.debug,
        }
    }

    /// Ordinal index within the campaign
    pub fn index(&self) -> usize {
        self.index
    }

    /// The capability this run targets
    pub fn capability(&self) -> &BrowserCapability {
        &self.capability
    }

    /// Human-readable description used in logs and the summary
    pub fn description(&self) -> String {
        self.capability.description()
    }

    /// Attempts made so far
    pub fn try_count(&self) -> u32 {
        self.try_count.load(Ordering::SeqCst)
    }

    /// The most recent remote session id, if any attempt opened one
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().unwrap().clone()
    }

    /// The stored terminal verdict, if decided
    pub fn result(&self) -> Option<&TestResult> {
        self.result.get()
    }

    /// Store the terminal verdict. The first write wins; a later write is a
    /// no-op and returns false.
    pub fn set_result(&self, result: TestResult) -> bool {
        self.result.set(result).is_ok()
    }

    /// Current attempt phase
    pub fn phase(&self) -> RunPhase {
        *self.phase.lock().unwrap()
    }

    fn set_phase(&self, phase: RunPhase) {
        *self.phase.lock().unwrap() = phase;
        self.debug_log(&format!("phase -> {:?}", phase));
    }

    fn log(&self, message: &str) {
        println!("[run {}] {}", self.index, message);
    }

    fn debug_log(&self, message: &str) {
        if self.debug {
            eprintln!("DEBUG [run {}] {}", self.index, message);
        }
    }

    /// Execute one attempt against the grid.
    ///
    /// Resolves to a Pass or Fail verdict; any other outcome (session
    /// creation failure, poll timeout, command failure) is a rejection for
    /// the retry layer to consume.
    pub async fn execute_attempt(
        &self,
        grid: &dyn GridBackend,
        test_url: &str,
        runner: &RunnerConfig,
        attempt: usize,
    ) -> Result<TestResult> {
        self.try_count.fetch_add(1, Ordering::SeqCst);
        if attempt == 0 {
            self.log(&format!("launching {}", self.description()));
        } else {
            self.log(&format!(
                "relaunching {} (attempt {})",
                self.description(),
                attempt + 1
            ));
        }

        self.set_phase(RunPhase::Launching);
        let session = match grid.create_session(&self.capability).await {
            Ok(session) => session,
            Err(error) => {
                self.set_phase(RunPhase::Aborted);
                return Err(error);
            }
        };

        *self.session_id.lock().unwrap() = Some(session.id().to_string());
        self.log(&format!("session {} created", session.id()));

        let outcome = self.drive_session(session.as_ref(), test_url, runner).await;

        // The verdict (or rejection) is already decided; closing failures
        // are logged, never propagated.
        match outcome {
            Ok(result) => {
                self.set_phase(RunPhase::Verdicted);
                self.log(&result.summary_line());
                if let Err(error) = session.quit().await {
                    self.log(&format!("session quit failed: {}", error));
                }
                Ok(result)
            }
            Err(error) => {
                self.set_phase(RunPhase::Aborted);
                if let Err(quit_error) = session.quit().await {
                    self.debug_log(&format!("quit after abort failed: {}", quit_error));
                }
                Err(error)
            }
        }
    }

    async fn drive_session(
        &self,
        session: &dyn GridSession,
        test_url: &str,
        runner: &RunnerConfig,
    ) -> Result<TestResult> {
        self.set_phase(RunPhase::AwaitingStart);

        let handles = session.window_handles().await?;
        let first = handles
            .first()
            .ok_or_else(|| GridRunError::session("browser reported no windows"))?;
        session.switch_window(first).await?;

        session.navigate(test_url).await?;
        self.log(&format!("waiting for test page at {}", test_url));

        let selectors = &runner.selectors;
        let ready = poll(runner.ready_timeout(), runner.poll_interval(), move || {
            async move {
                let count = session.count_elements(&selectors.ready).await?;
                Ok((count > 0).then_some(()))
            }
        })
        .await?;
        if ready.is_none() {
            return Err(GridRunError::timeout(format!(
                "test page did not initialize within {}s",
                runner.ready_timeout_secs
            )));
        }

        self.set_phase(RunPhase::Polling);
        let min_client = self.min_client_passed;
        let min_server = self.min_server_passed;
        let verdict = poll_with_progress(
            runner.status_timeout(),
            runner.poll_interval(),
            move || async move {
                let counts = read_status(session, selectors).await?;
                Ok(decide(&counts, min_client, min_server))
            },
            |elapsed| {
                self.debug_log(&format!("still running after {}s", elapsed.as_secs()));
            },
        )
        .await?;

        verdict.ok_or_else(|| {
            GridRunError::timeout(format!(
                "tests did not complete within {}s",
                runner.status_timeout_secs
            ))
        })
    }
}

/// Read one snapshot of the harness's status indicators
async fn read_status(session: &dyn GridSession, selectors: &Selectors) -> Result<StatusCounts> {
    let running = session.count_elements(&selectors.running).await? as u32;
    let failed = session.count_elements(&selectors.failed).await? as u32;
    let passed_texts = session.element_texts(&selectors.passed).await?;

    let passed = passed_texts.len() as u32;
    let client_passed = passed_texts
        .iter()
        .filter(|text| text.to_lowercase().contains(&selectors.client_marker))
        .count() as u32;
    let server_passed = passed_texts
        .iter()
        .filter(|text| text.to_lowercase().contains(&selectors.server_marker))
        .count() as u32;

    Ok(StatusCounts {
        running,
        passed,
        failed,
        client_passed,
        server_passed,
    })
}

/// Evaluate the verdict rule for one status snapshot.
///
/// No verdict while anything is still running. Once nothing runs: Pass only
/// when no failures were reported, at least one test passed, and both
/// per-side minimums are met; everything else is a Fail carrying the
/// observed counts.
pub fn decide(counts: &StatusCounts, min_client: u32, min_server: u32) -> Option<TestResult> {
    if counts.running > 0 {
        return None;
    }
    if counts.failed == 0
        && counts.passed > 0
        && counts.client_passed >= min_client
        && counts.server_passed >= min_server
    {
        Some(TestResult::Pass {
            passed: counts.passed,
            client_passed: counts.client_passed,
            server_passed: counts.server_passed,
        })
    } else {
        Some(TestResult::Fail {
            passed: counts.passed,
            failed: counts.failed,
            client_passed: counts.client_passed,
            server_passed: counts.server_passed,
        })
    }
}
