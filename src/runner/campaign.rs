//! Campaign orchestration
//!
//! Sequences one browser test run per configured capability, strictly one at
//! a time: a run's full retry cycle finishes before the next begins, trading
//! wall-clock time for predictable grid usage and readable log interleaving.
//! Result reports are the only concurrent work; they are spawned at verdict
//! time, tracked by the exit coordinator, and joined before the campaign
//! returns.

use std::sync::Arc;

use futures::future::join_all;

use crate::core::config::RunnerConfig;
use crate::core::{CampaignFile, Config, Result, TestResult};
use crate::grid::GridBackend;
use crate::runner::browser_run::BrowserTestRun;
use crate::runner::exit::ExitCoordinator;
use crate::runner::retry::RetryPolicy;

/// Aggregate run counters, owned by the campaign and updated only here.
/// Counts accumulate monotonically; they are read for the summary and exit
/// code once the campaign completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CampaignTotals {
    /// Runs started
    pub started: u32,
    /// Runs that ended in a Pass verdict
    pub passed: u32,
    /// Runs that ended in a Fail verdict
    pub failed: u32,
    /// Runs that ended in an Error verdict
    pub errored: u32,
}

impl CampaignTotals {
    fn record_started(&mut self) {
        self.started += 1;
    }

    fn record(&mut self, result: &TestResult) {
        match result {
            TestResult::Pass { .. } => self.passed += 1,
            TestResult::Fail { .. } => self.failed += 1,
            TestResult::Error { .. } => self.errored += 1,
        }
    }
}

/// Per-run detail for the end-of-campaign summary
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Ordinal run index
    pub index: usize,
    /// Browser description
    pub description: String,
    /// Terminal verdict
    pub result: TestResult,
    /// Attempts actually made
    pub attempts: usize,
    /// Link to the grid's job detail page, when a session was opened
    pub job_link: Option<String>,
}

/// Outcome of a whole campaign
#[derive(Debug, Clone)]
pub struct CampaignReport {
    /// Campaign name from the configuration file
    pub name: String,
    /// Aggregate counters
    pub totals: CampaignTotals,
    /// Per-run details, in run order
    pub runs: Vec<RunReport>,
}

impl CampaignReport {
    /// Whether every run resolved to a Pass verdict
    pub fn all_passed(&self) -> bool {
        self.totals.failed == 0
            && self.totals.errored == 0
            && self.totals.passed == self.totals.started
    }

    /// Process exit status for this outcome: 0 all passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }

    /// Print the user-facing summary: totals plus detail for every run that
    /// did not pass
    pub fn print_summary(&self) {
        println!(
            "\n[campaign] {}: {} run(s), {} passed, {} failed, {} errored",
            self.name, self.totals.started, self.totals.passed, self.totals.failed,
            self.totals.errored
        );
        for run in &self.runs {
            if run.result.is_pass() {
                continue;
            }
            println!(
                "[campaign]   {}: {} after {} attempt(s)",
                run.description,
                run.result.summary_line(),
                run.attempts
            );
            if let Some(link) = &run.job_link {
                println!("[campaign]     {}", link);
            }
        }
    }
}

/// One sequential campaign of per-browser test runs
pub struct Campaign {
    name: String,
    test_url: String,
    runs: Vec<Arc<BrowserTestRun>>,
    grid: Arc<dyn GridBackend>,
    coordinator: Arc<ExitCoordinator>,
    runner: RunnerConfig,
}

impl Campaign {
    /// Build the campaign: one run per capability, configuration order
    /// preserved, with the campaign name and tunnel identifier injected into
    /// each capability's grid metadata.
    pub fn new(
        file: CampaignFile,
        test_url: impl Into<String>,
        config: &Config,
        grid: Arc<dyn GridBackend>,
        coordinator: Arc<ExitCoordinator>,
    ) -> Self {
        let runs = file
            .browsers
            .into_iter()
            .enumerate()
            .map(|(index, mut capability)| {
                capability.set_meta("name", file.name.clone());
                if let Some(tunnel) = &config.grid.tunnel_id {
                    capability.set_meta("tunnel-identifier", tunnel.clone());
                }
                Arc::new(BrowserTestRun::new(index, capability, &config.runner))
            })
            .collect();

        Self {
            name: file.name,
            test_url: test_url.into(),
            runs,
            grid,
            coordinator,
            runner: config.runner.clone(),
        }
    }

    /// The runs this campaign will execute, in order
    pub fn runs(&self) -> &[Arc<BrowserTestRun>] {
        &self.runs
    }

    /// Execute every run to a terminal verdict and return the report.
    ///
    /// Outstanding result reports are joined before returning, so a caller
    /// that sets the exit status afterwards will find the coordinator idle.
    pub async fn run(&self) -> Result<CampaignReport> {
        let policy = RetryPolicy::from_config(&self.runner);
        let mut totals = CampaignTotals::default();
        let mut reports = Vec::with_capacity(self.runs.len());
        let mut report_handles = Vec::new();

        println!(
            "[campaign] {}: {} browser(s) against {}",
            self.name,
            self.runs.len(),
            self.test_url
        );

        for run in &self.runs {
            totals.record_started();

            let label = format!("run {}", run.index());
            let run_ref: &BrowserTestRun = run.as_ref();
            let grid: &dyn GridBackend = self.grid.as_ref();
            let test_url = self.test_url.as_str();
            let runner = &self.runner;
            let outcome = policy
                .run(&label, move |attempt| {
                    run_ref.execute_attempt(grid, test_url, runner, attempt)
                })
                .await;

            run.set_result(outcome.result.clone());
            totals.record(&outcome.result);
            if let TestResult::Error { reason } = &outcome.result {
                println!(
                    "[run {}] errored after {} attempt(s): {}",
                    run.index(),
                    outcome.attempts,
                    reason
                );
            }

            let job_link = run.session_id().map(|id| self.grid.job_link(&id));
            if let Some(session_id) = run.session_id() {
                report_handles.push(self.dispatch_report(
                    run.index(),
                    session_id,
                    outcome.result.is_pass(),
                ));
            }

            reports.push(RunReport {
                index: run.index(),
                description: run.description(),
                result: outcome.result,
                attempts: outcome.attempts,
                job_link,
            });
        }

        // All runs are decided; reports may still be in flight and can have
        // settled out of order. Join them so completion implies settlement.
        for joined in join_all(report_handles).await {
            if let Err(error) = joined {
                eprintln!("[campaign] report task failed: {}", error);
            }
        }

        Ok(CampaignReport {
            name: self.name.clone(),
            totals,
            runs: reports,
        })
    }

    /// Fire-and-track result report. The pending count is incremented before
    /// dispatch and settled exactly once when the task finishes; a failed
    /// report is logged and swallowed, never affecting the verdict that
    /// produced it.
    fn dispatch_report(
        &self,
        run_index: usize,
        session_id: String,
        passed: bool,
    ) -> tokio::task::JoinHandle<()> {
        let guard = self.coordinator.track_report();
        let grid = Arc::clone(&self.grid);
        tokio::spawn(async move {
            if let Err(error) = grid.report_result(&session_id, passed).await {
                eprintln!(
                    "[run {}] result report for session {} failed: {}",
                    run_index, session_id, error
                );
            }
            drop(guard);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GridConfig;
    use crate::core::{BrowserCapability, GridRunError};
    use async_trait::async_trait;
    use crate::grid::GridSession;

    struct NullGrid;

    #[async_trait]
    impl GridBackend for NullGrid {
        async fn create_session(
            &self,
            _capability: &BrowserCapability,
        ) -> Result<Box<dyn GridSession>> {
            Err(GridRunError::grid("null grid"))
        }
        async fn report_result(&self, _session_id: &str, _passed: bool) -> Result<()> {
            Ok(())
        }
        fn job_link(&self, session_id: &str) -> String {
            format!("https://grid.test/jobs/{}", session_id)
        }
        fn name(&self) -> &str {
            "null-grid"
        }
    }

    fn config_with_tunnel(tunnel: Option<&str>) -> Config {
        Config {
            grid: GridConfig {
                username: "user".into(),
                access_key: "key".into(),
                wd_url: "https://grid.test/wd/hub".into(),
                api_url: "https://grid.test/rest/v1".into(),
                job_link_base: "https://grid.test/jobs".into(),
                tunnel_id: tunnel.map(String::from),
            },
            runner: RunnerConfig::default(),
        }
    }

    fn campaign_file() -> CampaignFile {
        serde_json::from_str(
            r#"{
                "name": "widget suite",
                "browsers": [
                    {"browserName": "firefox", "version": "128", "platform": "Windows 11"},
                    {"browserName": "chrome", "version": "latest", "platform": "Linux"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_campaign_injects_metadata() {
        let campaign = Campaign::new(
            campaign_file(),
            "http://localhost:3000",
            &config_with_tunnel(Some("tunnel-9")),
            Arc::new(NullGrid),
            Arc::new(ExitCoordinator::new()),
        );

        assert_eq!(campaign.runs().len(), 2);
        for (index, run) in campaign.runs().iter().enumerate() {
            assert_eq!(run.index(), index);
            assert_eq!(run.capability().extra["name"], "widget suite");
            assert_eq!(run.capability().extra["tunnel-identifier"], "tunnel-9");
        }
    }

    #[test]
    fn test_campaign_without_tunnel() {
        let campaign = Campaign::new(
            campaign_file(),
            "http://localhost:3000",
            &config_with_tunnel(None),
            Arc::new(NullGrid),
            Arc::new(ExitCoordinator::new()),
        );
        assert!(!campaign.runs()[0]
            .capability()
            .extra
            .contains_key("tunnel-identifier"));
    }

    #[test]
    fn test_totals_accumulate() {
        let mut totals = CampaignTotals::default();
        totals.record_started();
        totals.record_started();
        totals.record(&TestResult::Pass {
            passed: 1,
            client_passed: 1,
            server_passed: 0,
        });
        totals.record(&TestResult::error("boom"));
        assert_eq!(totals.started, 2);
        assert_eq!(totals.passed, 1);
        assert_eq!(totals.errored, 1);
    }

    #[test]
    fn test_exit_code_mapping() {
        let pass_report = CampaignReport {
            name: "suite".into(),
            totals: CampaignTotals {
                started: 2,
                passed: 2,
                failed: 0,
                errored: 0,
            },
            runs: vec![],
        };
        assert!(pass_report.all_passed());
        assert_eq!(pass_report.exit_code(), 0);

        let fail_report = CampaignReport {
            name: "suite".into(),
            totals: CampaignTotals {
                started: 2,
                passed: 1,
                failed: 1,
                errored: 0,
            },
            runs: vec![],
        };
        assert!(!fail_report.all_passed());
        assert_eq!(fail_report.exit_code(), 1);

        let error_report = CampaignReport {
            name: "suite".into(),
            totals: CampaignTotals {
                started: 1,
                passed: 0,
                failed: 0,
                errored: 1,
            },
            runs: vec![],
        };
        assert_eq!(error_report.exit_code(), 1);
    }
}
