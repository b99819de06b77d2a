//! Shared types used across gridrun modules
//!
//! Contains browser capability descriptors, test verdicts, and the
//! status counts observed while polling the remote test page.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of a target browser/platform combination submitted to the grid.
///
/// Grid-specific fields beyond the three standard ones are carried through
/// untouched in `extra` and serialized inline into the capability object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserCapability {
    /// Browser name as the grid expects it (e.g. "firefox")
    #[serde(rename = "browserName")]
    pub browser_name: String,
    /// Browser version, empty string means "latest"
    #[serde(default)]
    pub version: String,
    /// Platform name (e.g. "Windows 11")
    #[serde(default)]
    pub platform: String,
    /// Passthrough grid-specific fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl BrowserCapability {
    /// Create a capability from the three standard fields
    pub fn new(
        browser_name: impl Into<String>,
        version: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            browser_name: browser_name.into(),
            version: version.into(),
            platform: platform.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Human-readable description used in logs and the campaign summary
    pub fn description(&self) -> String {
        format!(
            "{} {} on {}",
            self.browser_name, self.version, self.platform
        )
    }

    /// Attach a campaign-wide metadata field (run name, tunnel identifier)
    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }
}

/// Terminal classification of a run.
///
/// Exactly one of these is produced per completed run; a timeout or session
/// failure never becomes a `Fail` — only the remote harness affirmatively
/// reporting failed tests does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestResult {
    /// The harness finished with no failures and the required minimums met
    Pass {
        passed: u32,
        client_passed: u32,
        server_passed: u32,
    },
    /// The harness finished but reported failures (or missed the minimums)
    Fail {
        passed: u32,
        failed: u32,
        client_passed: u32,
        server_passed: u32,
    },
    /// No verdict could be obtained (session failure, poll timeout, exhausted retries)
    Error { reason: String },
}

impl TestResult {
    /// Create an error verdict
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }

    /// Whether this verdict counts as a pass for reporting and exit-code purposes
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    /// Short status label used in log lines
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Pass { .. } => "pass",
            Self::Fail { .. } => "fail",
            Self::Error { .. } => "error",
        }
    }

    /// One-line rendering of the verdict with its counts
    pub fn summary_line(&self) -> String {
        match self {
            Self::Pass {
                passed,
                client_passed,
                server_passed,
            } => format!(
                "PASS ({} passed: {} client, {} server)",
                passed, client_passed, server_passed
            ),
            Self::Fail { passed, failed, .. } => {
                format!("FAIL ({} failed, {} passed)", failed, passed)
            }
            Self::Error { reason } => format!("ERROR ({})", reason),
        }
    }
}

/// Counts read from the remote harness's status indicators on one poll tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Tests still marked running
    pub running: u32,
    /// Tests marked passed
    pub passed: u32,
    /// Tests marked failed
    pub failed: u32,
    /// Passed tests whose label carries the client-side marker
    pub client_passed: u32,
    /// Passed tests whose label carries the server-side marker
    pub server_passed: u32,
}
