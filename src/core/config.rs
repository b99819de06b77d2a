//! Configuration management for gridrun
//!
//! Three layers, composed at startup and never re-read:
//! - the campaign file (JSON, given as a positional argument) naming the
//!   campaign and the browser capability matrix,
//! - environment variables for grid credentials/endpoints and threshold
//!   overrides (a `.env` file is honored via dotenvy),
//! - CLI flags, applied on top by `main`.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::core::error::{GridRunError, Result};
use crate::core::types::BrowserCapability;

/// Runtime configuration assembled from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote grid endpoints and credentials
    pub grid: GridConfig,
    /// Polling, retry, and threshold settings
    pub runner: RunnerConfig,
}

/// Remote grid endpoints and credentials
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Grid account username
    pub username: String,
    /// Grid account access key
    pub access_key: String,
    /// WebDriver endpoint for session creation and commands
    pub wd_url: String,
    /// REST endpoint for job-result reporting
    pub api_url: String,
    /// Base URL for human-facing job detail pages
    pub job_link_base: String,
    /// Tunnel identifier forwarded into capability metadata, if any
    pub tunnel_id: Option<String>,
}

/// Polling, retry, and threshold settings
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Minimum client-side passed tests required for a Pass verdict
    pub min_client_passed: u32,
    /// Minimum server-side passed tests required for a Pass verdict
    pub min_server_passed: u32,
    /// Bound on waiting for the remote harness to initialize
    pub ready_timeout_secs: u64,
    /// Bound on waiting for the harness to reach a verdict
    pub status_timeout_secs: u64,
    /// Interval between poll checks in milliseconds
    pub poll_interval_ms: u64,
    /// Total attempts per run (1 initial + retries)
    pub max_attempts: usize,
    /// Bound on a single attempt, end to end
    pub attempt_timeout_secs: u64,
    /// Constant delay between attempts
    pub retry_delay_secs: u64,
    /// CSS selectors and text markers for the harness status page
    pub selectors: Selectors,
    /// Whether to show debug output
    pub debug: bool,
}

/// CSS selectors and text markers for the remote harness status page
#[derive(Debug, Clone)]
pub struct Selectors {
    /// Element present once the harness has initialized
    pub ready: String,
    /// Status indicator for tests still running
    pub running: String,
    /// Status indicator for passed tests
    pub passed: String,
    /// Status indicator for failed tests
    pub failed: String,
    /// Substring identifying a passed test as client-side
    pub client_marker: String,
    /// Substring identifying a passed test as server-side
    pub server_marker: String,
}

/// The campaign file: a name plus the browser capability matrix
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignFile {
    /// Campaign name, forwarded to the grid as job metadata
    pub name: String,
    /// Capabilities to run, in order
    pub browsers: Vec<BrowserCapability>,
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            // Client tests are required by default, server tests are not
            min_client_passed: env_u32("MIN_CLIENT_PASSED", 1),
            min_server_passed: env_u32("MIN_SERVER_PASSED", 0),
            ready_timeout_secs: env_u64("READY_TIMEOUT_SECS", 10),
            status_timeout_secs: env_u64("STATUS_TIMEOUT_SECS", 30),
            poll_interval_ms: env_u64("POLL_INTERVAL_MS", 1000),
            max_attempts: env_u64("MAX_ATTEMPTS", 3) as usize,
            attempt_timeout_secs: env_u64("ATTEMPT_TIMEOUT_SECS", 90),
            retry_delay_secs: env_u64("RETRY_DELAY_SECS", 5),
            selectors: Selectors::default(),
            debug: env::var("GRIDRUN_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            ready: ".test_table".to_string(),
            running: ".running".to_string(),
            passed: ".passed".to_string(),
            failed: ".failed".to_string(),
            client_marker: "client".to_string(),
            server_marker: "server".to_string(),
        }
    }
}

impl RunnerConfig {
    /// Bound on waiting for the remote harness to initialize
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    /// Bound on waiting for the harness to reach a verdict
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    /// Interval between poll checks
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Bound on a single attempt, end to end
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Constant delay between attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl GridConfig {
    /// Read grid endpoints and credentials from the environment.
    ///
    /// Missing credentials are fatal before any orchestration begins.
    pub fn from_env() -> Result<Self> {
        let username = env::var("GRID_USERNAME")
            .map_err(|_| GridRunError::setup("GRID_USERNAME environment variable is required"))?;
        let access_key = env::var("GRID_ACCESS_KEY")
            .map_err(|_| GridRunError::setup("GRID_ACCESS_KEY environment variable is required"))?;

        Ok(Self {
            username,
            access_key,
            wd_url: env::var("GRID_WD_URL")
                .unwrap_or_else(|_| "https://ondemand.saucelabs.com/wd/hub".to_string()),
            api_url: env::var("GRID_API_URL")
                .unwrap_or_else(|_| "https://saucelabs.com/rest/v1".to_string()),
            job_link_base: env::var("GRID_JOB_LINK_BASE")
                .unwrap_or_else(|_| "https://saucelabs.com/jobs".to_string()),
            tunnel_id: env::var("GRID_TUNNEL_ID").ok().filter(|v| !v.is_empty()),
        })
    }
}

impl Config {
    /// Load configuration from `.env` file (if present) and the environment
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            grid: GridConfig::from_env()?,
            runner: RunnerConfig::default(),
        })
    }
}

impl CampaignFile {
    /// Load and parse the campaign JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            GridRunError::setup(format!("failed to read {}: {}", path.display(), e))
        })?;

        let file: CampaignFile = serde_json::from_str(&content).map_err(|e| {
            GridRunError::setup(format!("failed to parse {}: {}", path.display(), e))
        })?;

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_defaults() {
        let runner = RunnerConfig::default();
        assert_eq!(runner.min_client_passed, 1);
        assert_eq!(runner.min_server_passed, 0);
        assert_eq!(runner.max_attempts, 3);
        assert_eq!(runner.attempt_timeout(), Duration::from_secs(90));
        assert_eq!(runner.poll_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_default_selectors() {
        let selectors = Selectors::default();
        assert_eq!(selectors.running, ".running");
        assert_eq!(selectors.client_marker, "client");
    }

    #[test]
    fn test_campaign_file_parse() {
        let json = r#"{
            "name": "widget package suite",
            "browsers": [
                {"browserName": "firefox", "version": "128", "platform": "Windows 11"},
                {"browserName": "chrome", "version": "latest", "platform": "Linux",
                 "screenResolution": "1280x1024"}
            ]
        }"#;
        let file: CampaignFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.name, "widget package suite");
        assert_eq!(file.browsers.len(), 2);
        assert_eq!(file.browsers[1].extra["screenResolution"], "1280x1024");
    }

    #[test]
    fn test_campaign_file_missing() {
        let err = CampaignFile::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, GridRunError::Setup(_)));
    }
}
