//! gridrun - Remote browser-grid test campaign runner
//!
//! Drives a matrix of browser configurations against a remotely hosted test
//! page on a hosted browser grid, polls the page for a verdict, retries
//! transient failures with bounded attempts, and reports each session's
//! outcome back to the grid's job API.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Grid**: Remote grid abstraction with an HTTP WebDriver implementation
//! - **Runner**: Polling, per-run state machine, retries, campaign
//!   sequencing, and exit coordination
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gridrun::core::{CampaignFile, Config};
//! use gridrun::grid::RemoteGrid;
//! use gridrun::runner::{Campaign, ExitCoordinator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load().unwrap();
//!     let file = CampaignFile::load(".grid_config.json").unwrap();
//!     let grid = Arc::new(RemoteGrid::from_config(&config));
//!     let coordinator = Arc::new(ExitCoordinator::new());
//!
//!     let campaign = Campaign::new(file, "http://localhost:3000", &config, grid, coordinator);
//!     let report = campaign.run().await.unwrap();
//!     report.print_summary();
//! }
//! ```

pub mod core;
pub mod grid;
pub mod runner;

// Re-export commonly used items
pub use crate::core::{Config, GridRunError, Result, TestResult};
pub use crate::grid::RemoteGrid;
pub use crate::runner::{Campaign, ExitCoordinator};
