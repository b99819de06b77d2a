//! Core module - shared infrastructure for gridrun
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::{CampaignFile, Config, GridConfig, RunnerConfig, Selectors};
pub use error::{GridRunError, Result};
pub use types::*;
