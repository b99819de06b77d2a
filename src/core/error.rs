//! Custom error types for gridrun
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for gridrun operations
#[derive(Error, Debug)]
pub enum GridRunError {
    /// Fatal configuration or environment problems, raised before any run starts
    #[error("setup error: {0}")]
    Setup(String),

    /// The remote grid endpoint could not be reached or refused a new session
    #[error("grid connection error: {0}")]
    GridConnection(String),

    /// A remote session command failed or the session was lost
    #[error("session error: {0}")]
    Session(String),

    /// A poll or attempt bound elapsed before a result was observed
    #[error("timed out: {0}")]
    Timeout(String),

    /// Result submission to the grid's job API failed
    #[error("report error: {0}")]
    Reporting(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for gridrun operations
pub type Result<T> = std::result::Result<T, GridRunError>;

impl GridRunError {
    /// Create a setup error
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Create a grid connection error
    pub fn grid(msg: impl Into<String>) -> Self {
        Self::GridConnection(msg.into())
    }

    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a reporting error
    pub fn reporting(msg: impl Into<String>) -> Self {
        Self::Reporting(msg.into())
    }

    /// Whether this error is fatal to the whole process rather than a single attempt
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup(_))
    }
}
