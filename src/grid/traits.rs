//! Grid backend trait for abstracting the remote browser grid
//!
//! Enables swapping the hosted grid for scripted in-process fakes in tests.

use async_trait::async_trait;

use crate::core::{BrowserCapability, Result};

/// Trait for remote browser grid backends
#[async_trait]
pub trait GridBackend: Send + Sync {
    /// Open a new remote browser session for the given capability.
    ///
    /// Fails with a `GridConnection` error when the endpoint is unreachable
    /// or rejects the session request.
    async fn create_session(&self, capability: &BrowserCapability) -> Result<Box<dyn GridSession>>;

    /// Record a session's pass/fail verdict on the grid's job-result API.
    ///
    /// A single authenticated PUT per call. Callers dispatch this
    /// asynchronously and must never let a failure here affect the verdict
    /// that produced it.
    async fn report_result(&self, session_id: &str, passed: bool) -> Result<()>;

    /// Human-facing URL of the job detail page for a session
    fn job_link(&self, session_id: &str) -> String;

    /// Get the backend name
    fn name(&self) -> &str;
}

/// An open remote browser session.
///
/// Command failures surface as `Session` errors and propagate to the caller;
/// nothing here retries internally.
#[async_trait]
pub trait GridSession: Send + Sync {
    /// The grid-assigned session identifier
    fn id(&self) -> &str;

    /// Navigate the session's browser to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Count elements matching a CSS selector
    async fn count_elements(&self, selector: &str) -> Result<usize>;

    /// Read the text of every element matching a CSS selector
    async fn element_texts(&self, selector: &str) -> Result<Vec<String>>;

    /// List the session's window handles
    async fn window_handles(&self) -> Result<Vec<String>>;

    /// Switch focus to the given window handle
    async fn switch_window(&self, handle: &str) -> Result<()>;

    /// Terminate the session
    async fn quit(&self) -> Result<()>;
}
