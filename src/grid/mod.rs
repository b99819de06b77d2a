//! Grid module - remote browser grid integration
//!
//! Provides the backend abstraction plus the HTTP implementation speaking
//! the grid's WebDriver-style wire protocol.

pub mod client;
pub mod traits;

pub use client::RemoteGrid;
pub use traits::{GridBackend, GridSession};
