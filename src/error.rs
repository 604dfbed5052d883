//! Error types for the cyberset crate.
//!
//! [`HarvestError`] covers every failure mode of the library: API fetches,
//! partition persistence, and the external `git` tool.

use std::io;

/// The main error type for all operations in this crate.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// HTTP request failed (connect error, timeout, undecodable body).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A source answered with a terminal status.
    #[error("Source '{source_name}' fetch failed: {message}")]
    SourceFetch {
        /// Name of the source that failed (e.g., "NVD").
        source_name: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Throttling persisted past the configured retry cap.
    #[error("Rate limit exceeded for source '{source_name}': {message}")]
    RateLimit {
        /// Name of the source that kept throttling.
        source_name: String,
        /// Additional details about the rate limit.
        message: String,
    },

    /// Configuration error (missing or invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (partition files, result files, directory creation).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An external tool (git) could not run or exited unsuccessfully.
    #[error("{0}")]
    ExternalTool(String),

    /// An external operation exceeded its time budget.
    #[error("{operation} timed out after {seconds} seconds")]
    Timeout {
        /// What was running.
        operation: String,
        /// The budget that was exceeded.
        seconds: u64,
    },
}

/// A specialized Result type for harvest operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

impl HarvestError {
    /// Create a new source fetch error.
    pub fn source_fetch(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceFetch {
            source_name: source.into(),
            message: message.into(),
        }
    }

    /// Create a new rate limit error.
    pub fn rate_limit(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimit {
            source_name: source.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new external tool error.
    pub fn external_tool(message: impl Into<String>) -> Self {
        Self::ExternalTool(message.into())
    }

    /// Create a new timeout error.
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }
}
