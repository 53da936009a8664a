//! Structured error types for agentdeck
//!
//! Uses thiserror for ergonomic error definitions with automatic Display
//! and Error trait implementations. The binary wraps these in color-eyre
//! reports at the CLI boundary.

use thiserror::Error;

/// All possible errors in agentdeck
#[derive(Error, Debug)]
pub enum AgentdeckError {
    /// Transport-level failure talking to the agent server
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Agent server answered with a non-success status
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File read/write error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transcript event that does not match any known shape
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Case-script entry whose content does not fit its type
    #[error("Malformed case event at index {index}: {reason}")]
    MalformedCaseEvent { index: usize, reason: String },

    /// Thread id not present in either thread collection
    #[error("Unknown thread: {0}")]
    UnknownThread(String),
}

/// Convenience Result type using AgentdeckError
pub type Result<T> = std::result::Result<T, AgentdeckError>;

impl AgentdeckError {
    /// Whether a retry at the next poll tick could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            AgentdeckError::Http(_) => true,
            AgentdeckError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
