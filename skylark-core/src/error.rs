//! Error types for Skylark

use thiserror::Error;

/// Result type alias for Skylark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Skylark
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interface cannot support the requested mode (fatal, no retry)
    #[error("Interface '{interface}' lacks capability: {reason}")]
    Capability { interface: String, reason: String },

    /// Every fallback method for a mode change was exhausted
    #[error("Mode transition failed on '{interface}': {reason}")]
    ModeTransition { interface: String, reason: String },

    /// External tool binary missing or unstartable
    #[error("Failed to spawn '{tool}': {reason}")]
    Spawn { tool: String, reason: String },

    /// Bounded operation exceeded its window
    #[error("Operation '{operation}' timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// Malformed capture record or tool output
    #[error("Parse error: {0}")]
    Parse(String),

    /// User interrupt
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Insufficient privileges
    #[error("Insufficient privileges: {0}")]
    InsufficientPrivileges(String),

    /// Invalid parameter
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl Error {
    /// Create a capability error
    pub fn capability<S: Into<String>>(interface: S, reason: S) -> Self {
        Error::Capability {
            interface: interface.into(),
            reason: reason.into(),
        }
    }

    /// Create a mode transition error
    pub fn mode_transition<S: Into<String>>(interface: S, reason: S) -> Self {
        Error::ModeTransition {
            interface: interface.into(),
            reason: reason.into(),
        }
    }

    /// Create a spawn error
    pub fn spawn<S: Into<String>>(tool: S, reason: S) -> Self {
        Error::Spawn {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, seconds: u64) -> Self {
        Error::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// True for errors that abort the whole run rather than one attempt
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Capability { .. }
                | Error::ModeTransition { .. }
                | Error::InsufficientPrivileges(_)
        )
    }
}
