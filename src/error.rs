//! Error handling module for pkgqueue
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Per-task failures are not errors of the session; they are recorded on the
//! task itself (see [`FailureKind`]). These types cover everything else.

use serde::Serialize;
use thiserror::Error;

/// Main error type for pkgqueue
#[derive(Error, Debug)]
pub enum PkgQueueError {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Execution bridge errors outside of a task (spawn setup, worker gone)
    #[error("Bridge error: {0}")]
    Bridge(String),

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// State errors (invalid session state, dispatch loop disconnected)
    #[error("State error: {0}")]
    State(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for pkgqueue operations
pub type Result<T> = std::result::Result<T, PkgQueueError>;

// Convenient error constructors
impl PkgQueueError {
    /// Create a bridge error
    pub fn bridge(msg: impl Into<String>) -> Self {
        Self::Bridge(msg.into())
    }

    /// Create a terminal error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

/// Why a single task ended in `Failed`.
///
/// Only `Critical` escalates to the whole session; the other two are
/// recovered at task granularity and the queue moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Operation key absent from the catalog
    NotFound,
    /// The bridge returned an error
    Execution,
    /// A bridge error marked fatal, either explicitly or by marker text
    Critical,
}

impl FailureKind {
    /// Returns true if this failure ends the session
    #[inline]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Critical)
    }
}
