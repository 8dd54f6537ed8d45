//! Task model
//!
//! One [`Task`] exists per requested operation. Tasks are created once when the
//! session starts and live in an arena (`Vec<Task>`) addressed by [`TaskId`],
//! so the presentation layer and the orchestrator never keep two parallel
//! structures in sync.
//!
//! # Status Flow
//!
//! ```text
//! Pending
//!     ↓
//! Downloading / Installing / Uninstalling
//!     ↓
//! Completed | Failed
//! ```

use crate::error::FailureKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use strum::{Display, EnumString};

/// Stable index of a task inside its session.
pub type TaskId = usize;

/// Direction of a package operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Install,
    Uninstall,
}

/// A requested operation, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Catalog key of the application
    pub key: String,
    pub kind: OperationKind,
}

impl Operation {
    pub fn install(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: OperationKind::Install,
        }
    }

    pub fn uninstall(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: OperationKind::Uninstall,
        }
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting in the queue
    Pending,
    /// Install stages before the package is unpacked
    Downloading,
    /// Install stages after download
    Installing,
    /// Any uninstall stage
    Uninstalling,
    /// Terminal: bridge call succeeded
    Completed,
    /// Terminal: lookup or bridge call failed
    Failed,
}

impl TaskStatus {
    /// Returns true if this is a terminal state (Completed or Failed)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true while the task is between start and its terminal state
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Downloading | Self::Installing | Self::Uninstalling
        )
    }

    /// Returns a human-readable label for this status
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Downloading => "Downloading",
            Self::Installing => "Installing",
            Self::Uninstalling => "Uninstalling",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One install or uninstall operation tracked through its own state machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    /// Catalog key
    pub name: String,
    /// Display description shown next to the task
    pub description: String,
    pub kind: OperationKind,
    pub status: TaskStatus,
    /// Progress fraction in `[0.0, 1.0]`
    pub progress: f64,
    /// Wall time from start to terminal state
    pub duration: Option<Duration>,
    /// Error text of a failed task
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    /// Latest human-readable detail (stage message or classified output)
    pub detail: String,
}

impl Task {
    /// Create a pending task for an operation.
    ///
    /// The description is a placeholder until the catalog lookup fills in
    /// the display name.
    pub fn new(op: &Operation) -> Self {
        let verb = match op.kind {
            OperationKind::Install => "Install",
            OperationKind::Uninstall => "Uninstall",
        };
        Self {
            name: op.key.clone(),
            description: format!("{} {}", verb, op.key),
            kind: op.kind,
            status: TaskStatus::Pending,
            progress: 0.0,
            duration: None,
            error: None,
            failure: None,
            detail: String::new(),
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Progress as a whole percentage for gauges
    pub fn percent(&self) -> u16 {
        (self.progress.clamp(0.0, 1.0) * 100.0).round() as u16
    }
}
