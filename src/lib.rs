//! pkgqueue Library
//!
//! Task orchestration for queued application installs and removals: staged
//! progress, heuristic output classification, pause/quit control and a
//! pluggable execution bridge, plus the terminal front end that drives it.

pub mod app;
pub mod bridge;
pub mod catalog;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod log_buffer;
pub mod orchestrator;
pub mod session;
pub mod signals;
pub mod stages;
pub mod task;
pub mod theme;
pub mod ui;

// Re-export main types for convenience
pub use bridge::{BridgeError, CancelToken, CommandBridge, DryRunBridge, ExecutionBridge};
pub use catalog::{CatalogEntry, InstallMethod, OperationCatalog, StaticCatalog};
pub use classifier::{Classification, classify};
pub use config::{FailureProgress, OrchestratorConfig};
pub use control::{ControlState, ExitSignal};
pub use dispatch::Dispatcher;
pub use error::{FailureKind, PkgQueueError};
pub use log_buffer::{LOG_CAPACITY, LogBuffer};
pub use orchestrator::{BridgeJob, BridgeOutcome, Effect, Event, Orchestrator};
pub use session::{CriticalFailure, Session, SessionSnapshot};
pub use stages::{Stage, StageTiming, stages_for};
pub use task::{Operation, OperationKind, Task, TaskId, TaskStatus};
