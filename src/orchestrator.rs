//! Task orchestrator
//!
//! Drives the queue of install/uninstall tasks through their stage tables and
//! the execution bridge. The orchestrator is a pure state machine: it consumes
//! one [`Event`] at a time and answers with [`Effect`]s (timers to arm, bridge
//! jobs to start). It never sleeps and never calls the bridge itself, so the
//! dispatch loop stays responsive and tests can drive it by hand.
//!
//! # Task Flow
//!
//! ```text
//! advance() ── lookup fails ──────────────────────────────► Failed (NotFound)
//!     │
//!     ▼
//! stage 0 ─delay─► stage 1 ─delay─► ... ─► last stage ─► Invoke bridge
//!                                                            │
//!                                 BridgeOutput lines (advisory progress)
//!                                                            │
//!                                     BridgeFinished ─► Completed | Failed
//!                                                            │
//!                                                        advance()
//! ```
//!
//! Exactly one task is in flight at a time. Pause only stops `advance()`;
//! quit stops stage scheduling and `advance()`, but a bridge result that
//! arrives late is still recorded on its task.

use crate::bridge::{BridgeError, InstallReceipt};
use crate::catalog::{CatalogEntry, OperationCatalog};
use crate::classifier::classify;
use crate::config::OrchestratorConfig;
use crate::control::ExitSignal;
use crate::error::FailureKind;
use crate::session::{CriticalFailure, Session, SessionSnapshot};
use crate::stages::{StageTiming, initial_status, stages_for};
use crate::task::{Operation, OperationKind, TaskId, TaskStatus};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Duration recorded for a task whose key is missing from the catalog
pub const NOT_FOUND_DURATION: Duration = Duration::from_secs(1);

/// Highest progress classified output may report; only success reaches 1.0
pub const ADVISORY_CEILING: f64 = 0.99;

/// Successful bridge result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    Installed(InstallReceipt),
    Removed,
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The delay before a stage has elapsed
    StageElapsed { task: TaskId, stage: usize },
    /// The bridge produced a line of output
    BridgeOutput { task: TaskId, line: String },
    /// The bridge call returned
    BridgeFinished {
        task: TaskId,
        result: Result<BridgeOutcome, BridgeError>,
    },
    /// User toggled pause
    TogglePause,
    /// User or signal requested cancellation
    Quit,
}

/// A bridge call the dispatcher must start.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeJob {
    pub task: TaskId,
    pub kind: OperationKind,
    pub key: String,
    pub entry: CatalogEntry,
}

/// Work requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver `event` after `delay`
    Schedule { delay: Duration, event: Event },
    /// Start a bridge call
    Invoke(BridgeJob),
}

/// The single in-flight task slot
#[derive(Debug, Clone)]
struct InFlight {
    task: TaskId,
    kind: OperationKind,
    key: String,
    entry: CatalogEntry,
    started_at: Instant,
    /// Set once the bridge job has been handed out
    invoked: bool,
}

pub struct Orchestrator {
    session: Session,
    catalog: Arc<dyn OperationCatalog>,
    config: OrchestratorConfig,
    timing: StageTiming,
    in_flight: Option<InFlight>,
}

impl Orchestrator {
    /// Create an orchestrator with one pending task per operation.
    pub fn new(
        operations: &[Operation],
        catalog: Arc<dyn OperationCatalog>,
        config: OrchestratorConfig,
    ) -> Self {
        let timing = config.stage_timing();
        Self {
            session: Session::new(operations),
            catalog,
            config,
            timing,
            in_flight: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Receive every activity-log entry from now on, including ones the
    /// 10-entry ring has already evicted by the time the caller looks.
    pub fn subscribe_logs(&mut self) -> Receiver<String> {
        self.session.subscribe_logs()
    }

    /// Task currently holding the in-flight slot
    pub fn in_flight(&self) -> Option<TaskId> {
        self.in_flight.as_ref().map(|f| f.task)
    }

    /// True once nothing more will happen without outside input other than
    /// resuming a pause.
    pub fn is_settled(&self) -> bool {
        if self.session.is_completed() {
            return true;
        }
        self.session.is_quitting() && self.in_flight.is_none()
    }

    /// Begin the session.
    pub fn start(&mut self) -> Vec<Effect> {
        info!("Starting session with {} operation(s)", self.session.len());
        self.advance()
    }

    /// Process one event.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::StageElapsed { task, stage } => self.on_stage(task, stage),
            Event::BridgeOutput { task, line } => {
                self.on_output(task, &line);
                Vec::new()
            }
            Event::BridgeFinished { task, result } => self.on_finished(task, result),
            Event::TogglePause => self.toggle_pause(),
            Event::Quit => {
                self.quit();
                Vec::new()
            }
        }
    }

    /// Start the next pending task, or settle the session if none remain.
    pub fn advance(&mut self) -> Vec<Effect> {
        if self.in_flight.is_some() || !self.session.control().may_advance() {
            return Vec::new();
        }

        while let Some(id) = self.session.next_pending() {
            let (key, kind) = match self.session.task(id) {
                Some(task) => (task.name.clone(), task.kind),
                None => break,
            };

            let Some(entry) = self.catalog.lookup(&key) else {
                self.fail_not_found(id, &key, kind);
                continue;
            };

            info!("Starting {} of {}", kind, key);
            let verb = match kind {
                OperationKind::Install => "Install",
                OperationKind::Uninstall => "Uninstall",
            };
            let description = format!("{} {}", verb, entry.display_name);
            self.session.update_task(id, |t| {
                t.description = description;
                t.status = initial_status(kind);
                t.detail.clear();
            });

            self.in_flight = Some(InFlight {
                task: id,
                kind,
                key,
                entry,
                started_at: Instant::now(),
                invoked: false,
            });

            return self.schedule_stage(id, kind, 0).into_iter().collect();
        }

        self.session.recompute();
        if self.session.is_completed() {
            info!("All operations finished");
        }
        Vec::new()
    }

    /// Flip pause. Resuming with nothing in flight starts the next task.
    pub fn toggle_pause(&mut self) -> Vec<Effect> {
        if self.session.is_quitting() {
            return Vec::new();
        }
        let paused = self.session.control_mut().toggle_pause();
        if paused {
            info!("Queue paused");
            self.session.log("Queue paused");
            Vec::new()
        } else {
            info!("Queue resumed");
            self.session.log("Queue resumed");
            self.advance()
        }
    }

    /// Stop scheduling any further work.
    pub fn quit(&mut self) {
        if self.session.is_quitting() {
            return;
        }
        info!("Quit requested; no further operations will be scheduled");
        self.session.control_mut().quit();
        // A task still in its stage sequence never reaches the bridge now
        self.in_flight = self.in_flight.take().filter(|f| f.invoked);
        self.session.log("Cancelling remaining operations");
        self.session.recompute();
    }

    /// Leave the orchestration screen.
    ///
    /// A completed session hands back its final task list; otherwise the
    /// session is abandoned and the caller is asked to refresh.
    pub fn request_exit(&mut self) -> ExitSignal {
        if self.session.is_completed() {
            return ExitSignal::Finished(self.session.tasks().to_vec());
        }
        self.quit();
        ExitSignal::Return { refresh: true }
    }

    fn schedule_stage(&self, task: TaskId, kind: OperationKind, stage: usize) -> Option<Effect> {
        let next = stages_for(kind).get(stage)?;
        Some(Effect::Schedule {
            delay: self.timing.delay_for(next),
            event: Event::StageElapsed { task, stage },
        })
    }

    /// Package name of the in-flight task, as it appears in package-manager output
    fn package_name(&self) -> String {
        self.in_flight
            .as_ref()
            .map(|f| f.entry.package_name(&f.key).to_string())
            .unwrap_or_default()
    }

    /// Record a stage announcement: progress, status and one log entry.
    fn announce(&mut self, task: TaskId, progress: f64, status: TaskStatus, message: &str) {
        debug!("Task {} stage: {:.2} {}", task, progress, message);
        self.session.update_task(task, |t| {
            t.status = status;
            t.progress = progress;
            t.detail = message.to_string();
        });
        self.session.log(message);
    }

    fn on_stage(&mut self, task: TaskId, stage: usize) -> Vec<Effect> {
        if !self.session.control().may_schedule() {
            debug!("Ignoring stage {} of task {} after quit", stage, task);
            return Vec::new();
        }
        let Some(flight) = self.in_flight.as_ref().filter(|f| f.task == task && !f.invoked) else {
            warn!("Stale stage event for task {}", task);
            return Vec::new();
        };
        let kind = flight.kind;
        let table = stages_for(kind);
        let Some(current) = table.get(stage).copied() else {
            warn!("Task {} has no stage {}", task, stage);
            return Vec::new();
        };

        self.announce(task, current.progress, current.status, current.message);

        if let Some(next) = self.schedule_stage(task, kind, stage + 1) {
            return vec![next];
        }

        // No output exists before the bridge runs, so the last stage value
        // stands until classified output raises it
        let Some(flight) = self.in_flight.as_mut() else {
            return Vec::new();
        };
        flight.invoked = true;
        info!("Invoking bridge for {} ({})", flight.key, flight.kind);
        vec![Effect::Invoke(BridgeJob {
            task,
            kind: flight.kind,
            key: flight.key.clone(),
            entry: flight.entry.clone(),
        })]
    }

    fn apply_classification(&mut self, task: TaskId, kind: OperationKind, line: &str, app: &str) {
        let c = classify(kind, line, app);
        if !c.matched {
            return;
        }
        let progress = c.progress.min(ADVISORY_CEILING);
        self.session.update_task(task, |t| {
            if progress > t.progress {
                t.progress = progress;
                t.detail = c.message;
            }
        });
    }

    fn on_output(&mut self, task: TaskId, line: &str) {
        let Some(flight) = self.in_flight.as_ref().filter(|f| f.task == task) else {
            return;
        };
        let kind = flight.kind;
        let app = flight.entry.package_name(&flight.key).to_string();
        self.apply_classification(task, kind, line, &app);
    }

    fn on_finished(
        &mut self,
        task: TaskId,
        result: Result<BridgeOutcome, BridgeError>,
    ) -> Vec<Effect> {
        let Some(flight) = self.in_flight.take_if(|f| f.task == task && f.invoked) else {
            warn!("Bridge result for task {} which is not in flight", task);
            return Vec::new();
        };
        let elapsed = flight.started_at.elapsed();
        let name = flight.entry.display_name.clone();

        match result {
            Ok(outcome) => {
                let message = match flight.kind {
                    OperationKind::Install => format!("{} installation completed", name),
                    OperationKind::Uninstall => format!("{} uninstalled", name),
                };
                info!("{} ({:?}) in {:?}", message, outcome, elapsed);
                self.session.update_task(task, |t| {
                    t.status = TaskStatus::Completed;
                    t.progress = 1.0;
                    t.duration = Some(elapsed);
                    t.error = None;
                    t.detail = message.clone();
                });
                self.session.log(message);
            }
            Err(err) => {
                let kind = if err.fatal || self.config.is_critical_text(&err.message) {
                    FailureKind::Critical
                } else {
                    FailureKind::Execution
                };
                self.record_failure(task, &name, flight.kind, &err.message, kind, elapsed);

                if kind.is_fatal() {
                    error!("Critical failure in {}: {}", name, err.message);
                    self.session.set_critical(CriticalFailure {
                        task: name,
                        message: err.message,
                    });
                    self.session.control_mut().quit();
                    self.session.recompute();
                    return Vec::new();
                }
            }
        }

        self.advance()
    }

    fn fail_not_found(&mut self, task: TaskId, key: &str, kind: OperationKind) {
        warn!("{} not found in catalog", key);
        let message = format!("{} not found in catalog", key);
        self.record_failure(
            task,
            key,
            kind,
            &message,
            FailureKind::NotFound,
            NOT_FOUND_DURATION,
        );
    }

    fn record_failure(
        &mut self,
        task: TaskId,
        name: &str,
        kind: OperationKind,
        message: &str,
        failure: FailureKind,
        duration: Duration,
    ) {
        let policy = self.config.failure_progress;
        self.session.update_task(task, |t| {
            t.status = TaskStatus::Failed;
            t.progress = policy.apply(t.progress);
            t.duration = Some(duration);
            t.error = Some(message.to_string());
            t.failure = Some(failure);
            t.detail = message.to_string();
        });
        let entry = match kind {
            OperationKind::Install => format!("{} installation failed: {}", name, message),
            OperationKind::Uninstall => format!("{} uninstallation failed: {}", name, message),
        };
        warn!("{}", entry);
        self.session.log(entry);
    }
}
