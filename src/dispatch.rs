//! dispatch.rs - Single-threaded event dispatch for the orchestrator.
//!
//! The orchestrator is only ever touched from the thread that owns the
//! [`Dispatcher`]. Everything else talks to it through one event channel:
//!
//! - stage timers are short-lived threads that sleep and then send
//!   `StageElapsed`
//! - bridge calls run on one dedicated worker thread, which streams
//!   `BridgeOutput` lines and finishes with `BridgeFinished`
//!
//! One worker thread means at most one package operation runs at a time.

use crate::bridge::{CancelToken, ExecutionBridge};
use crate::error::{PkgQueueError, Result};
use crate::orchestrator::{BridgeJob, BridgeOutcome, Effect, Event, Orchestrator};
use crate::task::OperationKind;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// How long `run_until_settled` waits for an event before rechecking cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct Dispatcher {
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
    jobs_tx: Sender<BridgeJob>,
    cancel: CancelToken,
}

impl Dispatcher {
    /// Create a dispatcher and its bridge worker thread.
    pub fn new(bridge: Arc<dyn ExecutionBridge>, cancel: CancelToken) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let (jobs_tx, jobs_rx) = mpsc::channel();
        spawn_bridge_worker(bridge, jobs_rx, events_tx.clone(), cancel.clone());
        Self {
            events_tx,
            events_rx,
            jobs_tx,
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Start the session and arm its first effects.
    pub fn start(&self, orch: &mut Orchestrator) -> Result<()> {
        let effects = orch.start();
        self.apply(effects)
    }

    /// Carry out effects requested by the orchestrator.
    pub fn apply(&self, effects: Vec<Effect>) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::Schedule { delay, event } => self.schedule(delay, event),
                Effect::Invoke(job) => {
                    debug!("Queueing bridge job for task {}", job.task);
                    self.jobs_tx
                        .send(job)
                        .map_err(|_| PkgQueueError::bridge("Bridge worker has shut down"))?;
                }
            }
        }
        Ok(())
    }

    /// Deliver `event` to this dispatcher after `delay`.
    fn schedule(&self, delay: Duration, event: Event) {
        let tx = self.events_tx.clone();
        if delay.is_zero() {
            let _ = tx.send(event);
            return;
        }
        thread::spawn(move || {
            thread::sleep(delay);
            // Receiver gone means the session ended; nothing to deliver to
            let _ = tx.send(event);
        });
    }

    /// Feed a control event (pause, quit) straight into the orchestrator.
    pub fn control(&self, orch: &mut Orchestrator, event: Event) -> Result<()> {
        if event == Event::Quit {
            self.cancel.cancel();
        }
        let effects = orch.handle(event);
        self.apply(effects)
    }

    /// Turn an external cancellation (signal) into a Quit event, once.
    fn check_cancel(&self, orch: &mut Orchestrator) {
        if self.cancel.is_cancelled() && !orch.session().is_quitting() {
            info!("Cancellation received");
            orch.handle(Event::Quit);
        }
    }

    /// Wait up to `timeout` for one event and process it.
    ///
    /// Returns true if an event was processed.
    pub fn pump(&self, orch: &mut Orchestrator, timeout: Duration) -> Result<bool> {
        self.check_cancel(orch);
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                let effects = orch.handle(event);
                self.apply(effects)?;
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                Err(PkgQueueError::state("Event channel disconnected"))
            }
        }
    }

    /// Process every event already waiting, without blocking.
    pub fn drain(&self, orch: &mut Orchestrator) -> Result<usize> {
        self.check_cancel(orch);
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            let effects = orch.handle(event);
            self.apply(effects)?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Start the session and pump events until it settles, calling
    /// `on_event` after each processed event.
    pub fn run_until_settled<F>(&self, orch: &mut Orchestrator, mut on_event: F) -> Result<()>
    where
        F: FnMut(&Orchestrator),
    {
        self.start(orch)?;
        on_event(orch);
        while !orch.is_settled() {
            if self.pump(orch, POLL_INTERVAL)? {
                on_event(orch);
            }
        }
        Ok(())
    }
}

/// Spawns the single worker thread that performs bridge calls.
///
/// Jobs are executed strictly one after another. Output lines and the final
/// result are sent back as events.
fn spawn_bridge_worker(
    bridge: Arc<dyn ExecutionBridge>,
    jobs_rx: Receiver<BridgeJob>,
    events_tx: Sender<Event>,
    cancel: CancelToken,
) {
    thread::spawn(move || {
        debug!("Bridge worker thread started.");
        while let Ok(job) = jobs_rx.recv() {
            let task = job.task;
            let line_tx = events_tx.clone();
            let mut output = |line: &str| {
                let _ = line_tx.send(Event::BridgeOutput {
                    task,
                    line: line.to_string(),
                });
            };

            let result = match job.kind {
                OperationKind::Install => bridge
                    .install(&cancel, &job.key, &job.entry, &mut output)
                    .map(BridgeOutcome::Installed),
                OperationKind::Uninstall => bridge
                    .remove(&cancel, &job.key, &job.entry, &mut output)
                    .map(|()| BridgeOutcome::Removed),
            };

            if events_tx.send(Event::BridgeFinished { task, result }).is_err() {
                error!("Failed to send bridge result. Receiver probably dropped.");
                break;
            }
        }
        debug!("Bridge worker thread shut down.");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeError, DryRunBridge};
    use crate::catalog::StaticCatalog;
    use crate::config::OrchestratorConfig;
    use crate::task::{Operation, TaskStatus};

    fn instant_config() -> OrchestratorConfig {
        OrchestratorConfig {
            stage_delay_ms: 0,
            ..OrchestratorConfig::default()
        }
    }

    #[test]
    fn test_runs_queue_to_completion() {
        let bridge = DryRunBridge::default().with_failure("vlc", BridgeError::new("disk full"));
        let dispatcher = Dispatcher::new(Arc::new(bridge), CancelToken::new());
        let mut orch = Orchestrator::new(
            &[Operation::install("git"), Operation::uninstall("vlc")],
            Arc::new(StaticCatalog::builtin()),
            instant_config(),
        );

        let mut max_in_flight_seen = 0;
        dispatcher
            .run_until_settled(&mut orch, |o| {
                let active = o
                    .session()
                    .tasks()
                    .iter()
                    .filter(|t| t.status.is_active())
                    .count();
                max_in_flight_seen = max_in_flight_seen.max(active);
            })
            .expect("session runs");

        let tasks = orch.session().tasks();
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(tasks[1].status, TaskStatus::Failed);
        assert_eq!(tasks[1].error.as_deref(), Some("disk full"));
        assert!(orch.session().is_completed());
        assert!(max_in_flight_seen <= 1);
    }

    #[test]
    fn test_cancel_token_stops_the_queue() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let dispatcher = Dispatcher::new(Arc::new(DryRunBridge::default()), cancel);
        let mut orch = Orchestrator::new(
            &[Operation::install("git"), Operation::install("curl")],
            Arc::new(StaticCatalog::builtin()),
            OrchestratorConfig::default(),
        );

        dispatcher.start(&mut orch).expect("start");
        // First pump notices the cancellation before any stage fires
        dispatcher.pump(&mut orch, Duration::from_millis(10)).expect("pump");
        assert!(orch.session().is_quitting());
        assert!(!orch.session().is_completed());
        assert_eq!(orch.session().tasks()[1].status, TaskStatus::Pending);
    }
}
