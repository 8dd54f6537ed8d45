//! Orchestration session
//!
//! The session exclusively owns the task arena, the activity log and the
//! aggregate flags. Every task mutation goes through [`Session::update_task`],
//! which recomputes the aggregates afterwards, so `overall_progress` and
//! `completed` are never stale.
//!
//! # Invariants
//!
//! - `overall_progress` is the arithmetic mean of all task progress values
//!   (1.0 for an empty session)
//! - `completed` is true iff every task is Completed or Failed
//! - the log never holds more than 10 entries, and never an empty one

use crate::control::ControlState;
use crate::log_buffer::LogBuffer;
use crate::task::{Operation, Task, TaskId, TaskStatus};
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};

/// Terminal failure state of a session ended by a critical error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalFailure {
    pub task: String,
    pub message: String,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub tasks: Vec<Task>,
    pub overall_progress: f64,
    pub completed: bool,
    pub paused: bool,
    pub quitting: bool,
    pub logs: Vec<String>,
    pub critical: Option<CriticalFailure>,
}

#[derive(Debug, Clone)]
pub struct Session {
    tasks: Vec<Task>,
    overall_progress: f64,
    completed: bool,
    control: ControlState,
    logs: LogBuffer,
    critical: Option<CriticalFailure>,
    feed: Option<Sender<String>>,
}

impl Session {
    /// Create a session with one pending task per operation, in caller order.
    pub fn new(operations: &[Operation]) -> Self {
        let mut session = Self {
            tasks: operations.iter().map(Task::new).collect(),
            overall_progress: 0.0,
            completed: false,
            control: ControlState::new(),
            logs: LogBuffer::new(),
            critical: None,
            feed: None,
        };
        session.recompute();
        session
    }

    /// Recompute the aggregates from the current task list.
    pub fn recompute(&mut self) {
        self.overall_progress = mean_progress(&self.tasks);
        self.completed = self.tasks.iter().all(Task::is_terminal);
    }

    /// Apply a mutation to one task and recompute the aggregates.
    ///
    /// Returns false if the id is out of range.
    pub fn update_task<F>(&mut self, id: TaskId, f: F) -> bool
    where
        F: FnOnce(&mut Task),
    {
        let Some(task) = self.tasks.get_mut(id) else {
            return false;
        };
        f(task);
        self.recompute();
        true
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// First task still waiting in the queue
    pub fn next_pending(&self) -> Option<TaskId> {
        self.tasks
            .iter()
            .position(|t| t.status == TaskStatus::Pending)
    }

    #[inline]
    pub fn overall_progress(&self) -> f64 {
        self.overall_progress
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    #[inline]
    pub fn is_quitting(&self) -> bool {
        self.control.is_quitting()
    }

    pub fn control(&self) -> &ControlState {
        &self.control
    }

    pub(crate) fn control_mut(&mut self) -> &mut ControlState {
        &mut self.control
    }

    /// Append to the activity log. Empty entries are dropped.
    ///
    /// Stored entries are also forwarded to the log feed, if one is open.
    pub fn log(&mut self, entry: impl Into<String>) -> bool {
        let entry = entry.into();
        if let Some(feed) = &self.feed {
            if !entry.is_empty() && feed.send(entry.clone()).is_err() {
                self.feed = None;
            }
        }
        self.logs.append(entry)
    }

    /// Open a feed that receives every log entry appended from now on.
    ///
    /// The ring only keeps the newest entries; the feed sees all of them, so
    /// a host that prints the log never misses a line. Replaces any earlier
    /// feed.
    pub fn subscribe_logs(&mut self) -> Receiver<String> {
        let (tx, rx) = mpsc::channel();
        self.feed = Some(tx);
        rx
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.snapshot()
    }

    pub fn critical(&self) -> Option<&CriticalFailure> {
        self.critical.as_ref()
    }

    pub(crate) fn set_critical(&mut self, failure: CriticalFailure) {
        self.critical = Some(failure);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tasks: self.tasks.clone(),
            overall_progress: self.overall_progress,
            completed: self.completed,
            paused: self.control.is_paused(),
            quitting: self.control.is_quitting(),
            logs: self.logs.snapshot(),
            critical: self.critical.clone(),
        }
    }
}

/// Mean of task progress values; an empty list counts as fully done.
pub fn mean_progress(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 1.0;
    }
    tasks.iter().map(|t| t.progress).sum::<f64>() / tasks.len() as f64
}
