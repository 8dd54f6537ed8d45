//! Session control state
//!
//! Pause is cooperative between tasks: it only stops the queue from starting
//! the next task. Quit stops every further stage announcement and queue
//! advance; an in-flight bridge call is left to finish on its own.

use crate::task::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    paused: bool,
    quitting: bool,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn is_quitting(&self) -> bool {
        self.quitting
    }

    /// Flip the pause flag, returning the new value
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Mark the session as quitting. One-way.
    pub fn quit(&mut self) {
        self.quitting = true;
    }

    /// True if the queue may start another task
    #[inline]
    pub fn may_advance(&self) -> bool {
        !self.paused && !self.quitting
    }

    /// True if stage announcements may still be scheduled
    #[inline]
    pub fn may_schedule(&self) -> bool {
        !self.quitting
    }
}

/// What the caller should do after an exit request.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitSignal {
    /// The session completed; move on with the final task list
    Finished(Vec<Task>),
    /// The session did not complete; return to the caller
    Return { refresh: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_blocks_advance_but_not_scheduling() {
        let mut control = ControlState::new();
        assert!(control.may_advance());

        assert!(control.toggle_pause());
        assert!(!control.may_advance());
        assert!(control.may_schedule());

        assert!(!control.toggle_pause());
        assert!(control.may_advance());
    }

    #[test]
    fn test_quit_blocks_everything() {
        let mut control = ControlState::new();
        control.quit();
        assert!(control.is_quitting());
        assert!(!control.may_advance());
        assert!(!control.may_schedule());
    }
}
