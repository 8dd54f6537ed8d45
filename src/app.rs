//! Interactive progress screen
//!
//! Owns the orchestrator and its dispatcher and runs the terminal loop:
//! drain pending events, poll the keyboard, redraw.
//!
//! Leaving the screen while a bridge call is running does not abandon it.
//! The loop keeps draining until the in-flight result has been recorded,
//! unless the user presses quit a second time.

use crate::control::ExitSignal;
use crate::dispatch::Dispatcher;
use crate::error::{PkgQueueError, Result};
use crate::orchestrator::{Event, Orchestrator};
use crate::ui;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::Backend};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Keyboard poll interval; dispatcher events are drained between polls
const INPUT_POLL: Duration = Duration::from_millis(50);

/// What a key press asks the loop to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    TogglePause,
    Quit,
    Exit,
    None,
}

/// Map a key event to an action
pub fn key_action(key: KeyEvent) -> KeyAction {
    if key.kind != KeyEventKind::Press {
        return KeyAction::None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char('p') | KeyCode::Char('P') => KeyAction::TogglePause,
        KeyCode::Char('q') | KeyCode::Char('Q') => KeyAction::Quit,
        KeyCode::Esc | KeyCode::Enter => KeyAction::Exit,
        _ => KeyAction::None,
    }
}

pub struct App {
    orchestrator: Orchestrator,
    dispatcher: Dispatcher,
    /// Exit requested while a bridge call was still running
    pending_exit: Option<ExitSignal>,
}

impl App {
    pub fn new(orchestrator: Orchestrator, dispatcher: Dispatcher) -> Self {
        Self {
            orchestrator,
            dispatcher,
            pending_exit: None,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// True while a requested exit waits for the in-flight result
    pub fn is_leaving(&self) -> bool {
        self.pending_exit.is_some()
    }

    /// Start the session.
    pub fn start(&mut self) -> Result<()> {
        self.dispatcher.start(&mut self.orchestrator)
    }

    /// Process waiting events. Returns the exit signal once a requested exit
    /// has nothing left to wait for.
    pub fn tick(&mut self) -> Result<Option<ExitSignal>> {
        self.dispatcher.drain(&mut self.orchestrator)?;
        // A signal quits the session the same way the quit key does
        if self.pending_exit.is_none() && self.dispatcher.cancel_token().is_cancelled() {
            self.pending_exit = Some(ExitSignal::Return { refresh: true });
        }
        if self.pending_exit.is_some() && self.orchestrator.is_settled() {
            return Ok(self.pending_exit.take());
        }
        Ok(None)
    }

    /// Apply one key action. Returns the exit signal if the loop should stop.
    pub fn handle_action(&mut self, action: KeyAction) -> Result<Option<ExitSignal>> {
        match action {
            KeyAction::TogglePause => {
                self.dispatcher
                    .control(&mut self.orchestrator, Event::TogglePause)?;
                Ok(None)
            }
            KeyAction::Quit => {
                if let Some(signal) = self.pending_exit.take() {
                    warn!("Second quit; leaving without waiting for the running operation");
                    return Ok(Some(signal));
                }
                self.dispatcher.control(&mut self.orchestrator, Event::Quit)?;
                Ok(self.leave(ExitSignal::Return { refresh: true }))
            }
            KeyAction::Exit => {
                if self.pending_exit.is_some() {
                    return Ok(None);
                }
                let signal = self.orchestrator.request_exit();
                if matches!(signal, ExitSignal::Return { .. }) {
                    self.dispatcher.cancel_token().cancel();
                }
                Ok(self.leave(signal))
            }
            KeyAction::None => Ok(None),
        }
    }

    /// Hand back `signal` now if nothing is running, otherwise hold it
    /// until the in-flight result arrives.
    fn leave(&mut self, signal: ExitSignal) -> Option<ExitSignal> {
        if self.orchestrator.is_settled() {
            return Some(signal);
        }
        info!("Waiting for the running operation before leaving");
        self.pending_exit = Some(signal);
        None
    }

    /// Run until the user leaves the screen.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<ExitSignal> {
        info!("Starting progress screen");
        self.start()?;

        loop {
            if let Some(signal) = self.tick()? {
                info!("Leaving progress screen: {:?}", signal);
                return Ok(signal);
            }

            if event::poll(INPUT_POLL)? {
                if let TermEvent::Key(key) = event::read()? {
                    let action = key_action(key);
                    debug!("Key {:?} -> {:?}", key.code, action);
                    if let Some(signal) = self.handle_action(action)? {
                        info!("Leaving progress screen: {:?}", signal);
                        return Ok(signal);
                    }
                }
            }

            let snapshot = self.orchestrator.snapshot();
            terminal
                .draw(|f| ui::render(f, &snapshot))
                .map_err(|e| PkgQueueError::terminal(format!("Failed to draw: {}", e)))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{CancelToken, DryRunBridge};
    use crate::catalog::StaticCatalog;
    use crate::config::OrchestratorConfig;
    use crate::task::{Operation, TaskStatus};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn app(ops: &[Operation]) -> App {
        let orch = Orchestrator::new(
            ops,
            Arc::new(StaticCatalog::builtin()),
            OrchestratorConfig::default(),
        );
        let dispatcher = Dispatcher::new(Arc::new(DryRunBridge::default()), CancelToken::new());
        App::new(orch, dispatcher)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(key_action(press(KeyCode::Char('p'), KeyModifiers::NONE)), KeyAction::TogglePause);
        assert_eq!(key_action(press(KeyCode::Char('q'), KeyModifiers::NONE)), KeyAction::Quit);
        assert_eq!(key_action(press(KeyCode::Char('c'), KeyModifiers::CONTROL)), KeyAction::Quit);
        assert_eq!(key_action(press(KeyCode::Esc, KeyModifiers::NONE)), KeyAction::Exit);
        assert_eq!(key_action(press(KeyCode::Enter, KeyModifiers::NONE)), KeyAction::Exit);
        assert_eq!(key_action(press(KeyCode::Char('x'), KeyModifiers::NONE)), KeyAction::None);
    }

    #[test]
    fn test_pause_key_toggles_session() {
        let mut app = app(&[Operation::install("git")]);
        assert_eq!(app.handle_action(KeyAction::TogglePause).expect("pause"), None);
        assert!(app.orchestrator().session().is_paused());
        app.handle_action(KeyAction::TogglePause).expect("resume");
        assert!(!app.orchestrator().session().is_paused());
    }

    #[test]
    fn test_quit_key_returns_refresh() {
        let mut app = app(&[Operation::install("git")]);
        let signal = app.handle_action(KeyAction::Quit).expect("quit");
        assert_eq!(signal, Some(ExitSignal::Return { refresh: true }));
        assert!(app.orchestrator().session().is_quitting());
    }

    /// App whose bridge is slow enough to still be running when quit is pressed
    fn slow_bridge_app(ops: &[Operation]) -> App {
        let orch = Orchestrator::new(
            ops,
            Arc::new(StaticCatalog::builtin()),
            OrchestratorConfig {
                stage_delay_ms: 0,
                ..OrchestratorConfig::default()
            },
        );
        let bridge = DryRunBridge::new(Duration::from_millis(50));
        App::new(orch, Dispatcher::new(Arc::new(bridge), CancelToken::new()))
    }

    /// Tick until the first task reaches the bridge
    fn tick_until_invoked(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.orchestrator().session().tasks()[0].progress < 0.8 {
            assert!(Instant::now() < deadline, "task never reached the bridge");
            assert_eq!(app.tick().expect("tick"), None);
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_quit_waits_for_running_operation() {
        let mut app = slow_bridge_app(&[Operation::install("git"), Operation::install("curl")]);
        app.start().expect("start");
        tick_until_invoked(&mut app);

        assert_eq!(app.handle_action(KeyAction::Quit).expect("quit"), None);
        assert!(app.is_leaving());

        let deadline = Instant::now() + Duration::from_secs(5);
        let signal = loop {
            assert!(Instant::now() < deadline, "quit never settled");
            if let Some(signal) = app.tick().expect("tick") {
                break signal;
            }
            thread::sleep(Duration::from_millis(5));
        };

        assert_eq!(signal, ExitSignal::Return { refresh: true });
        let tasks = app.orchestrator().session().tasks();
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(tasks[0].progress, 1.0);
        assert_eq!(tasks[1].status, TaskStatus::Pending);
    }

    #[test]
    fn test_second_quit_leaves_immediately() {
        let mut app = slow_bridge_app(&[Operation::install("git")]);
        app.start().expect("start");
        tick_until_invoked(&mut app);

        assert_eq!(app.handle_action(KeyAction::Quit).expect("quit"), None);
        assert_eq!(app.handle_action(KeyAction::Exit).expect("exit"), None);
        let signal = app.handle_action(KeyAction::Quit).expect("force quit");
        assert_eq!(signal, Some(ExitSignal::Return { refresh: true }));
        assert!(!app.is_leaving());
    }

    #[test]
    fn test_exit_on_empty_session_finishes() {
        let mut app = app(&[]);
        match app.handle_action(KeyAction::Exit).expect("exit") {
            Some(ExitSignal::Finished(tasks)) => assert!(tasks.is_empty()),
            other => panic!("expected Finished, got {:?}", other),
        }
    }
}
