//! Colors and styles for the progress screen
//!
//! Single place for every color the renderer uses, so task states look the
//! same in the task list, the gauges and the critical-failure view.

use crate::task::TaskStatus;
use ratatui::style::{Color, Modifier, Style};

// =============================================================================
// COLOR PALETTE
// =============================================================================

pub struct Colors;

impl Colors {
    /// Default foreground text color
    pub const FG_PRIMARY: Color = Color::White;

    /// Disabled/inactive text color
    pub const FG_MUTED: Color = Color::DarkGray;

    /// Primary accent color - used for borders, titles, highlights
    pub const PRIMARY: Color = Color::Cyan;

    /// Warning/caution feedback
    pub const WARNING: Color = Color::Yellow;

    /// Error/danger feedback
    pub const ERROR: Color = Color::Red;

    /// Warning/danger panel background
    pub const BG_DANGER: Color = Color::Rgb(30, 20, 20);

    /// Progress bar fill
    pub const PROGRESS: Color = Color::Green;

    /// Navigation hint color
    pub const NAV_HINT: Color = Color::DarkGray;

    // Task states
    pub const STEP_ACTIVE: Color = Color::Yellow;
    pub const STEP_COMPLETE: Color = Color::Green;
    pub const STEP_PENDING: Color = Color::Gray;
    pub const STEP_FAILED: Color = Color::Red;
}

// =============================================================================
// PRE-BUILT STYLES
// =============================================================================

pub struct Styles;

impl Styles {
    /// Default text style
    pub fn text() -> Style {
        Style::default().fg(Colors::FG_PRIMARY)
    }

    /// Muted/secondary text
    pub fn text_muted() -> Style {
        Style::default().fg(Colors::FG_MUTED)
    }

    /// Title style - bold accent color
    pub fn title() -> Style {
        Style::default()
            .fg(Colors::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Colors::PRIMARY)
    }

    pub fn error() -> Style {
        Style::default().fg(Colors::ERROR)
    }

    pub fn warning() -> Style {
        Style::default().fg(Colors::WARNING)
    }

    pub fn panel_bg_danger() -> Style {
        Style::default().bg(Colors::BG_DANGER)
    }

    pub fn progress() -> Style {
        Style::default().fg(Colors::PROGRESS)
    }

    pub fn nav_hint() -> Style {
        Style::default().fg(Colors::NAV_HINT)
    }
}

/// Style and icon for a task row
pub fn status_style(status: TaskStatus) -> Style {
    let color = match status {
        TaskStatus::Pending => Colors::STEP_PENDING,
        TaskStatus::Downloading | TaskStatus::Installing | TaskStatus::Uninstalling => {
            Colors::STEP_ACTIVE
        }
        TaskStatus::Completed => Colors::STEP_COMPLETE,
        TaskStatus::Failed => Colors::STEP_FAILED,
    };
    Style::default().fg(color)
}

pub fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "○",
        TaskStatus::Downloading | TaskStatus::Installing | TaskStatus::Uninstalling => "◐",
        TaskStatus::Completed => "✓",
        TaskStatus::Failed => "✗",
    }
}
