//! Progress screen rendering
//!
//! Renders a [`SessionSnapshot`]: overall gauge, one row per task, the
//! activity log and key hints. A critical failure replaces the whole view.

use crate::session::{CriticalFailure, SessionSnapshot};
use crate::task::Task;
use crate::theme::{Styles, status_icon, status_style};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
};

/// Render the whole screen for one snapshot
pub fn render(f: &mut Frame, snapshot: &SessionSnapshot) {
    if let Some(critical) = &snapshot.critical {
        render_critical(f, f.area(), critical);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Overall progress
            Constraint::Min(6),    // Tasks
            Constraint::Length(12), // Log (10 entries + borders)
            Constraint::Length(1), // Key hints
        ])
        .split(f.area());

    render_overall(f, chunks[0], snapshot);
    render_tasks(f, chunks[1], &snapshot.tasks);
    render_log(f, chunks[2], &snapshot.logs);
    render_hints(f, chunks[3], snapshot);
}

fn render_overall(f: &mut Frame, area: Rect, snapshot: &SessionSnapshot) {
    let title = if snapshot.completed {
        "Overall Progress - done"
    } else if snapshot.quitting {
        "Overall Progress - cancelling"
    } else if snapshot.paused {
        "Overall Progress - paused"
    } else {
        "Overall Progress"
    };
    let percent = (snapshot.overall_progress.clamp(0.0, 1.0) * 100.0).round() as u16;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::border())
                .title(title),
        )
        .gauge_style(Styles::progress())
        .percent(percent);
    f.render_widget(gauge, area);
}

/// One line per task: icon, description, status, percent and detail/error
fn task_line(task: &Task) -> Line<'static> {
    let style = status_style(task.status);
    let mut spans = vec![
        Span::styled(format!(" {} ", status_icon(task.status)), style),
        Span::styled(format!("{:<28}", task.description), Styles::text()),
        Span::styled(format!("{:<13}", task.status.label()), style),
        Span::styled(format!("{:>4}% ", task.percent()), Styles::text()),
    ];
    match &task.error {
        Some(err) => spans.push(Span::styled(err.clone(), Styles::error())),
        None => spans.push(Span::styled(task.detail.clone(), Styles::text_muted())),
    }
    if let Some(duration) = task.duration {
        spans.push(Span::styled(
            format!(" ({:.1}s)", duration.as_secs_f64()),
            Styles::text_muted(),
        ));
    }
    Line::from(spans)
}

fn render_tasks(f: &mut Frame, area: Rect, tasks: &[Task]) {
    let items: Vec<ListItem> = tasks.iter().map(|t| ListItem::new(task_line(t))).collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Styles::border())
            .title("Operations"),
    );
    f.render_widget(list, area);
}

fn render_log(f: &mut Frame, area: Rect, logs: &[String]) {
    let lines: Vec<Line> = logs.iter().map(|l| Line::from(l.clone())).collect();
    let log = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::border())
                .title("Activity"),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(log, area);
}

fn render_hints(f: &mut Frame, area: Rect, snapshot: &SessionSnapshot) {
    let text = if snapshot.completed {
        "Enter/Esc: continue"
    } else if snapshot.quitting {
        "Waiting for the running operation...  q: force quit"
    } else if snapshot.paused {
        "p: resume  q: quit  Esc: back"
    } else {
        "p: pause  q: quit  Esc: back"
    };
    let hints = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Styles::nav_hint());
    f.render_widget(hints, area);
}

fn render_critical(f: &mut Frame, area: Rect, critical: &CriticalFailure) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("  Critical failure", Styles::title())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Operation: ", Styles::warning()),
            Span::styled(critical.task.clone(), Styles::text()),
        ]),
        Line::from(vec![
            Span::styled("  Error:     ", Styles::warning()),
            Span::styled(critical.message.clone(), Styles::error()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  No further operations were run. Press Esc to exit.",
            Styles::text_muted(),
        )),
    ];
    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Styles::error())
                .title("Error"),
        )
        .style(Styles::panel_bg_danger())
        .wrap(Wrap { trim: false });
    f.render_widget(panel, area);
}
