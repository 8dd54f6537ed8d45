//! Heuristic output classifier
//!
//! Maps a raw line of package-manager output to a progress fraction and a
//! human-readable message. Patterns are checked in a fixed priority order;
//! the first match wins. A non-match is normal and carries no error.
//!
//! The classifier is advisory: the orchestrator only uses a match to raise
//! a task's progress, never to replace the stage table.

use crate::task::OperationKind;

/// Result of classifying one output line.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub progress: f64,
    pub message: String,
    pub matched: bool,
}

impl Classification {
    /// The no-match result: `(0.0, "", false)`
    pub fn none() -> Self {
        Self {
            progress: 0.0,
            message: String::new(),
            matched: false,
        }
    }

    fn hit(progress: f64, message: impl Into<String>) -> Self {
        Self {
            progress,
            message: message.into(),
            matched: true,
        }
    }
}

/// Classify a line for the given operation direction.
pub fn classify(kind: OperationKind, line: &str, app_name: &str) -> Classification {
    match kind {
        OperationKind::Install => classify_install(line, app_name),
        OperationKind::Uninstall => classify_uninstall(line, app_name),
    }
}

/// Joins a message prefix with the application name, if there is one
fn with_app(prefix: &str, app_name: &str) -> String {
    if app_name.is_empty() {
        prefix.to_string()
    } else {
        format!("{} {}", prefix, app_name)
    }
}

/// Trigger-processing lines for installs land between 0.96 and 1.0
fn install_trigger(line: &str) -> f64 {
    if line.contains("mailcap") {
        0.96
    } else if line.contains("gnome-menus") {
        0.97
    } else if line.contains("desktop-file-utils") {
        0.98
    } else if line.contains("man-db") {
        0.99
    } else if line.contains("menu") {
        1.0
    } else {
        0.96
    }
}

/// Trigger-processing lines for removals land between 0.75 and 0.82
fn uninstall_trigger(line: &str) -> f64 {
    if line.contains("mailcap") {
        0.75
    } else if line.contains("gnome-menus") {
        0.77
    } else if line.contains("desktop-file-utils") {
        0.78
    } else if line.contains("man-db") {
        0.80
    } else if line.contains("menu") {
        0.82
    } else {
        0.75
    }
}

/// Classify a line of install output.
pub fn classify_install(line: &str, app_name: &str) -> Classification {
    let line = line.trim();
    if line.is_empty() {
        return Classification::none();
    }

    if line.contains("Selecting previously unselected package") {
        Classification::hit(0.62, with_app("Selecting package", app_name))
    } else if line.contains("Reading database") {
        Classification::hit(0.65, "Reading package database")
    } else if line.contains("Preparing to unpack") {
        Classification::hit(0.68, with_app("Preparing to unpack", app_name))
    } else if line.contains("Unpacking") && !line.contains("Preparing") {
        Classification::hit(0.72, with_app("Unpacking", app_name))
    } else if line.contains("Setting up") {
        Classification::hit(0.75, with_app("Setting up", app_name))
    } else if line.contains("update-alternatives:") {
        Classification::hit(0.92, "Updating alternatives")
    } else if line.contains("Processing triggers") {
        Classification::hit(install_trigger(line), "Processing triggers")
    } else {
        Classification::none()
    }
}

/// Classify a line of uninstall output.
pub fn classify_uninstall(line: &str, app_name: &str) -> Classification {
    let line = line.trim();
    if line.is_empty() {
        return Classification::none();
    }

    if line.contains("Reading package lists") {
        Classification::hit(0.25, "Reading package lists")
    } else if line.contains("Building dependency tree") {
        Classification::hit(0.35, "Building dependency tree")
    } else if line.contains("Reading state information") {
        Classification::hit(0.45, "Reading state information")
    } else if line.contains("Preparing to remove") {
        Classification::hit(0.55, with_app("Preparing to remove", app_name))
    } else if line.contains("Removing") && (app_name.is_empty() || line.contains(app_name)) {
        Classification::hit(0.65, with_app("Removing", app_name))
    } else if line.contains("Processing triggers") {
        Classification::hit(uninstall_trigger(line), "Processing triggers")
    } else if line.contains("Purging configuration files") {
        Classification::hit(0.90, "Purging configuration files")
    } else if line.contains("no longer required") || line.contains("dpkg: warning") {
        Classification::hit(0.95, "Checking leftover dependencies")
    } else if line.contains("removed") {
        Classification::hit(1.0, with_app("Removed", app_name))
    } else {
        Classification::none()
    }
}
