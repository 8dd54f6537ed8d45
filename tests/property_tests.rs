//! Property-Based Tests for pkgqueue
//!
//! Uses proptest for testing invariants and edge cases
//!
//! These tests verify:
//! - Log buffer capacity and FIFO eviction
//! - Overall progress aggregation and the completed flag
//! - Classifier bounds on arbitrary input
//! - Enum string round-trips (to_string → parse)

use proptest::prelude::*;

use pkgqueue::session::mean_progress;
use pkgqueue::{
    FailureProgress, InstallMethod, LOG_CAPACITY, LogBuffer, Operation, OperationKind, Session,
    TaskStatus, classify,
};

// =============================================================================
// Strategies
// =============================================================================

fn status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Pending),
        Just(TaskStatus::Downloading),
        Just(TaskStatus::Installing),
        Just(TaskStatus::Uninstalling),
        Just(TaskStatus::Completed),
        Just(TaskStatus::Failed),
    ]
}

fn kind_strategy() -> impl Strategy<Value = OperationKind> {
    prop_oneof![Just(OperationKind::Install), Just(OperationKind::Uninstall)]
}

/// Session with one task per (status, progress) pair
fn session_from(states: &[(TaskStatus, f64)]) -> Session {
    let ops: Vec<Operation> = (0..states.len())
        .map(|i| Operation::install(format!("app{}", i)))
        .collect();
    let mut session = Session::new(&ops);
    for (id, (status, progress)) in states.iter().enumerate() {
        session.update_task(id, |t| {
            t.status = *status;
            t.progress = *progress;
        });
    }
    session
}

// =============================================================================
// Log Buffer Properties
// =============================================================================

proptest! {
    /// Log never exceeds capacity and keeps the newest non-empty entries in order
    #[test]
    fn log_keeps_newest_entries(entries in prop::collection::vec("[a-z ]{0,8}", 0..40)) {
        let mut log = LogBuffer::new();
        for entry in &entries {
            let stored = log.append(entry.clone());
            prop_assert_eq!(stored, !entry.is_empty());
            prop_assert!(log.len() <= LOG_CAPACITY);
        }

        let non_empty: Vec<String> = entries.into_iter().filter(|e| !e.is_empty()).collect();
        let skip = non_empty.len().saturating_sub(LOG_CAPACITY);
        prop_assert_eq!(log.snapshot(), non_empty[skip..].to_vec());
    }
}

// =============================================================================
// Session Aggregate Properties
// =============================================================================

proptest! {
    /// Overall progress is the mean of task progress, and recomputing is idempotent
    #[test]
    fn overall_progress_is_mean(
        states in prop::collection::vec((status_strategy(), 0.0f64..=1.0), 0..12)
    ) {
        let mut session = session_from(&states);
        let expected = mean_progress(session.tasks());
        prop_assert_eq!(session.overall_progress(), expected);

        session.recompute();
        let once = session.overall_progress();
        session.recompute();
        prop_assert_eq!(session.overall_progress(), once);
        prop_assert!((0.0..=1.0).contains(&once));
    }

    /// Completed holds exactly when every task is Completed or Failed
    #[test]
    fn completed_iff_all_terminal(
        states in prop::collection::vec((status_strategy(), 0.0f64..=1.0), 0..12)
    ) {
        let session = session_from(&states);
        let all_terminal = states
            .iter()
            .all(|(s, _)| matches!(s, TaskStatus::Completed | TaskStatus::Failed));
        prop_assert_eq!(session.is_completed(), all_terminal);
    }
}

// =============================================================================
// Classifier Properties
// =============================================================================

proptest! {
    /// Any input yields a fraction in [0, 1]; no match means (0, "")
    #[test]
    fn classifier_is_bounded(kind in kind_strategy(), line in ".{0,80}", app in "[a-z]{0,6}") {
        let c = classify(kind, &line, &app);
        prop_assert!((0.0..=1.0).contains(&c.progress));
        if !c.matched {
            prop_assert_eq!(c.progress, 0.0);
            prop_assert!(c.message.is_empty());
        }
    }

    /// Whitespace-only output never matches
    #[test]
    fn classifier_ignores_blank_lines(kind in kind_strategy(), line in "[ \t]{0,10}") {
        prop_assert!(!classify(kind, &line, "foo").matched);
    }
}

// =============================================================================
// Enum Round-Trips
// =============================================================================

proptest! {
    #[test]
    fn operation_kind_roundtrip(kind in kind_strategy()) {
        let parsed: OperationKind = kind.to_string().parse().expect("Should parse");
        prop_assert_eq!(kind, parsed);
    }

    #[test]
    fn failure_progress_roundtrip(
        policy in prop_oneof![
            Just(FailureProgress::Retain),
            Just(FailureProgress::Reset),
            Just(FailureProgress::Complete),
        ]
    ) {
        let parsed: FailureProgress = policy.to_string().parse().expect("Should parse");
        prop_assert_eq!(policy, parsed);
    }

    #[test]
    fn install_method_display_is_lowercase(
        method in prop_oneof![
            Just(InstallMethod::Apt),
            Just(InstallMethod::Snap),
            Just(InstallMethod::Flatpak),
        ]
    ) {
        let s = method.to_string();
        prop_assert_eq!(s.clone(), s.to_lowercase());
    }
}
