//! Stage tables
//!
//! Each operation kind has a fixed table of synthetic progress announcements
//! that precede the real bridge call. Every entry is a `(delay, progress,
//! message)` record; the sequencer walks the table by index, so the table is
//! data, not control flow.
//!
//! The fractions and messages are a fixed contract and must not change.

use crate::task::{OperationKind, TaskStatus};
use std::time::Duration;

/// One timed progress announcement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage {
    /// Wait before this announcement, at the nominal pace
    pub delay: Duration,
    pub progress: f64,
    pub message: &'static str,
    /// Status the task carries while this stage is current
    pub status: TaskStatus,
}

/// Pace the stage tables are written against
pub const NOMINAL_STAGE_DELAY: Duration = Duration::from_millis(500);

const INSTALL_STAGES: [Stage; 4] = [
    Stage {
        delay: NOMINAL_STAGE_DELAY,
        progress: 0.1,
        message: "Preparing installation…",
        status: TaskStatus::Downloading,
    },
    Stage {
        delay: NOMINAL_STAGE_DELAY,
        progress: 0.3,
        message: "Downloading packages…",
        status: TaskStatus::Downloading,
    },
    Stage {
        delay: NOMINAL_STAGE_DELAY,
        progress: 0.6,
        message: "Installing application…",
        status: TaskStatus::Installing,
    },
    Stage {
        delay: NOMINAL_STAGE_DELAY,
        progress: 0.8,
        message: "Configuring application…",
        status: TaskStatus::Installing,
    },
];

const UNINSTALL_STAGES: [Stage; 4] = [
    Stage {
        delay: NOMINAL_STAGE_DELAY,
        progress: 0.2,
        message: "Preparing uninstallation…",
        status: TaskStatus::Uninstalling,
    },
    Stage {
        delay: NOMINAL_STAGE_DELAY,
        progress: 0.4,
        message: "Checking dependencies…",
        status: TaskStatus::Uninstalling,
    },
    Stage {
        delay: NOMINAL_STAGE_DELAY,
        progress: 0.6,
        message: "Removing package…",
        status: TaskStatus::Uninstalling,
    },
    Stage {
        delay: NOMINAL_STAGE_DELAY,
        progress: 0.8,
        message: "Cleaning up configuration…",
        status: TaskStatus::Uninstalling,
    },
];

/// Returns the stage table for an operation kind
pub const fn stages_for(kind: OperationKind) -> &'static [Stage] {
    match kind {
        OperationKind::Install => &INSTALL_STAGES,
        OperationKind::Uninstall => &UNINSTALL_STAGES,
    }
}

/// Status a task enters when its sequence starts, before the first stage fires
pub const fn initial_status(kind: OperationKind) -> TaskStatus {
    match kind {
        OperationKind::Install => TaskStatus::Downloading,
        OperationKind::Uninstall => TaskStatus::Uninstalling,
    }
}

/// Scales the nominal table delays to the configured pace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    /// Configured delay for a stage written at [`NOMINAL_STAGE_DELAY`]
    pub per_stage: Duration,
}

impl StageTiming {
    pub const fn new(per_stage: Duration) -> Self {
        Self { per_stage }
    }

    /// Delay before `stage` fires
    pub fn delay_for(&self, stage: &Stage) -> Duration {
        let nanos = stage.delay.as_nanos() * self.per_stage.as_nanos()
            / NOMINAL_STAGE_DELAY.as_nanos();
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fractions(kind: OperationKind) -> Vec<f64> {
        stages_for(kind).iter().map(|s| s.progress).collect()
    }

    #[test]
    fn test_install_table_is_fixed() {
        assert_eq!(fractions(OperationKind::Install), vec![0.1, 0.3, 0.6, 0.8]);
        let messages: Vec<&str> = stages_for(OperationKind::Install)
            .iter()
            .map(|s| s.message)
            .collect();
        assert_eq!(
            messages,
            vec![
                "Preparing installation…",
                "Downloading packages…",
                "Installing application…",
                "Configuring application…",
            ]
        );
    }

    #[test]
    fn test_uninstall_table_is_fixed() {
        assert_eq!(fractions(OperationKind::Uninstall), vec![0.2, 0.4, 0.6, 0.8]);
        assert_eq!(
            stages_for(OperationKind::Uninstall)[3].message,
            "Cleaning up configuration…"
        );
    }

    #[test]
    fn test_progress_increases_within_each_table() {
        for kind in [OperationKind::Install, OperationKind::Uninstall] {
            let f = fractions(kind);
            assert!(f.windows(2).all(|w| w[0] < w[1]), "{kind} not increasing");
        }
    }

    #[test]
    fn test_install_statuses_move_from_download_to_install() {
        let statuses: Vec<TaskStatus> = stages_for(OperationKind::Install)
            .iter()
            .map(|s| s.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                TaskStatus::Downloading,
                TaskStatus::Downloading,
                TaskStatus::Installing,
                TaskStatus::Installing,
            ]
        );
    }

    #[test]
    fn test_delays_scale_to_configured_pace() {
        let stage = stages_for(OperationKind::Install)[0];
        assert_eq!(stage.delay, NOMINAL_STAGE_DELAY);

        let nominal = StageTiming::new(NOMINAL_STAGE_DELAY);
        assert_eq!(nominal.delay_for(&stage), Duration::from_millis(500));

        let fast = StageTiming::new(Duration::from_millis(300));
        assert_eq!(fast.delay_for(&stage), Duration::from_millis(300));

        let instant = StageTiming::new(Duration::ZERO);
        assert!(instant.delay_for(&stage).is_zero());

        let long = Stage {
            delay: Duration::from_millis(1000),
            ..stage
        };
        assert_eq!(fast.delay_for(&long), Duration::from_millis(600));
    }
}
