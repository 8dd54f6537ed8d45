//! Orchestrator configuration file handling.
//!
//! The file is JSON; every field is optional and falls back to its default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::stages::StageTiming;

/// Longest accepted delay between stage announcements
pub const MAX_STAGE_DELAY_MS: u64 = 10_000;

/// What happens to a task's progress when it fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FailureProgress {
    /// Keep the last reported fraction (shows how far it got)
    #[default]
    Retain,
    /// Drop back to 0.0
    Reset,
    /// Fill to 1.0
    Complete,
}

impl FailureProgress {
    /// Progress a failed task ends with, given where it was
    pub fn apply(self, current: f64) -> f64 {
        match self {
            Self::Retain => current,
            Self::Reset => 0.0,
            Self::Complete => 1.0,
        }
    }
}

/// Orchestrator configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Delay before each stage announcement, in milliseconds
    pub stage_delay_ms: u64,
    pub failure_progress: FailureProgress,
    /// Substrings that mark a bridge error as critical
    pub critical_markers: Vec<String>,
    /// Privilege wrapper for real package-manager commands (e.g. `["sudo"]`)
    pub command_prefix: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stage_delay_ms: 500,
            failure_progress: FailureProgress::Retain,
            critical_markers: vec!["CRITICAL".to_string(), "SYSTEM".to_string()],
            command_prefix: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_timing(&self) -> StageTiming {
        StageTiming::new(Duration::from_millis(self.stage_delay_ms))
    }

    /// True if the error text carries one of the critical markers
    pub fn is_critical_text(&self, text: &str) -> bool {
        self.critical_markers
            .iter()
            .any(|marker| !marker.is_empty() && text.contains(marker.as_str()))
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.stage_delay_ms > MAX_STAGE_DELAY_MS {
            anyhow::bail!(
                "stage_delay_ms must be at most {} (got {})",
                MAX_STAGE_DELAY_MS,
                self.stage_delay_ms
            );
        }

        if self.critical_markers.iter().any(|m| m.trim().is_empty()) {
            anyhow::bail!("critical_markers must not contain blank entries");
        }

        if self.command_prefix.iter().any(|p| p.trim().is_empty()) {
            anyhow::bail!("command_prefix must not contain blank entries");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.stage_delay_ms, 500);
        assert_eq!(config.failure_progress, FailureProgress::Retain);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_failure_progress_policies() {
        assert_eq!(FailureProgress::Retain.apply(0.8), 0.8);
        assert_eq!(FailureProgress::Reset.apply(0.8), 0.0);
        assert_eq!(FailureProgress::Complete.apply(0.8), 1.0);
        assert_eq!("reset".parse::<FailureProgress>().ok(), Some(FailureProgress::Reset));
    }

    #[test]
    fn test_critical_markers() {
        let config = OrchestratorConfig::default();
        assert!(config.is_critical_text("CRITICAL: dpkg database locked"));
        assert!(config.is_critical_text("SYSTEM failure"));
        assert!(!config.is_critical_text("disk full"));

        let config = OrchestratorConfig {
            critical_markers: Vec::new(),
            ..OrchestratorConfig::default()
        };
        assert!(!config.is_critical_text("CRITICAL"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{ "stage_delay_ms": 0 }"#).expect("parse");
        assert_eq!(config.stage_delay_ms, 0);
        assert_eq!(config.critical_markers.len(), 2);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = OrchestratorConfig {
            stage_delay_ms: MAX_STAGE_DELAY_MS + 1,
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = OrchestratorConfig {
            critical_markers: vec![" ".to_string()],
            ..OrchestratorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = serde_json::from_str::<OrchestratorConfig>(r#"{ "theme": "dark" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pkgqueue.json");
        let config = OrchestratorConfig {
            stage_delay_ms: 250,
            failure_progress: FailureProgress::Reset,
            critical_markers: vec!["FATAL".to_string()],
            command_prefix: vec!["sudo".to_string()],
        };
        config.save_to_file(&path).expect("save");
        assert_eq!(OrchestratorConfig::load_from_file(&path).expect("load"), config);
    }
}
