//! Execution bridge
//!
//! The bridge performs the actual install or removal for one package. It is
//! a shared, read-only collaborator: it never touches task state, it only
//! returns success or a textual error and streams output lines back through
//! a callback.
//!
//! # Cancellation
//!
//! The [`CancelToken`] is the only cancellation channel into the bridge.
//! Cancellation means "stop scheduling more work"; a package-manager process
//! already running is allowed to finish.

use crate::catalog::{CatalogEntry, InstallMethod};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Program-wide cancellation flag, shared between the signal handler, the
/// dispatch loop and the bridge.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A failed bridge call.
///
/// `fatal` lets a bridge mark a failure as ending the whole session without
/// relying on the error text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BridgeError {
    pub message: String,
    pub fatal: bool,
}

impl BridgeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: true,
        }
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReceipt {
    pub package: String,
    pub method: InstallMethod,
}

/// Performs package operations for the orchestrator.
pub trait ExecutionBridge: Send + Sync {
    fn install(
        &self,
        cancel: &CancelToken,
        key: &str,
        entry: &CatalogEntry,
        output: &mut dyn FnMut(&str),
    ) -> Result<InstallReceipt, BridgeError>;

    fn remove(
        &self,
        cancel: &CancelToken,
        key: &str,
        entry: &CatalogEntry,
        output: &mut dyn FnMut(&str),
    ) -> Result<(), BridgeError>;
}

/// Bridge that runs the real package manager for each install method.
#[derive(Debug, Clone, Default)]
pub struct CommandBridge {
    /// Privilege wrapper prepended to every command (e.g. `sudo`)
    prefix: Vec<String>,
}

impl CommandBridge {
    pub fn new(prefix: Vec<String>) -> Self {
        Self { prefix }
    }

    /// Full argv for installing an entry
    pub fn install_command(&self, key: &str, entry: &CatalogEntry) -> Vec<String> {
        let package = entry.package_name(key).to_string();
        let tail: Vec<String> = match entry.method {
            InstallMethod::Apt => vec!["apt-get".into(), "install".into(), "-y".into(), package],
            InstallMethod::Snap => vec!["snap".into(), "install".into(), package],
            InstallMethod::Flatpak => vec![
                "flatpak".into(),
                "install".into(),
                "-y".into(),
                entry.source.clone(),
                package,
            ],
        };
        self.prefix.iter().cloned().chain(tail).collect()
    }

    /// Full argv for removing an entry
    pub fn remove_command(&self, key: &str, entry: &CatalogEntry) -> Vec<String> {
        let package = entry.package_name(key).to_string();
        let tail: Vec<String> = match entry.method {
            InstallMethod::Apt => vec!["apt-get".into(), "remove".into(), "-y".into(), package],
            InstallMethod::Snap => vec!["snap".into(), "remove".into(), package],
            InstallMethod::Flatpak => {
                vec!["flatpak".into(), "uninstall".into(), "-y".into(), package]
            }
        };
        self.prefix.iter().cloned().chain(tail).collect()
    }

    /// Run a command to completion, streaming stdout lines to `output`.
    fn run(
        &self,
        argv: &[String],
        cancel: &CancelToken,
        output: &mut dyn FnMut(&str),
    ) -> Result<(), BridgeError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| BridgeError::new("Empty command line"))?;

        info!("Running package command: {:?}", argv);

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env("DEBIAN_FRONTEND", "noninteractive")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group: a Ctrl-C on the terminal must not kill the package manager
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| BridgeError::new(format!("Failed to spawn {}: {}", program, e)))?;

        // Drain stderr on its own thread so a full pipe never blocks the child
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let mut warned = false;
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                output(&line);
                if cancel.is_cancelled() && !warned {
                    warn!("Cancellation requested; waiting for {} to finish", program);
                    warned = true;
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| BridgeError::new(format!("Failed waiting for {}: {}", program, e)))?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            debug!("{} exited successfully", program);
            return Ok(());
        }

        let message = stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                format!("{} exited with code {}", program, status.code().unwrap_or(-1))
            });
        Err(BridgeError::new(message))
    }
}

impl ExecutionBridge for CommandBridge {
    fn install(
        &self,
        cancel: &CancelToken,
        key: &str,
        entry: &CatalogEntry,
        output: &mut dyn FnMut(&str),
    ) -> Result<InstallReceipt, BridgeError> {
        self.run(&self.install_command(key, entry), cancel, output)?;
        Ok(InstallReceipt {
            package: entry.package_name(key).to_string(),
            method: entry.method,
        })
    }

    fn remove(
        &self,
        cancel: &CancelToken,
        key: &str,
        entry: &CatalogEntry,
        output: &mut dyn FnMut(&str),
    ) -> Result<(), BridgeError> {
        self.run(&self.remove_command(key, entry), cancel, output)
    }
}

/// Bridge that replays typical package-manager output without touching the
/// system. Individual keys can be scripted to fail.
#[derive(Debug, Clone, Default)]
pub struct DryRunBridge {
    line_delay: Duration,
    failures: BTreeMap<String, BridgeError>,
}

impl DryRunBridge {
    pub fn new(line_delay: Duration) -> Self {
        Self {
            line_delay,
            failures: BTreeMap::new(),
        }
    }

    /// Make every operation on `key` fail with `error`
    pub fn with_failure(mut self, key: impl Into<String>, error: BridgeError) -> Self {
        self.failures.insert(key.into(), error);
        self
    }

    fn replay(&self, lines: &[String], cancel: &CancelToken, output: &mut dyn FnMut(&str)) {
        for line in lines {
            if cancel.is_cancelled() {
                break;
            }
            if !self.line_delay.is_zero() {
                thread::sleep(self.line_delay);
            }
            output(line);
        }
    }

    fn outcome(&self, key: &str) -> Result<(), BridgeError> {
        match self.failures.get(key) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl ExecutionBridge for DryRunBridge {
    fn install(
        &self,
        cancel: &CancelToken,
        key: &str,
        entry: &CatalogEntry,
        output: &mut dyn FnMut(&str),
    ) -> Result<InstallReceipt, BridgeError> {
        let pkg = entry.package_name(key);
        let lines = [
            format!("Selecting previously unselected package {}.", pkg),
            "(Reading database ... 100000 files and directories currently installed.)".into(),
            format!("Preparing to unpack .../{}_1.0_amd64.deb ...", pkg),
            format!("Unpacking {} (1.0) ...", pkg),
            format!("Setting up {} (1.0) ...", pkg),
            "Processing triggers for man-db (2.10.2-1) ...".into(),
        ];
        self.replay(&lines, cancel, output);
        self.outcome(key)?;
        Ok(InstallReceipt {
            package: pkg.to_string(),
            method: entry.method,
        })
    }

    fn remove(
        &self,
        cancel: &CancelToken,
        key: &str,
        entry: &CatalogEntry,
        output: &mut dyn FnMut(&str),
    ) -> Result<(), BridgeError> {
        let pkg = entry.package_name(key);
        let lines = [
            "Reading package lists... Done".to_string(),
            "Building dependency tree... Done".into(),
            "Reading state information... Done".into(),
            format!("Removing {} (1.0) ...", pkg),
            "Processing triggers for man-db (2.10.2-1) ...".into(),
        ];
        self.replay(&lines, cancel, output);
        self.outcome(key)
    }
}
