use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::task::Operation;

/// pkgqueue - Queue package installs and removals with live progress
#[derive(Parser, Debug)]
#[command(name = "pkgqueue")]
#[command(about = "Run a queue of package install/uninstall operations with staged progress")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: replay typical package-manager output instead of
    /// running apt-get, snap or flatpak.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print progress to the terminal as plain log lines instead of the TUI
    #[arg(long)]
    pub headless: bool,

    /// Orchestrator configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Operation catalog file (JSON), replaces the built-in catalog
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Write the final session snapshot to this file as JSON
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Log file used while the TUI owns the terminal
    #[arg(long, default_value = "/tmp/pkgqueue.log")]
    pub log_file: PathBuf,

    /// Catalog key to install (repeatable)
    #[arg(short, long = "install", value_name = "KEY")]
    pub install: Vec<String>,

    /// Catalog key to remove (repeatable)
    #[arg(short, long = "remove", value_name = "KEY")]
    pub remove: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List the entries of the operation catalog
    List,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Queued operations: every install first, then every removal, each in
    /// command-line order.
    pub fn operations(&self) -> Vec<Operation> {
        self.install
            .iter()
            .map(Operation::install)
            .chain(self.remove.iter().map(Operation::uninstall))
            .collect()
    }
}
