//! pkgqueue - Main entry point
//!
//! Parses the command line, wires catalog, configuration and execution
//! bridge into an orchestrator, then runs it in the TUI or headless.

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::fs::File;
use std::io::stdout;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use pkgqueue::app::App;
use pkgqueue::cli::{Cli, Commands};
use pkgqueue::error::{self, PkgQueueError};
use pkgqueue::{
    CancelToken, CommandBridge, Dispatcher, DryRunBridge, ExecutionBridge, ExitSignal,
    Orchestrator, OrchestratorConfig, SessionSnapshot, StaticCatalog,
    TaskStatus, signals,
};

/// Initialize tracing. The TUI owns the terminal, so it logs to a file.
fn init_logger(cli: &Cli) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if cli.headless || cli.command.is_some() {
        builder.with_writer(std::io::stderr).init();
    } else {
        let file = File::create(&cli.log_file)?;
        builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    init_logger(&cli)?;
    info!("pkgqueue starting up");

    let catalog = load_catalog(cli.catalog.as_deref())?;

    if cli.command == Some(Commands::List) {
        print_catalog(&catalog);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => OrchestratorConfig::load_from_file(path)?,
        None => OrchestratorConfig::default(),
    };
    debug!("Configuration: {:?}", config);

    let cancel = CancelToken::new();
    if let Err(e) = signals::init_signal_handlers(&cancel) {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    let bridge: Arc<dyn ExecutionBridge> = if cli.dry_run {
        info!("Dry-run mode: no package manager will be invoked");
        Arc::new(DryRunBridge::new(std::time::Duration::from_millis(150)))
    } else {
        Arc::new(CommandBridge::new(config.command_prefix.clone()))
    };

    let operations = cli.operations();
    let mut orchestrator = Orchestrator::new(&operations, Arc::new(catalog), config);
    let dispatcher = Dispatcher::new(bridge, cancel);

    let snapshot = if cli.headless {
        run_headless(&mut orchestrator, &dispatcher)?
    } else {
        run_tui(orchestrator, dispatcher)?
    };

    if let Some(path) = &cli.summary {
        write_summary(path, &snapshot)?;
    }

    let failed = snapshot
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Failed)
        .count();
    if let Some(critical) = &snapshot.critical {
        error!("Critical failure in {}: {}", critical.task, critical.message);
        eprintln!("✗ Critical failure in {}: {}", critical.task, critical.message);
        std::process::exit(2);
    }
    if failed > 0 || !snapshot.completed {
        eprintln!(
            "✗ {} of {} operation(s) did not complete",
            snapshot.tasks.len() - completed_count(&snapshot),
            snapshot.tasks.len()
        );
        std::process::exit(1);
    }

    println!("✓ All {} operation(s) completed", snapshot.tasks.len());
    Ok(())
}

fn completed_count(snapshot: &SessionSnapshot) -> usize {
    snapshot
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count()
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<StaticCatalog> {
    match path {
        Some(path) => {
            info!("Loading catalog from {:?}", path);
            StaticCatalog::load_from_file(path)
        }
        None => Ok(StaticCatalog::builtin()),
    }
}

fn print_catalog(catalog: &StaticCatalog) {
    for (key, entry) in catalog.iter() {
        println!(
            "{:<12} {:<20} {:<8} {}",
            key,
            entry.display_name,
            entry.method.to_string(),
            entry.description
        );
    }
}

/// Run without a TUI, echoing every log entry as it is written.
fn run_headless(
    orchestrator: &mut Orchestrator,
    dispatcher: &Dispatcher,
) -> error::Result<SessionSnapshot> {
    info!("Running headless");
    let feed = orchestrator.subscribe_logs();
    dispatcher.run_until_settled(orchestrator, |_| {
        for line in feed.try_iter() {
            println!("{}", line);
        }
    })?;
    for line in feed.try_iter() {
        println!("{}", line);
    }
    Ok(orchestrator.snapshot())
}

/// Run the interactive progress screen.
fn run_tui(orchestrator: Orchestrator, dispatcher: Dispatcher) -> error::Result<SessionSnapshot> {
    debug!("Initializing terminal for TUI mode");

    enable_raw_mode()
        .map_err(|e| PkgQueueError::terminal(format!("Failed to enable raw mode: {}", e)))?;
    crossterm::execute!(stdout(), crossterm::terminal::EnterAlternateScreen).map_err(|e| {
        PkgQueueError::terminal(format!("Failed to enter alternate screen: {}", e))
    })?;

    let mut app = App::new(orchestrator, dispatcher);
    let result = Terminal::new(CrosstermBackend::new(stdout()))
        .map_err(|e| PkgQueueError::terminal(format!("Failed to create terminal: {}", e)))
        .and_then(|mut terminal| app.run(&mut terminal));

    // Cleanup terminal (always attempt cleanup, even if app failed)
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen);

    match result? {
        ExitSignal::Finished(tasks) => info!("Session finished with {} task(s)", tasks.len()),
        ExitSignal::Return { refresh } => info!("Session abandoned (refresh: {})", refresh),
    }
    Ok(app.orchestrator().snapshot())
}

fn write_summary(path: &Path, snapshot: &SessionSnapshot) -> error::Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json)?;
    info!("Wrote session summary to {:?}", path);
    Ok(())
}
