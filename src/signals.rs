//! Signal handling
//!
//! SIGINT/SIGTERM/SIGHUP cancel the session through its [`CancelToken`]; the
//! dispatcher turns that into a Quit on its next pass. A running package
//! manager is in its own process group and is left to finish. A second
//! signal exits immediately with `128 + signal`.

use crate::bridge::CancelToken;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::thread;
use tracing::{info, warn};

fn signal_name(sig: i32) -> &'static str {
    match sig {
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        SIGHUP => "SIGHUP",
        _ => "UNKNOWN",
    }
}

/// Install handlers that cancel `cancel`. Call once at program start.
pub fn init_signal_handlers(cancel: &CancelToken) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    let cancel = cancel.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            if cancel.is_cancelled() {
                warn!("Received {} again, exiting now", signal_name(sig));
                std::process::exit(128 + sig);
            }
            info!("Received {}, cancelling remaining operations", signal_name(sig));
            cancel.cancel();
        }
    });

    Ok(())
}
