//! cli
//!
//! Command-line interface for nbgit.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Build the logging context for this run
//! - Delegate to command handlers
//!
//! # Logging
//!
//! No global logger is installed. A subscriber is built per run and made the
//! default only while the command executes, via
//! [`tracing::subscriber::with_default`]. Tasks spawned onto runtime worker
//! threads do not inherit it.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Environment variable that turns on debug logging when non-empty.
pub const DEBUG_ENV: &str = "DEBUG";

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let debug = cli.debug || std::env::var_os(DEBUG_ENV).is_some_and(|v| !v.is_empty());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(debug, cli.quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || commands::dispatch(cli))
}

/// Filter for the run: `RUST_LOG` directives unless debug or quiet is forced.
fn log_filter(debug: bool, quiet: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}
