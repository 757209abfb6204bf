//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads settings and applies command-line overrides
//! 2. Builds the inventory client and run context
//! 3. Calls the engine and prints a summary
//!
//! # Async Commands
//!
//! Both commands talk to NetBox, so each handler owns a Tokio runtime for the
//! duration of the command and blocks on the engine flow.

mod backout;
mod export;

pub use backout::backout;
pub use export::export;

use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::args::{Cli, Command};
use crate::core::config::{NetBoxSettings, Settings};
use crate::engine::Context;
use crate::inventory::NetBoxClient;

/// Dispatch a parsed command line to its handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(file) = &settings.source_file {
        tracing::debug!(path = %file.display(), "settings file read");
    }

    match cli.command {
        Command::Export {
            dry_run,
            tag,
            no_push,
        } => export(settings, tag, dry_run, !no_push, cli.quiet),
        Command::Backout { path, rev } => backout(settings, path, rev, cli.quiet),
    }
}

/// Run context talking to the configured NetBox.
fn netbox_context(netbox: &NetBoxSettings) -> Result<Context> {
    let client = NetBoxClient::from_settings(netbox).context("failed to build NetBox client")?;
    Ok(Context::new(Arc::new(client)))
}
