//! export command - Snapshot a tag into the git repository

use anyhow::Result;

use super::netbox_context;
use crate::core::config::{ExportSettings, Settings};
use crate::engine::{self, ExportOptions};

/// Export one tag.
///
/// # Arguments
///
/// * `settings` - Loaded settings
/// * `tag` - Overrides `NETBOX_TAG`
/// * `dry_run` - Write files only
/// * `push` - Push after committing
/// * `quiet` - Suppress the summary
pub fn export(
    mut settings: Settings,
    tag: Option<String>,
    dry_run: bool,
    push: bool,
    quiet: bool,
) -> Result<()> {
    if tag.is_some() {
        settings.netbox_tag = tag;
    }
    let settings = ExportSettings::from_settings(&settings)?;
    let ctx = netbox_context(&settings.netbox)?;
    let options = ExportOptions {
        dry_run,
        push,
        ..ExportOptions::default()
    };

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(engine::export(&ctx, &settings, &options))?;

    if !quiet {
        println!(
            "{}: {} devices, {} interfaces, {}",
            report.branch, report.devices, report.interfaces, report.outcome
        );
    }
    Ok(())
}
