//! backout command - Push a snapshot back into NetBox

use std::path::PathBuf;

use anyhow::Result;

use super::netbox_context;
use crate::core::config::{BackoutSettings, Settings};
use crate::engine::{self, BackoutOptions};

/// Write the snapshot at `path` (or `GIT_LOCAL_PATH`) back to NetBox.
pub fn backout(
    mut settings: Settings,
    path: Option<PathBuf>,
    revision: Option<String>,
    quiet: bool,
) -> Result<()> {
    if path.is_some() {
        settings.git_local_path = path;
    }
    let settings = BackoutSettings::from_settings(&settings)?;
    let ctx = netbox_context(&settings.netbox)?;

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(engine::backout(&ctx, &settings, &BackoutOptions { revision }))?;

    if !quiet {
        println!("{} interfaces restored", report.updated());
    }
    Ok(())
}
