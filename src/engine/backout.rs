//! engine::backout
//!
//! Push a snapshot back into the inventory.
//!
//! The snapshot is read from the working tree as it is on disk, or at a given
//! revision when one is requested, after which HEAD goes back to where it
//! was. Records are stripped of the fields the
//! inventory refuses on write, then sent one device at a time.

use tracing::{debug, error, info, info_span, warn, Instrument};

use super::{Context, EngineError};
use crate::core::config::BackoutSettings;
use crate::core::records::InterfaceIndex;
use crate::git::Git;
use crate::inventory::{adapt_for_write, InterfaceUpdate, UpdateStatus};
use crate::store::RecordStore;

#[derive(Debug, Clone, Default)]
pub struct BackoutOptions {
    /// Read the snapshot as of this revision. HEAD is restored afterwards.
    pub revision: Option<String>,
}

/// Per-interface results of a backout.
#[derive(Debug, Clone, Default)]
pub struct BackoutReport {
    pub updates: Vec<InterfaceUpdate>,
}

impl BackoutReport {
    pub fn updated(&self) -> usize {
        self.updates
            .iter()
            .filter(|u| u.status == UpdateStatus::Updated)
            .count()
    }

    /// Updates that did not go through.
    pub fn failures(&self) -> impl Iterator<Item = &InterfaceUpdate> {
        self.updates
            .iter()
            .filter(|u| u.status != UpdateStatus::Updated)
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Write every interface of the snapshot back to the inventory.
///
/// # Errors
///
/// Returns [`EngineError::BackoutIncomplete`] after all devices were tried if
/// any interface was rejected or no longer exists. Lookup failures stop the
/// run at once.
pub async fn backout(
    ctx: &Context,
    settings: &BackoutSettings,
    options: &BackoutOptions,
) -> Result<BackoutReport, EngineError> {
    let span = info_span!("backout", path = %settings.git_local_path.display());
    run(ctx, settings, options).instrument(span).await
}

async fn run(
    ctx: &Context,
    settings: &BackoutSettings,
    options: &BackoutOptions,
) -> Result<BackoutReport, EngineError> {
    let index = match &options.revision {
        Some(rev) => read_at_revision(ctx, settings, rev)?,
        None => RecordStore::new(&settings.git_local_path).read_interfaces()?,
    };
    let total: usize = index.values().map(|interfaces| interfaces.len()).sum();
    info!(devices = index.len(), interfaces = total, "snapshot read");

    let mut report = BackoutReport::default();
    for (device, payloads) in adapt_for_write(index) {
        let updates = ctx.inventory.update_interfaces(&device, &payloads).await?;
        for update in &updates {
            match &update.status {
                UpdateStatus::Updated => {}
                UpdateStatus::Missing => {
                    warn!(device = %update.device, interface = %update.interface, "interface not found in inventory")
                }
                UpdateStatus::Failed(message) => {
                    error!(device = %update.device, interface = %update.interface, %message, "update rejected")
                }
            }
        }
        report.updates.extend(updates);
    }

    let failed = report.failures().count();
    if failed > 0 {
        let err = EngineError::BackoutIncomplete {
            failed,
            total: report.updates.len(),
        };
        error!("{err}");
        return Err(err);
    }

    info!(updated = report.updated(), "backout complete");
    Ok(report)
}

/// Read the snapshot as of `rev`, then put HEAD back where it was.
fn read_at_revision(
    ctx: &Context,
    settings: &BackoutSettings,
    rev: &str,
) -> Result<InterfaceIndex, EngineError> {
    let git = Git::open_with_runner(&settings.git_local_path, ctx.git_runner.clone())?;
    let position = git.head_position()?;
    git.checkout_revision(rev)?;

    let read = RecordStore::new(git.work_dir()).read_interfaces();
    git.restore_head(&position)?;
    debug!(%position, "HEAD restored");
    Ok(read?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(status: UpdateStatus) -> InterfaceUpdate {
        InterfaceUpdate {
            device: "sw1".into(),
            interface: "eth0".into(),
            status,
        }
    }

    #[test]
    fn report_counts() {
        let report = BackoutReport {
            updates: vec![
                update(UpdateStatus::Updated),
                update(UpdateStatus::Missing),
                update(UpdateStatus::Failed("bad".into())),
            ],
        };
        assert_eq!(report.updated(), 1);
        assert_eq!(report.failures().count(), 2);
        assert!(!report.is_complete());
    }

    #[test]
    fn empty_report_is_complete() {
        assert!(BackoutReport::default().is_complete());
    }
}
