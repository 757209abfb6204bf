//! engine::export
//!
//! Export one tag from the inventory into the snapshot repository.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use super::{Context, EngineError};
use crate::core::config::{ExportSettings, NoChangeAction};
use crate::core::records::DeviceMap;
use crate::core::types::{BranchName, Oid};
use crate::git::{CommitMessage, CommitOutcome, Git, GitError, GitRunner};
use crate::inventory::DeviceResolver;
use crate::store::RecordStore;

/// Knobs for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Write the snapshot but neither commit nor push.
    pub dry_run: bool,
    /// Push the tag branch after committing.
    pub push: bool,
    pub message: CommitMessage,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            push: true,
            message: CommitMessage::Derived,
        }
    }
}

/// How an export run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The snapshot matched the branch; nothing was committed.
    NoChanges,
    /// Committed but not pushed.
    Committed { oid: Oid },
    /// Committed and pushed.
    Pushed { oid: Oid },
    /// Dry run: `pending` paths would have been committed.
    DryRun { pending: usize },
}

impl fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportOutcome::NoChanges => write!(f, "no changes"),
            ExportOutcome::Committed { oid } => write!(f, "committed {}", oid.short(10)),
            ExportOutcome::Pushed { oid } => write!(f, "committed and pushed {}", oid.short(10)),
            ExportOutcome::DryRun { pending } => write!(f, "dry run, {pending} paths changed"),
        }
    }
}

/// Summary of an export run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub branch: BranchName,
    pub devices: usize,
    pub interfaces: usize,
    /// Every file written, `devices.json` first.
    pub files: Vec<PathBuf>,
    pub outcome: ExportOutcome,
}

/// Export the tagged interfaces and their management devices.
///
/// # Errors
///
/// Fails on the first git, inventory or filesystem error. A dirty working
/// tree or HEAD on the wrong branch stops the run before anything is written.
pub async fn export(
    ctx: &Context,
    settings: &ExportSettings,
    options: &ExportOptions,
) -> Result<ExportReport, EngineError> {
    let span = info_span!("export", tag = %settings.tag);
    run(ctx, settings, options).instrument(span).await
}

async fn run(
    ctx: &Context,
    settings: &ExportSettings,
    options: &ExportOptions,
) -> Result<ExportReport, EngineError> {
    let git = open_or_clone(settings, ctx.git_runner.clone())?;
    git.ensure_clean()?;
    git.prepare_branch(&settings.git_branch_main, &settings.tag_branch)?;

    let tag = ctx.inventory.tag(&settings.tag).await?;
    debug!(id = tag.id, name = %tag.name, "tag found");

    let interfaces = ctx.inventory.interfaces_by_tag(&tag.slug).await?;
    if interfaces.is_empty() {
        info!(tag = %tag.slug, "no interfaces carry this tag");
    } else {
        info!(count = interfaces.len(), "fetched tagged interfaces");
    }

    let mut devices = DeviceMap::new();
    let mut resolver = DeviceResolver::new(ctx.inventory.as_ref());
    for interface in &interfaces {
        let (name, record) = resolver.management_entry(interface).await?;
        debug!(interface = interface.name(), device = interface.device_name(), management = %name, "resolved");
        devices.insert(name, record);
    }
    debug!(fetched = resolver.fetched(), "device lookups");

    let store = RecordStore::new(git.work_dir());
    let mut files = vec![store.write_devices(&devices)?];
    files.extend(store.write_interfaces(&interfaces)?);
    info!(devices = devices.len(), interfaces = interfaces.len(), "snapshot written");

    let outcome = if options.dry_run {
        let pending = git.status()?.len();
        info!(pending, "dry run, not committing");
        ExportOutcome::DryRun { pending }
    } else {
        finish(&git, settings, options)?
    };

    Ok(ExportReport {
        branch: settings.tag_branch.clone(),
        devices: devices.len(),
        interfaces: interfaces.len(),
        files,
        outcome,
    })
}

/// Commit and push, or apply the no-change action.
fn finish(
    git: &Git,
    settings: &ExportSettings,
    options: &ExportOptions,
) -> Result<ExportOutcome, EngineError> {
    match git.commit_all(&options.message)? {
        CommitOutcome::NoChanges => {
            info!(branch = %settings.tag_branch, "inventory unchanged, nothing to commit");
            match settings.no_change_action {
                NoChangeAction::Keep => {}
                NoChangeAction::DeleteBranch => git.delete_branch(&settings.tag_branch)?,
            }
            Ok(ExportOutcome::NoChanges)
        }
        CommitOutcome::Committed { oid, .. } if options.push => {
            git.push_branch(&settings.tag_branch, &settings.git_remote_name)?;
            info!(branch = %settings.tag_branch, remote = %settings.git_remote_name, "pushed");
            Ok(ExportOutcome::Pushed { oid })
        }
        CommitOutcome::Committed { oid, .. } => {
            warn!(branch = %settings.tag_branch, "push skipped");
            Ok(ExportOutcome::Committed { oid })
        }
    }
}

/// Open the working tree, cloning it first when the path is missing or empty.
fn open_or_clone(settings: &ExportSettings, runner: Arc<dyn GitRunner>) -> Result<Git, GitError> {
    let path = &settings.git_local_path;
    if needs_clone(path)? {
        Git::clone_with_runner(&settings.git_remote_url, path, runner)
    } else {
        Git::open_with_runner(path, runner)
    }
}

fn needs_clone(path: &Path) -> std::io::Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    if !path.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}
