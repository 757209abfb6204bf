//! engine
//!
//! Sequences the inventory, record store and git layers into runs.
//!
//! # Flows
//!
//! ```text
//! export:  open/clone -> ensure_clean -> prepare_branch -> pull inventory
//!          -> write records -> commit_all -> push_branch
//! backout: [checkout revision] -> read records -> strip fields -> update inventory
//! ```
//!
//! Each flow stops at the first error. Nothing already written to disk,
//! committed or created as a branch is rolled back.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use netboxgit::engine::{export, Context, ExportOptions};
//! use netboxgit::inventory::NetBoxClient;
//!
//! let ctx = Context::new(Arc::new(NetBoxClient::from_settings(&settings.netbox)?));
//! let report = export(&ctx, &settings, &ExportOptions::default()).await?;
//! println!("{}", report.outcome);
//! ```

pub mod backout;
pub mod export;

pub use backout::{backout, BackoutOptions, BackoutReport};
pub use export::{export, ExportOptions, ExportOutcome, ExportReport};

use std::sync::Arc;

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::git::{GitError, GitRunner, SystemGit};
use crate::inventory::{Inventory, InventoryError};
use crate::store::StoreError;

/// Errors from a run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// At least one interface of a backout was not written.
    #[error("backout incomplete: {failed} of {total} interfaces were not updated")]
    BackoutIncomplete { failed: usize, total: usize },
}

/// Collaborators shared by every step of a run.
#[derive(Clone)]
pub struct Context {
    pub inventory: Arc<dyn Inventory>,
    pub git_runner: Arc<dyn GitRunner>,
}

impl Context {
    /// Context running the system `git`.
    pub fn new(inventory: Arc<dyn Inventory>) -> Self {
        Self {
            inventory,
            git_runner: Arc::new(SystemGit),
        }
    }

    pub fn with_git_runner(mut self, runner: Arc<dyn GitRunner>) -> Self {
        self.git_runner = runner;
        self
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("inventory", &self.inventory.name())
            .field("git_runner", &self.git_runner)
            .finish()
    }
}
