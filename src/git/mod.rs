//! git
//!
//! Version-control workflow for inventory snapshots.
//!
//! # Responsibilities
//!
//! - Cloning or opening the snapshot working tree
//! - Clean-tree checks from `git status --porcelain`
//! - Creating or reusing the per-tag branch
//! - Committing every change with a given or derived message
//! - Pushing the tag branch and screening the push report
//!
//! # Invariants
//!
//! - No other module runs git or imports `git2`
//! - Every failed command is returned as a [`GitError`], never retried
//! - The workflow never reads record contents, only tree state and paths

mod interface;
mod message;
mod runner;

pub use interface::{
    report_has_failure_marker, CommitOutcome, Git, GitError, StatusEntry, PUSH_FAILURE_MARKERS,
};
pub use message::{
    derived_message, shorten, CommitMessage, MAX_MESSAGE_WIDTH, MESSAGE_PREFIX, TRUNCATION_MARKER,
};
pub use runner::{GitOutput, GitRunner, RecordingGit, SystemGit};
