//! git::interface
//!
//! The version-control workflow behind every export.
//!
//! # Architecture
//!
//! The `Git` struct is the only way the rest of the crate touches a working
//! tree. Repository discovery and HEAD inspection go through `git2`; every
//! step that changes the tree or talks to a remote is one `git` command run
//! through a [`GitRunner`], whose output is interpreted here.
//!
//! # Workflow
//!
//! ```text
//! open/clone -> ensure_clean -> prepare_branch -> (records written) -> commit_all -> push_branch
//! ```
//!
//! Nothing is retried. Every failed command becomes a [`GitError`] and is
//! returned to the caller.
//!
//! # Concurrency
//!
//! Operations on one working tree must not overlap. No locking is done here:
//! running two exports against the same path at once is the caller's problem
//! (one path per run, or an external lock).
//!
//! # Example
//!
//! ```ignore
//! use netboxgit::git::{CommitMessage, CommitOutcome, Git};
//!
//! let git = Git::open(Path::new("/srv/inventory"))?;
//! git.ensure_clean()?;
//! git.prepare_branch(&main, &tag_branch)?;
//! // ... write records ...
//! if let CommitOutcome::Committed { .. } = git.commit_all(&CommitMessage::Derived)? {
//!     git.push_branch(&tag_branch, "origin")?;
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::message::{derived_message, CommitMessage};
use super::runner::{GitOutput, GitRunner, SystemGit};
use crate::core::types::{BranchName, Oid, TypeError};

/// Case-insensitive markers that flag a push report as failed.
///
/// This is a plain substring scan of the report. It can misfire when a marker
/// appears in text the remote echoes back (a ref name, a hook message).
pub const PUSH_FAILURE_MARKERS: [&str; 3] = ["failed", "error", "rejected"];

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The path is not a git working tree.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported: {path}")]
    BareRepo { path: PathBuf },

    /// Working tree has modified, staged or untracked paths.
    #[error("working tree is dirty: {details}")]
    DirtyWorktree { details: String },

    /// HEAD is not on the branch new tag branches are created from.
    #[error("expected to be on branch '{expected}' but HEAD is on {actual}")]
    WrongBaseBranch { expected: String, actual: String },

    /// Switching to the tag branch did not leave HEAD on it.
    #[error("failed to check out branch '{branch}': {message}")]
    BranchCheckout { branch: String, message: String },

    /// Clone or push could not reach the remote.
    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// The push report contained a failure marker.
    #[error("push of '{branch}' to '{remote}' reported a failure: {report}")]
    PushRejected {
        remote: String,
        branch: String,
        report: String,
    },

    /// A revision argument git would read as an option.
    #[error("invalid revision '{rev}'")]
    InvalidRevision { rev: String },

    /// A local git command exited non-zero.
    #[error("'git {command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// The git executable could not be started.
    #[error("could not run git: {0}")]
    Spawn(#[from] std::io::Error),

    /// Invalid object id returned by git.
    #[error(transparent)]
    InvalidType(#[from] TypeError),

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal { message: String },
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

/// One line of `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// The two-character status code, e.g. `??`, ` M`, `A `.
    pub code: String,
    /// The path, with the status code and separator stripped.
    pub path: String,
}

impl StatusEntry {
    /// Parse one porcelain line. Returns `None` for lines too short to carry a path.
    pub fn parse(line: &str) -> Option<Self> {
        let code = line.get(..2)?;
        let path = line.get(3..)?;
        if path.is_empty() {
            return None;
        }
        Some(Self {
            code: code.to_string(),
            path: path.to_string(),
        })
    }
}

/// Result of [`Git::commit_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The tree was clean, no commit was created.
    NoChanges,
    /// One commit was created holding every pending change.
    Committed { oid: Oid, message: String },
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }
}

/// Handle onto one git working tree.
pub struct Git {
    repo: git2::Repository,
    work_dir: PathBuf,
    runner: Arc<dyn GitRunner>,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("work_dir", &self.work_dir)
            .field("runner", &self.runner)
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Opening and cloning
    // =========================================================================

    /// Attach to an existing working tree. Branch state is not checked.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` is not the top of a working tree
    /// - [`GitError::BareRepo`] if the repository has no working tree
    pub fn open(path: &Path) -> Result<Self, GitError> {
        Self::open_with_runner(path, Arc::new(SystemGit))
    }

    /// Like [`Git::open`], running commands through `runner`.
    pub fn open_with_runner(path: &Path, runner: Arc<dyn GitRunner>) -> Result<Self, GitError> {
        debug!(path = %path.display(), "opening git repository");
        let repo = git2::Repository::open(path).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => GitError::NotARepo {
                path: path.to_path_buf(),
            },
            _ => GitError::from(e),
        })?;

        let work_dir = repo
            .workdir()
            .ok_or_else(|| GitError::BareRepo {
                path: path.to_path_buf(),
            })?
            .to_path_buf();

        Ok(Self {
            repo,
            work_dir,
            runner,
        })
    }

    /// Clone `remote_url` into `local_path` and open the result.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::Transport`] if the remote cannot be reached or the
    /// destination already holds conflicting content.
    pub fn clone(remote_url: &str, local_path: &Path) -> Result<Self, GitError> {
        Self::clone_with_runner(remote_url, local_path, Arc::new(SystemGit))
    }

    /// Like [`Git::clone`], running commands through `runner`.
    pub fn clone_with_runner(
        remote_url: &str,
        local_path: &Path,
        runner: Arc<dyn GitRunner>,
    ) -> Result<Self, GitError> {
        let target = if local_path.is_absolute() {
            local_path.to_path_buf()
        } else {
            std::env::current_dir()?.join(local_path)
        };
        let parent = target.parent().unwrap_or(Path::new("/"));
        std::fs::create_dir_all(parent)?;

        info!(remote = remote_url, path = %target.display(), "cloning repository");
        let target_arg = target.to_string_lossy();
        let out = runner.run(parent, &["clone", remote_url, &target_arg])?;
        if !out.success {
            error!(remote = remote_url, stderr = %out.stderr.trim(), "clone failed");
            return Err(GitError::Transport {
                operation: "clone",
                message: out.stderr.trim().to_string(),
            });
        }

        Self::open_with_runner(&target, runner)
    }

    /// Root of the working tree.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Raw `git status --porcelain` output, untracked files listed individually.
    fn status_report(&self) -> Result<String, GitError> {
        let out = self.run_checked(&["status", "--porcelain", "--untracked-files=all"])?;
        Ok(out.stdout)
    }

    /// Pending changes in the working tree.
    pub fn status(&self) -> Result<Vec<StatusEntry>, GitError> {
        Ok(self
            .status_report()?
            .lines()
            .filter_map(StatusEntry::parse)
            .collect())
    }

    /// True iff there are no modified, staged or untracked paths.
    ///
    /// Empty porcelain output is the definition of clean.
    pub fn is_clean(&self) -> Result<bool, GitError> {
        Ok(self.status_report()?.trim().is_empty())
    }

    /// Fail with [`GitError::DirtyWorktree`] unless the tree is clean.
    pub fn ensure_clean(&self) -> Result<(), GitError> {
        let entries = self.status()?;
        if entries.is_empty() {
            return Ok(());
        }

        let mut details: Vec<String> = entries
            .iter()
            .take(5)
            .map(|e| format!("{} {}", e.code.trim(), e.path))
            .collect();
        if entries.len() > 5 {
            details.push(format!("and {} more", entries.len() - 5));
        }
        let err = GitError::DirtyWorktree {
            details: format!(
                "{} contains uncommitted changes or untracked files ({})",
                self.work_dir.display(),
                details.join(", ")
            ),
        };
        error!("{err}");
        Err(err)
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// The branch HEAD points at, or `None` when HEAD is detached.
    ///
    /// Works on an unborn branch (fresh clone of an empty remote).
    pub fn current_branch(&self) -> Result<Option<String>, GitError> {
        let head = self.repo.find_reference("HEAD")?;
        Ok(head
            .symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .map(str::to_string))
    }

    /// Put HEAD on `to`, creating it from `from` when it does not exist yet.
    ///
    /// HEAD must be on `from`. Already being on `to` is accepted as-is, so
    /// repeated runs for the same tag reuse the branch.
    ///
    /// # Errors
    ///
    /// - [`GitError::WrongBaseBranch`] if HEAD is on neither branch (nothing is changed)
    /// - [`GitError::BranchCheckout`] if HEAD is not on `to` afterwards
    pub fn prepare_branch(&self, from: &BranchName, to: &BranchName) -> Result<(), GitError> {
        let current = self.current_branch()?;
        if current.as_deref() == Some(to.as_str()) {
            debug!(branch = %to, "already on tag branch");
            return Ok(());
        }

        debug!(expected = %from, "checking base branch");
        if current.as_deref() != Some(from.as_str()) {
            let err = GitError::WrongBaseBranch {
                expected: from.to_string(),
                actual: describe_head(current.as_deref()),
            };
            error!("{err}");
            return Err(err);
        }

        debug!(branch = %to, "switching to tag branch");
        // The separator keeps a tracked path named like the branch from being restored
        let switched = self.runner.run(&self.work_dir, &["checkout", to.as_str(), "--"])?;
        if !switched.success {
            debug!(branch = %to, from = %from, "branch not found, creating it");
            let created = self.runner.run(
                &self.work_dir,
                &["checkout", "--no-track", "-b", to.as_str(), from.as_str(), "--"],
            )?;
            if !created.success {
                let err = GitError::BranchCheckout {
                    branch: to.to_string(),
                    message: created.stderr.trim().to_string(),
                };
                error!("{err}");
                return Err(err);
            }
        }

        let now = self.current_branch()?;
        if now.as_deref() != Some(to.as_str()) {
            let err = GitError::BranchCheckout {
                branch: to.to_string(),
                message: format!("HEAD is on {}", describe_head(now.as_deref())),
            };
            error!("{err}");
            return Err(err);
        }
        Ok(())
    }

    /// Remove a tag branch left without changes.
    ///
    /// Not implemented: the branch is left in place and a warning is logged.
    pub fn delete_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        warn!(branch = %branch, "branch deletion is not implemented, leaving branch in place");
        Ok(())
    }

    /// Detach HEAD at `rev`. The tree must be clean.
    ///
    /// # Errors
    ///
    /// - [`GitError::InvalidRevision`] if `rev` is empty or starts with `-`
    /// - [`GitError::DirtyWorktree`] if the tree is not clean
    pub fn checkout_revision(&self, rev: &str) -> Result<(), GitError> {
        if rev.is_empty() || rev.starts_with('-') {
            return Err(GitError::InvalidRevision {
                rev: rev.to_string(),
            });
        }
        self.ensure_clean()?;
        info!(rev, "checking out revision");
        self.run_checked(&["checkout", "--detach", rev, "--"])?;
        Ok(())
    }

    /// Where HEAD is: the branch name, or the commit id when detached.
    pub fn head_position(&self) -> Result<String, GitError> {
        match self.current_branch()? {
            Some(branch) => Ok(branch),
            None => Ok(self.head_oid()?.as_str().to_string()),
        }
    }

    /// Move HEAD back to a position taken with [`Git::head_position`].
    pub fn restore_head(&self, position: &str) -> Result<(), GitError> {
        debug!(position, "restoring HEAD");
        self.run_checked(&["checkout", position, "--"])?;
        Ok(())
    }

    /// Id of the commit HEAD points at.
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        let head = self.repo.head()?;
        let target = head.target().ok_or_else(|| GitError::Internal {
            message: "HEAD has no target".into(),
        })?;
        Ok(Oid::new(target.to_string())?)
    }

    // =========================================================================
    // Commit and push
    // =========================================================================

    /// Stage every change, tracked or not, and commit it as one commit.
    ///
    /// Returns [`CommitOutcome::NoChanges`] without committing when the tree is clean.
    pub fn commit_all(&self, message: &CommitMessage) -> Result<CommitOutcome, GitError> {
        debug!("committing all changes");
        let entries = self.status()?;
        if entries.is_empty() {
            return Ok(CommitOutcome::NoChanges);
        }

        let message = match message {
            CommitMessage::Text(text) => text.clone(),
            CommitMessage::Derived => derived_message(entries.iter().map(|e| e.path.as_str())),
        };

        self.run_checked(&["add", "--all"])?;
        self.run_checked(&["commit", "--message", &message])?;
        let oid = self.head_oid()?;
        info!(oid = oid.short(10), files = entries.len(), %message, "committed");

        Ok(CommitOutcome::Committed { oid, message })
    }

    /// Push `branch` to `remote`, asking for the machine-readable report.
    ///
    /// # Errors
    ///
    /// - [`GitError::PushRejected`] if the report contains any of
    ///   [`PUSH_FAILURE_MARKERS`], in any case, even if git itself exited 0
    /// - [`GitError::Transport`] if the push failed without producing such a report
    pub fn push_branch(&self, branch: &BranchName, remote: &str) -> Result<(), GitError> {
        info!(%branch, remote, "pushing");
        let out = self
            .runner
            .run(&self.work_dir, &["push", "--porcelain", remote, branch.as_str()])?;

        if report_has_failure_marker(&out.stdout) {
            for line in out.stdout.lines() {
                error!(remote, %branch, "{line}");
            }
            return Err(GitError::PushRejected {
                remote: remote.to_string(),
                branch: branch.to_string(),
                report: out.stdout.trim().to_string(),
            });
        }

        if !out.success {
            error!(remote, %branch, stderr = %out.stderr.trim(), "push failed");
            return Err(GitError::Transport {
                operation: "push",
                message: out.stderr.trim().to_string(),
            });
        }

        debug!(report = ?out.stdout.lines().collect::<Vec<_>>(), "push report");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Run a local command, turning a non-zero exit into [`GitError::CommandFailed`].
    fn run_checked(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let out = self.runner.run(&self.work_dir, args)?;
        if out.success {
            Ok(out)
        } else {
            let err = GitError::CommandFailed {
                command: args.join(" "),
                stderr: out.stderr.trim().to_string(),
            };
            error!("{err}");
            Err(err)
        }
    }
}

/// Whether a push report contains a failure marker (case-insensitive).
pub fn report_has_failure_marker(report: &str) -> bool {
    let lowered = report.to_lowercase();
    PUSH_FAILURE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

fn describe_head(branch: Option<&str>) -> String {
    match branch {
        Some(name) => format!("'{name}'"),
        None => "a detached HEAD".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod status_entry {
        use super::*;

        #[test]
        fn strips_status_code() {
            let entry = StatusEntry::parse("?? devices/devices.json").unwrap();
            assert_eq!(entry.code, "??");
            assert_eq!(entry.path, "devices/devices.json");
        }

        #[test]
        fn keeps_leading_space_code() {
            let entry = StatusEntry::parse(" M README.md").unwrap();
            assert_eq!(entry.code, " M");
            assert_eq!(entry.path, "README.md");
        }

        #[test]
        fn short_lines_ignored() {
            assert!(StatusEntry::parse("").is_none());
            assert!(StatusEntry::parse("??").is_none());
            assert!(StatusEntry::parse("?? ").is_none());
        }
    }

    mod push_markers {
        use super::*;

        #[test]
        fn detects_each_marker_in_any_case() {
            assert!(report_has_failure_marker("!\trefs/heads/x:refs/heads/x\t[REJECTED]"));
            assert!(report_has_failure_marker("Failed to push"));
            assert!(report_has_failure_marker("remote: Error: hook declined"));
        }

        #[test]
        fn clean_report_passes() {
            let report = "To /tmp/remote.git\n*\trefs/heads/release-42:refs/heads/release-42\t[new branch]\nDone\n";
            assert!(!report_has_failure_marker(report));
        }

        #[test]
        fn marker_inside_a_branch_name_misfires() {
            // Substring scan: a ref named like a marker trips it
            assert!(report_has_failure_marker(
                "=\trefs/heads/error-pages:refs/heads/error-pages\t[up to date]"
            ));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn display_formatting() {
            let err = GitError::WrongBaseBranch {
                expected: "main".into(),
                actual: describe_head(Some("dev")),
            };
            assert_eq!(
                err.to_string(),
                "expected to be on branch 'main' but HEAD is on 'dev'"
            );

            let err = GitError::Transport {
                operation: "clone",
                message: "repository not found".into(),
            };
            assert_eq!(err.to_string(), "clone failed: repository not found");
        }

        #[test]
        fn detached_head_description() {
            assert_eq!(describe_head(None), "a detached HEAD");
        }
    }
}
