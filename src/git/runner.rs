//! git::runner
//!
//! The process boundary for git plumbing commands.
//!
//! Every workflow step that mutates the working tree or talks to a remote is a
//! single `git` invocation. [`GitRunner`] is the seam those invocations go
//! through, so tests can record them or substitute the output of a remote.

use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Captured result of one git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    /// Whether the process exited with status 0.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// A successful invocation that printed `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed invocation with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs git commands in a working directory.
pub trait GitRunner: Send + Sync + std::fmt::Debug {
    /// Run `git <args>` in `work_dir`.
    ///
    /// A non-zero exit is reported through [`GitOutput::success`], not as an
    /// error. Errors are reserved for failing to start the process.
    fn run(&self, work_dir: &Path, args: &[&str]) -> std::io::Result<GitOutput>;
}

/// Runs the `git` executable found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

impl GitRunner for SystemGit {
    fn run(&self, work_dir: &Path, args: &[&str]) -> std::io::Result<GitOutput> {
        debug!(dir = %work_dir.display(), ?args, "git");
        let output = Command::new("git")
            .args(args)
            .current_dir(work_dir)
            // Never block on a credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()?;

        Ok(GitOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A runner that records every invocation and delegates to another runner.
///
/// Commands whose first argument matches a registered override get the
/// canned output instead of running. Used to observe the workflow against a
/// real repository and to stand in for a remote's push report.
///
/// # Example
///
/// ```
/// use netboxgit::git::{GitOutput, GitRunner, RecordingGit};
/// use std::path::Path;
///
/// let runner = RecordingGit::default().with_override("push", GitOutput::ok("Done\n"));
/// let out = runner.run(Path::new("."), &["push", "origin", "main"]).unwrap();
///
/// assert_eq!(out.stdout, "Done\n");
/// assert_eq!(runner.invocations(), vec![vec!["push", "origin", "main"]]);
/// ```
#[derive(Debug, Clone)]
pub struct RecordingGit {
    inner: Arc<dyn GitRunner>,
    overrides: Arc<Mutex<Vec<(String, GitOutput)>>>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Default for RecordingGit {
    fn default() -> Self {
        Self::wrapping(Arc::new(SystemGit))
    }
}

impl RecordingGit {
    /// Record calls made through `inner`.
    pub fn wrapping(inner: Arc<dyn GitRunner>) -> Self {
        Self {
            inner,
            overrides: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every `git <subcommand> ...` with `output` instead of running it.
    pub fn with_override(self, subcommand: &str, output: GitOutput) -> Self {
        self.overrides
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((subcommand.to_string(), output));
        self
    }

    /// All recorded invocations, in order.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Recorded invocations of one subcommand.
    pub fn invocations_of(&self, subcommand: &str) -> Vec<Vec<String>> {
        self.invocations()
            .into_iter()
            .filter(|args| args.first().map(String::as_str) == Some(subcommand))
            .collect()
    }
}

impl GitRunner for RecordingGit {
    fn run(&self, work_dir: &Path, args: &[&str]) -> std::io::Result<GitOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(args.iter().map(|a| a.to_string()).collect());

        let canned = args.first().and_then(|sub| {
            self.overrides
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .find(|(name, _)| name == sub)
                .map(|(_, output)| output.clone())
        });

        match canned {
            Some(output) => Ok(output),
            None => self.inner.run(work_dir, args),
        }
    }
}
