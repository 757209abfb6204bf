//! core::config::schema
//!
//! Configuration file schema.
//!
//! The file uses the lower-case forms of the environment keys, so a deployment
//! can move any value between the file and the environment without renaming it.
//!
//! # Example
//!
//! ```toml
//! netbox_url = "https://netbox.example.net"
//! netbox_token = "0123456789abcdef"
//! netbox_ssl_verify = false
//! git_remote_url = "git@git.example.net:netops/inventory.git"
//! git_local_path = "/var/lib/netbox-git/inventory"
//! git_branch_main = "main"
//! git_no_change_action = "keep"
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Contents of a configuration file. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub netbox_url: Option<String>,
    pub netbox_token: Option<String>,
    pub netbox_tag: Option<String>,
    pub netbox_ssl_verify: Option<bool>,
    pub netbox_threading: Option<bool>,
    pub git_remote_url: Option<String>,
    pub git_local_path: Option<String>,
    pub git_branch_main: Option<String>,
    pub git_remote_name: Option<String>,
    pub git_no_change_action: Option<NoChangeAction>,
}

/// What an export does when the snapshot produced no changes.
///
/// The tag branch has already been created at that point. Deleting it is not
/// implemented yet, so `DeleteBranch` only reports that the branch was left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoChangeAction {
    /// Leave the tag branch in place.
    #[default]
    Keep,
    /// Request removal of the empty tag branch.
    DeleteBranch,
}

impl std::str::FromStr for NoChangeAction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "delete-branch" | "delete_branch" => Ok(Self::DeleteBranch),
            other => Err(ConfigError::InvalidValue(format!(
                "unknown no-change action '{other}', expected 'keep' or 'delete-branch'"
            ))),
        }
    }
}

impl std::fmt::Display for NoChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keep => f.write_str("keep"),
            Self::DeleteBranch => f.write_str("delete-branch"),
        }
    }
}
