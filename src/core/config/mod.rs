//! core::config
//!
//! Settings loading.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Configuration file
//! 3. Process environment (`NETBOX_URL`, `GIT_LOCAL_PATH`, ...)
//! 4. CLI flags (applied by the caller on the returned [`Settings`])
//!
//! # Config File Locations
//!
//! Searched in order, first match wins:
//! 1. The path passed with `--config`
//! 2. `$NBGIT_CONFIG` if set
//! 3. `<config dir>/netbox-git/config.toml`
//!
//! A missing file is not an error. A file that exists but cannot be parsed is.
//!
//! # Example
//!
//! ```no_run
//! use netboxgit::core::config::{ExportSettings, Settings};
//!
//! let settings = Settings::load(None).unwrap();
//! let export = ExportSettings::from_settings(&settings).unwrap();
//! println!("exporting tag {} to {}", export.tag, export.git_local_path.display());
//! ```

pub mod schema;

pub use schema::{FileConfig, NoChangeAction};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::BranchName;

pub const NETBOX_URL: &str = "NETBOX_URL";
pub const NETBOX_TOKEN: &str = "NETBOX_TOKEN";
pub const NETBOX_TAG: &str = "NETBOX_TAG";
pub const NETBOX_SSL_VERIFY: &str = "NETBOX_SSL_VERIFY";
pub const NETBOX_THREADING: &str = "NETBOX_THREADING";
pub const GIT_REMOTE_URL: &str = "GIT_REMOTE_URL";
pub const GIT_LOCAL_PATH: &str = "GIT_LOCAL_PATH";
pub const GIT_BRANCH_MAIN: &str = "GIT_BRANCH_MAIN";
pub const GIT_REMOTE_NAME: &str = "GIT_REMOTE_NAME";
pub const GIT_NO_CHANGE_ACTION: &str = "GIT_NO_CHANGE_ACTION";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "NBGIT_CONFIG";

const DEFAULT_REMOTE_NAME: &str = "origin";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required setting '{0}' was not found")]
    Missing(&'static str),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Interpret a flag value.
///
/// `no`, `n`, `false`, `0` and the empty string (any case) are false,
/// everything else is true.
///
/// # Example
///
/// ```
/// use netboxgit::core::config::parse_flag;
///
/// assert!(!parse_flag("No"));
/// assert!(!parse_flag(""));
/// assert!(parse_flag("yes"));
/// assert!(parse_flag("anything"));
/// ```
pub fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "no" | "n" | "false" | "0" | ""
    )
}

/// Raw settings merged from every source, before per-command validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub netbox_url: Option<String>,
    pub netbox_token: Option<String>,
    pub netbox_tag: Option<String>,
    pub netbox_ssl_verify: Option<bool>,
    pub netbox_threading: Option<bool>,
    pub git_remote_url: Option<String>,
    pub git_local_path: Option<PathBuf>,
    pub git_branch_main: Option<String>,
    pub git_remote_name: Option<String>,
    pub git_no_change_action: Option<NoChangeAction>,
    /// The config file that was read, if any.
    pub source_file: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the config file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed,
    /// or if an environment value cannot be interpreted.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (file, source_file) = Self::load_file(config_path)?;
        let mut settings = Self::from_sources(file, |key| std::env::var(key).ok())?;
        settings.source_file = source_file;
        Ok(settings)
    }

    /// Merge a parsed config file with an environment lookup.
    ///
    /// Environment values override file values. Empty environment values
    /// count as unset, except for flags where the empty string means false.
    pub fn from_sources<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, fallback: Option<String>| {
            env(key).filter(|v| !v.is_empty()).or(fallback)
        };

        let git_no_change_action = match env(GIT_NO_CHANGE_ACTION).filter(|v| !v.is_empty()) {
            Some(value) => Some(value.parse()?),
            None => file.git_no_change_action,
        };

        Ok(Self {
            netbox_url: text(NETBOX_URL, file.netbox_url),
            netbox_token: text(NETBOX_TOKEN, file.netbox_token),
            netbox_tag: text(NETBOX_TAG, file.netbox_tag),
            netbox_ssl_verify: env(NETBOX_SSL_VERIFY)
                .map(|v| parse_flag(&v))
                .or(file.netbox_ssl_verify),
            netbox_threading: env(NETBOX_THREADING)
                .map(|v| parse_flag(&v))
                .or(file.netbox_threading),
            git_remote_url: text(GIT_REMOTE_URL, file.git_remote_url),
            git_local_path: text(GIT_LOCAL_PATH, file.git_local_path).map(PathBuf::from),
            git_branch_main: text(GIT_BRANCH_MAIN, file.git_branch_main),
            git_remote_name: text(GIT_REMOTE_NAME, file.git_remote_name),
            git_no_change_action,
            source_file: None,
        })
    }

    fn load_file(explicit: Option<&Path>) -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
        // An explicitly requested file must exist
        if let Some(path) = explicit {
            return Ok((Self::read_file(path)?, Some(path.to_path_buf())));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok((Self::read_file(&path)?, Some(path)));
            }
        }

        if let Some(dir) = dirs::config_dir() {
            let path = dir.join("netbox-git/config.toml");
            if path.exists() {
                return Ok((Self::read_file(&path)?, Some(path)));
            }
        }

        Ok((FileConfig::default(), None))
    }

    /// Read and parse a config file.
    pub fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn netbox(&self) -> Result<NetBoxSettings, ConfigError> {
        Ok(NetBoxSettings {
            url: require(&self.netbox_url, NETBOX_URL)?,
            token: require(&self.netbox_token, NETBOX_TOKEN)?,
            ssl_verify: self.netbox_ssl_verify.unwrap_or(true),
            threading: self.netbox_threading.unwrap_or(true),
        })
    }
}

fn require<T: Clone>(value: &Option<T>, key: &'static str) -> Result<T, ConfigError> {
    value.clone().ok_or(ConfigError::Missing(key))
}

/// Connection settings for the inventory service.
#[derive(Clone, PartialEq)]
pub struct NetBoxSettings {
    pub url: String,
    pub token: String,
    pub ssl_verify: bool,
    pub threading: bool,
}

// Keep the token out of debug output
impl std::fmt::Debug for NetBoxSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetBoxSettings")
            .field("url", &self.url)
            .field("ssl_verify", &self.ssl_verify)
            .field("threading", &self.threading)
            .finish_non_exhaustive()
    }
}

/// Everything an export run needs.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub netbox: NetBoxSettings,
    /// Inventory tag to export; also the name of the branch the snapshot is committed on.
    pub tag: String,
    pub tag_branch: BranchName,
    pub git_remote_url: String,
    pub git_local_path: PathBuf,
    pub git_branch_main: BranchName,
    pub git_remote_name: String,
    pub no_change_action: NoChangeAction,
}

impl ExportSettings {
    /// Validate the settings an export requires.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` naming the first absent required key, or
    /// `ConfigError::InvalidValue` if the tag or main branch is not a valid branch name.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let netbox = settings.netbox()?;
        let tag = require(&settings.netbox_tag, NETBOX_TAG)?;
        let git_remote_url = require(&settings.git_remote_url, GIT_REMOTE_URL)?;
        let git_local_path = require(&settings.git_local_path, GIT_LOCAL_PATH)?;
        let main = require(&settings.git_branch_main, GIT_BRANCH_MAIN)?;

        let tag_branch = BranchName::for_tag(&tag)
            .map_err(|e| ConfigError::InvalidValue(format!("{NETBOX_TAG}: {e}")))?;
        let git_branch_main = BranchName::new(main)
            .map_err(|e| ConfigError::InvalidValue(format!("{GIT_BRANCH_MAIN}: {e}")))?;

        Ok(Self {
            netbox,
            tag,
            tag_branch,
            git_remote_url,
            git_local_path,
            git_branch_main,
            git_remote_name: settings
                .git_remote_name
                .clone()
                .unwrap_or_else(|| DEFAULT_REMOTE_NAME.to_string()),
            no_change_action: settings.git_no_change_action.unwrap_or_default(),
        })
    }
}

/// Everything a backout run needs.
#[derive(Debug, Clone)]
pub struct BackoutSettings {
    pub netbox: NetBoxSettings,
    pub git_local_path: PathBuf,
}

impl BackoutSettings {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            netbox: settings.netbox()?,
            git_local_path: require(&settings.git_local_path, GIT_LOCAL_PATH)?,
        })
    }
}
