//! core::types
//!
//! Strong types for the values that cross the git boundary.
//!
//! # Types
//!
//! - [`BranchName`] - Validated git branch name (main branch or a tag branch)
//! - [`Oid`] - Git commit identifier returned after a commit
//!
//! # Examples
//!
//! ```
//! use netboxgit::core::types::{BranchName, Oid};
//!
//! let branch = BranchName::for_tag("release-42").unwrap();
//! assert_eq!(branch.as_str(), "release-42");
//!
//! assert!(BranchName::new("bad..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// Characters git refuses anywhere in a ref name.
const FORBIDDEN_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Sequences git refuses anywhere in a ref name.
const FORBIDDEN_SEQUENCES: [&str; 3] = ["..", "@{", "//"];

/// A validated git branch name.
///
/// Tag branches are named exactly like the inventory tag they snapshot, so the
/// tag itself has to satisfy `git check-ref-format --branch`. Names are never
/// escaped or rewritten: a tag that is not a valid branch name is rejected.
///
/// # Example
///
/// ```
/// use netboxgit::core::types::BranchName;
///
/// assert!(BranchName::new("main").is_ok());
/// assert!(BranchName::new("changes/2024-q1").is_ok());
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("-leading-dash").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("tag.lock").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if let Some(reason) = Self::violation(&name) {
            return Err(TypeError::InvalidBranchName { name, reason });
        }
        Ok(Self(name))
    }

    /// Derive the branch name used to snapshot an inventory tag.
    pub fn for_tag(tag: &str) -> Result<Self, TypeError> {
        Self::new(tag)
    }

    /// Return the first rule the name breaks, if any.
    fn violation(name: &str) -> Option<String> {
        if name.is_empty() {
            return Some("cannot be empty".into());
        }
        if name == "@" {
            return Some("'@' is reserved".into());
        }
        if name.starts_with('-') {
            return Some("cannot start with '-'".into());
        }
        if name.ends_with('/') {
            return Some("cannot end with '/'".into());
        }
        if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|s| name.contains(*s)) {
            return Some(format!("cannot contain '{seq}'"));
        }
        if let Some(c) = FORBIDDEN_CHARS.iter().find(|c| name.contains(**c)) {
            return Some(format!("cannot contain '{c}'"));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return Some("cannot contain control characters".into());
        }
        for component in name.split('/') {
            if component.starts_with('.') {
                return Some("path component cannot start with '.'".into());
            }
            if component.ends_with(".lock") {
                return Some("path component cannot end with '.lock'".into());
            }
        }
        None
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// # Example
///
/// ```
/// use netboxgit::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64 character hex id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().trim().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid("object id must be hexadecimal".into()));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the id.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
