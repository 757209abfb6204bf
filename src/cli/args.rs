//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read settings from this TOML file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Only warnings and errors, no summary

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// nbgit - Snapshot tagged NetBox inventory into git, and back out of it
#[derive(Parser, Debug)]
#[command(name = "nbgit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (default: $NBGIT_CONFIG, then the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging (also enabled by a non-empty DEBUG variable)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Export tagged interfaces and their devices, then commit and push
    Export {
        /// Write the snapshot without committing or pushing
        #[arg(long)]
        dry_run: bool,

        /// Tag to export (overrides NETBOX_TAG)
        #[arg(long)]
        tag: Option<String>,

        /// Commit but do not push
        #[arg(long)]
        no_push: bool,
    },

    /// Write a snapshot's interfaces back to NetBox
    Backout {
        /// Snapshot working tree (overrides GIT_LOCAL_PATH)
        #[arg(long, value_name = "DIR")]
        path: Option<PathBuf>,

        /// Read the snapshot as of this revision (HEAD is put back afterwards)
        #[arg(long, value_name = "REV")]
        rev: Option<String>,
    },
}
