//! netbox-git - Snapshot tagged NetBox inventory into git, and back out of it
//!
//! An export pulls every interface carrying a NetBox tag, resolves the device
//! each one is managed through, writes both as JSON files into a git working
//! tree and commits them on a branch named after the tag. A backout reads
//! such a snapshot and writes the interfaces back to NetBox.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Export and backout flows
//! - [`core`] - Domain types, records and configuration
//! - [`git`] - Single interface for all Git operations
//! - [`store`] - JSON file layout of a snapshot
//! - [`inventory`] - NetBox access behind the `Inventory` trait
//!
//! # Invariants
//!
//! 1. An export never starts on a dirty working tree or from the wrong branch
//! 2. Re-exporting unchanged inventory produces byte-identical files and no commit
//! 3. Records are stripped of unwritable fields only on the way back to NetBox

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod inventory;
pub mod store;
