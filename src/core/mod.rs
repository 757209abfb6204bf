//! core
//!
//! Core domain types, records and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid
//! - [`records`] - Device and interface records as stored in a snapshot
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod records;
pub mod types;
