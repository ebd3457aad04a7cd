//! core
//!
//! Core domain types and configuration for regsync.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, ObjectId, RepoPath, Fingerprint, RegistryId
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for the data directory
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod paths;
pub mod types;
