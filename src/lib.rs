//! regsync - Publish component registries to GitHub
//!
//! regsync publishes an internally edited component registry as commits in
//! a GitHub repository using only the Git object REST API (blobs, trees,
//! commits, refs). There is no local git binary and no working tree.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to sync)
//! - [`sync`] - Diff, object building, conflict-checked ref updates, snapshots
//! - [`scaffold`] - Generates the repository file set for a registry
//! - [`registry`] - Registry domain model and sources
//! - [`core`] - Domain types, configuration, data directory layout
//! - [`forge`] - Abstraction over the remote host (GitHub)
//! - [`auth`] - Bearer token providers
//! - [`secrets`] - Secret storage abstraction
//! - [`ui`] - User interaction utilities
//! - [`logging`] - Tracing subscriber setup
//!
//! # Guarantees
//!
//! 1. A push never overwrites remote changes it has not seen unless forced
//! 2. The snapshot only changes after the branch moved to the new commit
//! 3. A push with no content changes creates no objects

pub mod auth;
pub mod cli;
pub mod core;
pub mod forge;
pub mod logging;
pub mod registry;
pub mod scaffold;
pub mod secrets;
pub mod sync;
pub mod ui;
