//! forge
//!
//! Abstraction for remote Git hosts.
//!
//! # Architecture
//!
//! The `GitHost` trait defines the object-level API the sync engine needs:
//! blobs, trees, commits and refs, plus repository creation and static
//! hosting for first export. Commands use the [`create_host`] factory
//! rather than importing a specific implementation.
//!
//! # Modules
//!
//! - `traits`: Core `GitHost` trait and request/response types
//! - [`github`]: GitHub implementation using the REST Git Data API
//! - [`mock`]: In-memory implementation for deterministic testing
//! - `factory`: Host creation

mod factory;
pub mod github;
pub mod mock;
mod traits;

pub use factory::{create_host, host_label};
pub use traits::*;
