//! sync
//!
//! Publishing a registry's file set as commits through a host's object API.
//!
//! # Modules
//!
//! - [`diff`] - Desired file sets and the pure snapshot diff
//! - [`snapshot`] - Bindings and snapshots, with file and memory stores
//! - [`builder`] - Blob, tree and commit creation
//! - [`engine`] - Export, push with conflict detection, status
//! - [`status`] - Local snapshot vs. remote head
//!
//! # Flow
//!
//! ```text
//! scaffold -> diff -> builder -> ref update -> snapshot save
//! ```

pub mod builder;
pub mod diff;
pub mod engine;
pub mod snapshot;
pub mod status;

use thiserror::Error;

use crate::core::types::{RegistryId, TypeError};
use crate::forge::ForgeError;
use crate::registry::RegistryError;
use crate::scaffold::ScaffoldError;

pub use builder::{BuildError, ObjectBuilder, TreeMode};
pub use diff::{diff, ChangeSummary, Changeset, DesiredFileSet};
pub use engine::{ExportOptions, ExportOutcome, PushOptions, PushOutcome, SyncEngine};
pub use snapshot::{
    FileSnapshotStore, MemorySnapshotStore, RepositoryBinding, SnapshotStore, StoreError,
    SyncSnapshot,
};
pub use status::{StatusAdvice, SyncStatus};

/// Errors from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("registry '{0}' has not been exported yet")]
    NotExported(RegistryId),

    #[error("registry '{id}' is already published to {repo}")]
    AlreadyExported { id: RegistryId, repo: String },

    #[error("refusing to publish an empty file set over {published} published files of '{id}'")]
    EmptyDesiredSet { id: RegistryId, published: usize },

    #[error("{repo} has no commits; push an initial commit to it, then rerun")]
    EmptyRepository { id: RegistryId, repo: String },

    #[error(transparent)]
    Forge(#[from] ForgeError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scaffold(#[from] ScaffoldError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("host returned an unusable value: {0}")]
    InvalidHostValue(#[from] TypeError),
}

impl SyncError {
    /// Whether re-running the operation could succeed without changes.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Forge(e) => e.is_transient(),
            SyncError::Build(e) => e.is_transient(),
            _ => false,
        }
    }
}
