//! core::paths
//!
//! Centralized path routing for regsync storage locations.
//!
//! # Storage Layout
//!
//! All regsync data lives under the data directory (default `~/.regsync`):
//! - `bindings/<registry-id>.json` - Binding record and sync snapshot
//! - `secrets.toml` - File-backed secret store
//!
//! No code outside this module should compute `*.join("bindings")` paths.
//!
//! # Example
//!
//! ```
//! use regsync::core::paths::DataPaths;
//! use regsync::core::types::RegistryId;
//! use std::path::PathBuf;
//!
//! let paths = DataPaths::new(PathBuf::from("/home/me/.regsync"));
//! let id = RegistryId::new("reg_01").unwrap();
//!
//! assert_eq!(
//!     paths.binding_path(&id),
//!     PathBuf::from("/home/me/.regsync/bindings/reg_01.json")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::RegistryId;

/// Path routing for the regsync data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Create routing rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one binding record per registry.
    pub fn bindings_dir(&self) -> PathBuf {
        self.root.join("bindings")
    }

    /// Binding record for `id`.
    pub fn binding_path(&self, id: &RegistryId) -> PathBuf {
        self.bindings_dir().join(format!("{}.json", id))
    }

    /// Temp file used while replacing the binding record for `id`.
    pub fn binding_temp_path(&self, id: &RegistryId) -> PathBuf {
        self.bindings_dir().join(format!("{}.json.tmp", id))
    }

    /// File-backed secret store.
    pub fn secrets_path(&self) -> PathBuf {
        self.root.join("secrets.toml")
    }

    /// Create the data directories if they don't exist.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(self.bindings_dir()).await
    }
}
