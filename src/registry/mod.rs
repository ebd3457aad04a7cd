//! registry
//!
//! The component registry as handed over by the authoring side.
//!
//! A registry is a named collection of items; each item carries one or more
//! text files. Registries live in external storage, so loading goes through
//! the [`RegistrySource`] seam. The CLI reads a JSON export with
//! [`JsonFileSource`].
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "id": "acme-ui",
//!   "name": "Acme UI",
//!   "items": [
//!     {
//!       "name": "button",
//!       "type": "registry:ui",
//!       "files": [{ "path": "button.tsx", "type": "registry:ui", "content": "..." }]
//!     }
//!   ]
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::types::{RegistryId, RepoPath};

/// Errors from loading or validating a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry from '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse registry '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid registry: {0}")]
    Invalid(String),
}

/// A component registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    pub id: RegistryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Overrides the published homepage; defaults to the hosting URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default)]
    pub items: Vec<RegistryItem>,
}

/// One installable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryItem {
    pub name: String,
    /// Item type, e.g. `registry:ui`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// npm packages the item needs
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Other registry items the item needs
    #[serde(default)]
    pub registry_dependencies: Vec<String>,
    pub files: Vec<ItemFile>,
}

/// One file of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFile {
    /// File name, possibly with subdirectories, relative to the item
    pub path: String,
    /// File type, e.g. `registry:component`
    #[serde(rename = "type")]
    pub kind: String,
    /// Install location in the consuming project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub content: String,
}

impl RegistryItem {
    /// Repository directory holding this item's files.
    pub fn dir(&self) -> Result<RepoPath, RegistryError> {
        RepoPath::new(format!("registry/{}", self.name))
            .map_err(|e| RegistryError::Invalid(format!("item '{}': {}", self.name, e)))
    }
}

impl Registry {
    /// Check the structural rules the scaffold relies on.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Invalid` when an item name is empty, repeated
    /// or contains `/`, or when a file path is not a valid relative path.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::Invalid("registry name is empty".into()));
        }

        let mut seen = HashSet::new();
        for item in &self.items {
            if item.name.is_empty() || item.name.contains('/') {
                return Err(RegistryError::Invalid(format!(
                    "item name '{}' must be non-empty and contain no '/'",
                    item.name
                )));
            }
            if !seen.insert(item.name.as_str()) {
                return Err(RegistryError::Invalid(format!(
                    "item '{}' appears more than once",
                    item.name
                )));
            }
            let dir = item.dir()?;
            for file in &item.files {
                dir.join(&file.path).map_err(|e| {
                    RegistryError::Invalid(format!("item '{}' file '{}': {}", item.name, file.path, e))
                })?;
            }
        }
        Ok(())
    }
}

/// Where registries come from.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn load(&self) -> Result<Registry, RegistryError>;
}

/// Registry read from a JSON export on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegistrySource for JsonFileSource {
    async fn load(&self) -> Result<Registry, RegistryError> {
        let contents =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| RegistryError::Read {
                    path: self.path.clone(),
                    source,
                })?;
        let registry: Registry =
            serde_json::from_str(&contents).map_err(|e| RegistryError::Parse {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        registry.validate()?;
        Ok(registry)
    }
}
