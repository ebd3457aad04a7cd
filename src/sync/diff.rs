//! sync::diff
//!
//! Desired file sets, changesets, and the pure diff between them.
//!
//! # Design
//!
//! `diff` compares content fingerprints only. Timestamps never enter the
//! comparison, so re-saving identical content produces no change. Sets are
//! ordered, so the same inputs always produce the same changeset.
//!
//! # Example
//!
//! ```
//! use regsync::sync::diff::{diff, DesiredFileSet};
//! use regsync::sync::snapshot::SyncSnapshot;
//!
//! let mut desired = DesiredFileSet::new();
//! desired.insert_str("registry.json", "{}").unwrap();
//!
//! let changes = diff(&desired, &SyncSnapshot::empty());
//! assert_eq!(changes.added.len(), 1);
//! assert!(changes.modified.is_empty() && changes.deleted.is_empty());
//! ```

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::core::types::{Fingerprint, RepoPath, TypeError};
use crate::sync::snapshot::SyncSnapshot;

/// Errors from building a desired file set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FileSetError {
    /// Two files map to the same repository path.
    #[error("path '{0}' appears more than once in the file set")]
    PathCollision(RepoPath),

    /// A path is not valid inside a repository.
    #[error(transparent)]
    InvalidPath(#[from] TypeError),
}

/// One file of the desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredFile {
    content: String,
    fingerprint: Fingerprint,
}

impl DesiredFile {
    /// Create a file, computing its fingerprint.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let fingerprint = Fingerprint::of(&content);
        Self {
            content,
            fingerprint,
        }
    }

    /// File content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Content fingerprint.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Repository-relative path to content, computed fresh for every sync.
///
/// Never persisted. Inserting a path twice is an error rather than an
/// overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredFileSet {
    files: BTreeMap<RepoPath, DesiredFile>,
}

impl DesiredFileSet {
    /// Create an empty file set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file.
    ///
    /// # Errors
    ///
    /// Returns `FileSetError::PathCollision` if `path` is already present.
    pub fn insert(
        &mut self,
        path: RepoPath,
        content: impl Into<String>,
    ) -> Result<(), FileSetError> {
        if self.files.contains_key(&path) {
            return Err(FileSetError::PathCollision(path));
        }
        self.files.insert(path, DesiredFile::new(content));
        Ok(())
    }

    /// Add a file by string path.
    ///
    /// # Errors
    ///
    /// Returns `FileSetError::InvalidPath` for invalid paths and
    /// `FileSetError::PathCollision` for duplicates.
    pub fn insert_str(&mut self, path: &str, content: impl Into<String>) -> Result<(), FileSetError> {
        self.insert(RepoPath::new(path)?, content)
    }

    /// Look up a file.
    pub fn get(&self, path: &RepoPath) -> Option<&DesiredFile> {
        self.files.get(path)
    }

    /// Check whether a path is present.
    pub fn contains(&self, path: &RepoPath) -> bool {
        self.files.contains_key(path)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate files in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&RepoPath, &DesiredFile)> {
        self.files.iter()
    }

    /// Paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &RepoPath> {
        self.files.keys()
    }

    /// `path -> fingerprint` for every file.
    pub fn fingerprints(&self) -> BTreeMap<RepoPath, Fingerprint> {
        self.files
            .iter()
            .map(|(path, file)| (path.clone(), file.fingerprint.clone()))
            .collect()
    }
}

/// Paths added, modified and deleted relative to a snapshot.
///
/// The three sets are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changeset {
    /// In desired, not in snapshot
    pub added: BTreeSet<RepoPath>,
    /// In both, fingerprint differs
    pub modified: BTreeSet<RepoPath>,
    /// In snapshot, not in desired
    pub deleted: BTreeSet<RepoPath>,
}

impl Changeset {
    /// Every desired path as added. Used for full rebuilds.
    pub fn full(desired: &DesiredFileSet) -> Self {
        Self {
            added: desired.paths().cloned().collect(),
            ..Default::default()
        }
    }

    /// Check if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Paths whose content must be uploaded (added then modified, each in order).
    pub fn upserts(&self) -> impl Iterator<Item = &RepoPath> {
        self.added.iter().chain(self.modified.iter())
    }

    /// Counts per category.
    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            added: self.added.len(),
            modified: self.modified.len(),
            deleted: self.deleted.len(),
        }
    }
}

/// Counts of a changeset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl ChangeSummary {
    /// Total number of changed paths.
    pub fn total(&self) -> usize {
        self.added + self.modified + self.deleted
    }
}

impl std::fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} added, {} modified, {} deleted",
            self.added, self.modified, self.deleted
        )
    }
}

/// Compare the desired state against the last published snapshot.
///
/// Pure and deterministic. An empty desired set is legal and marks every
/// snapshot path deleted; callers decide whether to push that.
pub fn diff(desired: &DesiredFileSet, snapshot: &SyncSnapshot) -> Changeset {
    let mut changes = Changeset::default();

    for (path, file) in desired.iter() {
        match snapshot.files.get(path) {
            None => {
                changes.added.insert(path.clone());
            }
            Some(previous) if previous != file.fingerprint() => {
                changes.modified.insert(path.clone());
            }
            Some(_) => {}
        }
    }

    for path in snapshot.files.keys() {
        if !desired.contains(path) {
            changes.deleted.insert(path.clone());
        }
    }

    changes
}
