//! sync::builder
//!
//! Creates remote blob, tree and commit objects for a changeset.
//!
//! # Pipeline
//!
//! 1. Blob fan-out: one `create_blob` per added or modified path, at most
//!    `max_concurrent_blobs` in flight. The first failure aborts the stage.
//! 2. Parent tree lookup via `get_commit` (skipped without a parent).
//! 3. Tree creation, shaped by [`TreeMode`] and the host capabilities.
//! 4. Commit creation.
//!
//! The builder never moves a ref. A failed build leaves at most orphaned
//! objects behind, which the host garbage-collects.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::core::types::{ObjectId, RepoPath};
use crate::forge::{
    CreateCommitRequest, CreateTreeRequest, ForgeError, GitHost, RepoId, TreeEntry,
};
use crate::sync::diff::{Changeset, DesiredFileSet};

/// Errors from building objects.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to upload '{path}': {source}")]
    Blob { path: RepoPath, source: ForgeError },

    #[error("failed to read parent commit: {0}")]
    ParentCommit(ForgeError),

    #[error("failed to list parent tree: {0}")]
    ListTree(ForgeError),

    #[error("parent tree {0} is too large to list in full")]
    TruncatedTree(ObjectId),

    #[error("failed to create tree: {0}")]
    Tree(ForgeError),

    #[error("failed to create commit: {0}")]
    Commit(ForgeError),

    #[error("no content for '{0}' in the desired file set")]
    MissingContent(RepoPath),

    #[error("an incremental tree needs a parent commit")]
    MissingParent,
}

impl BuildError {
    /// Whether the underlying host failure is transient.
    pub fn is_transient(&self) -> bool {
        match self {
            BuildError::Blob { source, .. } => source.is_transient(),
            BuildError::ParentCommit(e)
            | BuildError::ListTree(e)
            | BuildError::Tree(e)
            | BuildError::Commit(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// How the new tree relates to the parent's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMode {
    /// Parent tree plus the changeset.
    Incremental,
    /// Exactly the desired set, ignoring whatever the parent holds.
    Full,
}

/// Everything needed to build one commit.
#[derive(Debug)]
pub struct BuildRequest<'a> {
    pub repo: &'a RepoId,
    pub changeset: &'a Changeset,
    pub desired: &'a DesiredFileSet,
    pub parent: Option<&'a ObjectId>,
    pub mode: TreeMode,
    pub message: &'a str,
}

/// Builds commits through a host's object API.
pub struct ObjectBuilder<'h> {
    host: &'h dyn GitHost,
    max_concurrent_blobs: usize,
}

impl<'h> ObjectBuilder<'h> {
    /// Create a builder. A concurrency of zero is treated as one.
    pub fn new(host: &'h dyn GitHost, max_concurrent_blobs: usize) -> Self {
        Self {
            host,
            max_concurrent_blobs: max_concurrent_blobs.max(1),
        }
    }

    /// Build a commit for `request` and return its id.
    ///
    /// # Errors
    ///
    /// Any host failure aborts the build. No ref is touched either way.
    pub async fn build(&self, request: BuildRequest<'_>) -> Result<ObjectId, BuildError> {
        let blobs = self.upload_blobs(&request).await?;

        let entries_written = blobs.len();
        let tree_request = match request.mode {
            TreeMode::Full => CreateTreeRequest {
                base_tree: None,
                entries: full_entries(request.desired, &blobs)?,
            },
            TreeMode::Incremental => {
                let parent = request.parent.ok_or(BuildError::MissingParent)?;
                let base = self.parent_tree(request.repo, parent).await?;
                if self.host.capabilities().base_tree {
                    CreateTreeRequest {
                        base_tree: Some(base),
                        entries: delta_entries(request.changeset, blobs),
                    }
                } else {
                    CreateTreeRequest {
                        base_tree: None,
                        entries: self
                            .merged_entries(request.repo, &base, request.changeset, blobs)
                            .await?,
                    }
                }
            }
        };
        debug!(
            repo = %request.repo,
            mode = ?request.mode,
            blobs = entries_written,
            entries = tree_request.entries.len(),
            "creating tree"
        );

        let tree = self
            .host
            .create_tree(request.repo, tree_request)
            .await
            .map_err(BuildError::Tree)?;

        let commit = self
            .host
            .create_commit(
                request.repo,
                CreateCommitRequest {
                    message: request.message.to_string(),
                    tree,
                    parents: request.parent.cloned().into_iter().collect(),
                },
            )
            .await
            .map_err(BuildError::Commit)?;

        debug!(repo = %request.repo, commit = %commit, "created commit");
        Ok(commit)
    }

    /// Fan out blob creation for every upserted path and fan the ids back in.
    async fn upload_blobs(
        &self,
        request: &BuildRequest<'_>,
    ) -> Result<BTreeMap<RepoPath, ObjectId>, BuildError> {
        let uploads = request
            .changeset
            .upserts()
            .map(|path| {
                request
                    .desired
                    .get(path)
                    .map(|file| (path.clone(), file.content()))
                    .ok_or_else(|| BuildError::MissingContent(path.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let host = self.host;
        let repo = request.repo;
        stream::iter(uploads)
            .map(|(path, content)| async move {
                match host.create_blob(repo, content).await {
                    Ok(sha) => Ok((path, sha)),
                    Err(source) => Err(BuildError::Blob { path, source }),
                }
            })
            .buffer_unordered(self.max_concurrent_blobs)
            .try_collect()
            .await
    }

    async fn parent_tree(&self, repo: &RepoId, parent: &ObjectId) -> Result<ObjectId, BuildError> {
        self.host
            .get_commit(repo, parent)
            .await
            .map(|info| info.tree)
            .map_err(BuildError::ParentCommit)
    }

    /// Full entry list for hosts without base-tree support: surviving
    /// parent entries keep their mode, rewritten and deleted paths are
    /// dropped, new blobs are added.
    async fn merged_entries(
        &self,
        repo: &RepoId,
        base: &ObjectId,
        changeset: &Changeset,
        blobs: BTreeMap<RepoPath, ObjectId>,
    ) -> Result<Vec<TreeEntry>, BuildError> {
        let listing = self
            .host
            .get_tree(repo, base)
            .await
            .map_err(BuildError::ListTree)?;
        if listing.truncated {
            return Err(BuildError::TruncatedTree(base.clone()));
        }

        let mut entries: Vec<TreeEntry> = listing
            .entries
            .into_iter()
            .filter(|entry| {
                !changeset.deleted.contains(&entry.path) && !blobs.contains_key(&entry.path)
            })
            .collect();
        entries.extend(
            blobs
                .into_iter()
                .map(|(path, sha)| TreeEntry::blob(path, sha)),
        );
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

fn full_entries(
    desired: &DesiredFileSet,
    blobs: &BTreeMap<RepoPath, ObjectId>,
) -> Result<Vec<TreeEntry>, BuildError> {
    desired
        .paths()
        .map(|path| {
            blobs
                .get(path)
                .map(|sha| TreeEntry::blob(path.clone(), sha.clone()))
                .ok_or_else(|| BuildError::MissingContent(path.clone()))
        })
        .collect()
}

fn delta_entries(changeset: &Changeset, blobs: BTreeMap<RepoPath, ObjectId>) -> Vec<TreeEntry> {
    blobs
        .into_iter()
        .map(|(path, sha)| TreeEntry::blob(path, sha))
        .chain(changeset.deleted.iter().cloned().map(TreeEntry::removal))
        .collect()
}
