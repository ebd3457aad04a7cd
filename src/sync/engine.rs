//! sync::engine
//!
//! Export, push, and status for a bound registry.
//!
//! # Push
//!
//! 1. Load the binding and snapshot.
//! 2. Read the remote branch head.
//! 3. Refuse when the remote moved since the last push, unless forced.
//! 4. Diff the desired set against the snapshot, or take the whole set when
//!    rebuilding.
//! 5. Build blobs, tree and commit on top of the current remote head.
//! 6. Move the ref conditionally; a lost race is reported as a conflict.
//! 7. Replace the snapshot.
//!
//! Conflicts are outcomes, not errors. Ref moves are never retried here;
//! the caller re-runs the push, which re-reads remote state first.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::types::{BranchName, ObjectId, RegistryId};
use crate::forge::{CreateRepoRequest, ForgeError, GitHost, RepoId, Visibility};
use crate::registry::Registry;
use crate::scaffold::{self, ScaffoldContext};
use crate::sync::builder::{BuildRequest, ObjectBuilder, TreeMode};
use crate::sync::diff::{diff, ChangeSummary, Changeset, DesiredFileSet};
use crate::sync::snapshot::{RepositoryBinding, SnapshotStore, StoredBinding, SyncSnapshot};
use crate::sync::status::SyncStatus;
use crate::sync::SyncError;

/// Options for [`SyncEngine::push`].
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Publish over remote changes made since the last push
    pub force: bool,
    /// Allow publishing an empty file set over published files
    pub allow_empty: bool,
    /// Commit message; a summary of the changes when `None`
    pub message: Option<String>,
}

/// Result of a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PushOutcome {
    /// The branch now points at `commit`.
    Pushed {
        commit: ObjectId,
        changes: ChangeSummary,
    },
    /// Nothing changed since the last push.
    AlreadyUpToDate,
    /// The remote moved since the last push; nothing was published.
    Conflict {
        local: Option<ObjectId>,
        remote: Option<ObjectId>,
    },
}

/// Options for [`SyncEngine::export`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub repo_name: String,
    /// Organization to create the repository under
    pub org: Option<String>,
    pub visibility: Visibility,
    /// Repository description; the registry description when `None`
    pub description: Option<String>,
}

/// Result of an export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub binding: RepositoryBinding,
    pub push: PushOutcome,
}

/// Publishes registries through a [`GitHost`], tracking state in a
/// [`SnapshotStore`].
pub struct SyncEngine {
    host: Arc<dyn GitHost>,
    store: Arc<dyn SnapshotStore>,
    max_concurrent_blobs: usize,
}

impl SyncEngine {
    pub fn new(
        host: Arc<dyn GitHost>,
        store: Arc<dyn SnapshotStore>,
        max_concurrent_blobs: usize,
    ) -> Self {
        Self {
            host,
            store,
            max_concurrent_blobs,
        }
    }

    /// Load a binding and its snapshot.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NotExported` when the registry has no binding.
    pub async fn binding(&self, id: &RegistryId) -> Result<StoredBinding, SyncError> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| SyncError::NotExported(id.clone()))
    }

    /// Ids of every bound registry.
    pub async fn bindings(&self) -> Result<Vec<RegistryId>, SyncError> {
        Ok(self.store.list().await?)
    }

    /// Compute the file set a push of `registry` would publish.
    pub async fn desired_for(&self, registry: &Registry) -> Result<DesiredFileSet, SyncError> {
        let stored = self.binding(&registry.id).await?;
        Ok(scaffold::generate(
            registry,
            &ScaffoldContext::from_binding(&stored.binding),
        )?)
    }

    /// Publish `desired` to the bound repository.
    ///
    /// # Errors
    ///
    /// Configuration, storage and host failures. A remote that moved is
    /// reported as `PushOutcome::Conflict`, not as an error. When building
    /// fails no ref is touched.
    pub async fn push(
        &self,
        id: &RegistryId,
        desired: &DesiredFileSet,
        options: &PushOptions,
    ) -> Result<PushOutcome, SyncError> {
        let StoredBinding { binding, snapshot } = self.binding(id).await?;
        let repo = &binding.repo;
        let branch = &binding.default_branch;

        let remote = match self.host.get_ref(repo, branch).await {
            Ok(remote) => remote,
            Err(ForgeError::EmptyRepository(_)) => {
                return Err(SyncError::EmptyRepository {
                    id: id.clone(),
                    repo: repo.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let drift = matches!(
            (&remote, &snapshot.last_commit),
            (Some(remote), Some(local)) if remote != local
        );

        if drift && !options.force {
            warn!(
                registry = %id,
                local = ?snapshot.last_commit,
                remote = ?remote,
                "remote branch moved since last push"
            );
            return Ok(PushOutcome::Conflict {
                local: snapshot.last_commit,
                remote,
            });
        }

        if desired.is_empty() && !snapshot.files.is_empty() && !options.allow_empty {
            return Err(SyncError::EmptyDesiredSet {
                id: id.clone(),
                published: snapshot.files.len(),
            });
        }

        let first_sync = snapshot.last_commit.is_none() || remote.is_none();
        let (changes, mode) = if drift || first_sync {
            (Changeset::full(desired), TreeMode::Full)
        } else {
            (diff(desired, &snapshot), TreeMode::Incremental)
        };
        debug!(
            registry = %id,
            drift,
            first_sync,
            changes = %changes.summary(),
            "computed changeset"
        );

        if changes.is_empty() && !drift {
            info!(registry = %id, "nothing to push");
            return Ok(PushOutcome::AlreadyUpToDate);
        }

        let summary = changes.summary();
        let message = options
            .message
            .clone()
            .unwrap_or_else(|| format!("Update registry ({})", summary));

        let commit = ObjectBuilder::new(self.host.as_ref(), self.max_concurrent_blobs)
            .build(BuildRequest {
                repo,
                changeset: &changes,
                desired,
                parent: remote.as_ref(),
                mode,
                message: &message,
            })
            .await?;

        let moved = match &remote {
            None => self.host.create_ref(repo, branch, &commit).await,
            Some(head) => self.move_ref(repo, branch, head, &commit).await,
        };
        match moved {
            Ok(()) => {}
            Err(ForgeError::RefConflict(reason)) => {
                warn!(registry = %id, %reason, "branch moved while pushing");
                let current = self.host.get_ref(repo, branch).await?;
                return Ok(PushOutcome::Conflict {
                    local: snapshot.last_commit,
                    remote: current,
                });
            }
            Err(e) => return Err(e.into()),
        }

        let next = SyncSnapshot::after_push(desired, commit.clone(), Utc::now());
        if let Err(e) = self.store.save(&binding, &next).await {
            error!(
                registry = %id,
                commit = %commit,
                error = %e,
                "branch updated but snapshot could not be saved"
            );
            return Err(e.into());
        }

        info!(registry = %id, commit = %commit, changes = %summary, "pushed");
        Ok(PushOutcome::Pushed {
            commit,
            changes: summary,
        })
    }

    /// Move `branch` from `expected` to `new`, failing with `RefConflict`
    /// if it no longer points at `expected`.
    async fn move_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        expected: &ObjectId,
        new: &ObjectId,
    ) -> Result<(), ForgeError> {
        if !self.host.capabilities().conditional_ref_update {
            let current = self.host.get_ref(repo, branch).await?;
            if current.as_ref() != Some(expected) {
                return Err(ForgeError::RefConflict(format!(
                    "{} no longer points at {}",
                    branch,
                    expected.short(7)
                )));
            }
        }
        self.host.update_ref(repo, branch, new, false).await
    }

    /// Create the repository for `registry`, enable hosting, and publish
    /// the scaffold.
    ///
    /// A binding that exists but was never pushed is resumed rather than
    /// creating a second repository.
    ///
    /// # Errors
    ///
    /// - `SyncError::AlreadyExported` if the registry was already published
    /// - `ForgeError::NameCollision` (via `SyncError::Forge`) if the name is taken
    pub async fn export(
        &self,
        registry: &Registry,
        options: &ExportOptions,
    ) -> Result<ExportOutcome, SyncError> {
        registry.validate()?;
        let id = &registry.id;

        let mut binding = match self.store.load(id).await? {
            Some(stored) if stored.snapshot.last_commit.is_some() => {
                return Err(SyncError::AlreadyExported {
                    id: id.clone(),
                    repo: stored.binding.repo.to_string(),
                });
            }
            Some(stored) => {
                info!(registry = %id, repo = %stored.binding.repo, "resuming export");
                stored.binding
            }
            None => self.create_binding(registry, options).await?,
        };

        if binding.hosting_url.is_none() {
            let hosting = self
                .host
                .enable_static_hosting(&binding.repo, &binding.default_branch)
                .await?;
            binding.hosting_url = Some(hosting.url);
            self.store.save(&binding, &SyncSnapshot::empty()).await?;
        }

        let desired = scaffold::generate(registry, &ScaffoldContext::from_binding(&binding))?;
        let push = self
            .push(
                id,
                &desired,
                &PushOptions {
                    message: Some(format!("Initial export of {}", registry.name)),
                    ..Default::default()
                },
            )
            .await?;

        Ok(ExportOutcome { binding, push })
    }

    async fn create_binding(
        &self,
        registry: &Registry,
        options: &ExportOptions,
    ) -> Result<RepositoryBinding, SyncError> {
        let info = self
            .host
            .create_repository(CreateRepoRequest {
                name: options.repo_name.clone(),
                org: options.org.clone(),
                description: options
                    .description
                    .clone()
                    .or_else(|| registry.description.clone()),
                visibility: options.visibility,
                auto_init: true,
            })
            .await?;
        info!(registry = %registry.id, repo = %info.id, "created repository");

        let binding = RepositoryBinding {
            registry_id: registry.id.clone(),
            repo: info.id,
            repo_url: info.html_url,
            hosting_url: None,
            default_branch: BranchName::new(info.default_branch)?,
            created_at: Utc::now(),
        };
        self.store.save(&binding, &SyncSnapshot::empty()).await?;
        Ok(binding)
    }

    /// Re-read the static hosting URL, enabling hosting if it is off.
    pub async fn refresh_hosting_url(&self, id: &RegistryId) -> Result<String, SyncError> {
        let StoredBinding {
            mut binding,
            snapshot,
        } = self.binding(id).await?;

        let hosting = match self.host.get_static_hosting(&binding.repo).await? {
            Some(hosting) => hosting,
            None => {
                self.host
                    .enable_static_hosting(&binding.repo, &binding.default_branch)
                    .await?
            }
        };

        if binding.hosting_url.as_deref() != Some(hosting.url.as_str()) {
            debug!(registry = %id, url = %hosting.url, "hosting URL changed");
            binding.hosting_url = Some(hosting.url.clone());
            self.store.save(&binding, &snapshot).await?;
        }
        Ok(hosting.url)
    }

    /// Compare the snapshot with the remote head. Never writes.
    pub async fn status(&self, id: &RegistryId) -> Result<SyncStatus, SyncError> {
        let stored = self.binding(id).await?;
        let remote = match self
            .host
            .get_ref(&stored.binding.repo, &stored.binding.default_branch)
            .await
        {
            Ok(remote) => remote,
            Err(ForgeError::EmptyRepository(_)) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(SyncStatus::compute(&stored.snapshot, remote))
    }

    /// Changes a push would publish, judged against the local snapshot only.
    pub async fn plan(
        &self,
        id: &RegistryId,
        desired: &DesiredFileSet,
    ) -> Result<Changeset, SyncError> {
        let stored = self.binding(id).await?;
        Ok(diff(desired, &stored.snapshot))
    }

    /// Forget a binding. The remote repository is left alone.
    pub async fn unlink(&self, id: &RegistryId) -> Result<bool, SyncError> {
        let removed = self.store.delete(id).await?;
        if removed {
            info!(registry = %id, "removed binding");
        }
        Ok(removed)
    }
}
