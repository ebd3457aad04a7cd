//! forge::traits
//!
//! `GitHost` trait definition for the remote Git object API.
//!
//! # Design
//!
//! The trait models a host that exposes Git objects over HTTP: blobs,
//! trees, commits and refs, plus the repository administration needed for a
//! first export (repository creation and static hosting). There is no local
//! git binary or working tree anywhere behind this seam.
//!
//! The trait is async because every operation is a network call. All methods
//! return `Result` so callers can tell configuration problems, transient
//! failures and ref conflicts apart.
//!
//! # Example
//!
//! ```ignore
//! use regsync::forge::{GitHost, RepoId, CreateCommitRequest};
//!
//! async fn commit_blob(host: &dyn GitHost, repo: &RepoId) -> Result<(), ForgeError> {
//!     let blob = host.create_blob(repo, "hello").await?;
//!     // ... build a tree containing `blob`, then a commit
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{BranchName, ObjectId, RepoPath};

/// Errors from host operations.
///
/// These map the common failure modes of a Git hosting API onto the
/// categories the sync engine reacts to differently.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// A repository with the requested name already exists.
    #[error("repository '{0}' already exists; choose a different name")]
    NameCollision(String),

    /// The repository has no commits, so the object API rejects writes.
    #[error("repository '{0}' has no commits")]
    EmptyRepository(String),

    /// A ref could not be moved because it no longer points where we expected.
    #[error("ref update rejected: {0}")]
    RefConflict(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The operation is not supported by this host.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl ForgeError {
    /// Whether retrying the whole sync from scratch could succeed.
    ///
    /// Ref updates are never retried automatically even when this is true;
    /// the caller re-runs the sync, which re-checks remote state first.
    pub fn is_transient(&self) -> bool {
        match self {
            ForgeError::RateLimited | ForgeError::NetworkError(_) => true,
            ForgeError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Owner and name of a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    /// User or organization that owns the repository
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoId {
    /// Create a repository id.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// What the host's tree and ref APIs can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// `create_tree` accepts a base tree and inherits unmentioned entries.
    pub base_tree: bool,
    /// `update_ref` without force only succeeds as a fast-forward, which
    /// makes it a conditional write against the head we built on.
    pub conditional_ref_update: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            base_tree: true,
            conditional_ref_update: true,
        }
    }
}

/// Git file mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileMode {
    /// Regular file (`100644`)
    #[default]
    Regular,
    /// Executable file (`100755`)
    Executable,
    /// Symbolic link (`120000`)
    Symlink,
}

impl FileMode {
    /// The octal mode string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Symlink => "120000",
        }
    }

    /// Parse a wire mode string. Returns `None` for trees and submodules.
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "100644" => Some(FileMode::Regular),
            "100755" => Some(FileMode::Executable),
            "120000" => Some(FileMode::Symlink),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A blob entry in a tree.
///
/// `sha: None` is a removal marker: combined with a base tree it deletes
/// the path from the new tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Full repository-relative path
    pub path: RepoPath,
    /// File mode
    pub mode: FileMode,
    /// Blob id, or `None` to remove the path
    pub sha: Option<ObjectId>,
}

impl TreeEntry {
    /// A blob entry with regular file mode.
    pub fn blob(path: RepoPath, sha: ObjectId) -> Self {
        Self {
            path,
            mode: FileMode::Regular,
            sha: Some(sha),
        }
    }

    /// A removal marker for `path`.
    pub fn removal(path: RepoPath) -> Self {
        Self {
            path,
            mode: FileMode::Regular,
            sha: None,
        }
    }

    /// Check if this entry removes its path.
    pub fn is_removal(&self) -> bool {
        self.sha.is_none()
    }
}

/// Recursive listing of the blobs in a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeListing {
    /// Blob entries (directories are implied by paths)
    pub entries: Vec<TreeEntry>,
    /// The host cut the listing short
    pub truncated: bool,
}

/// Request to create a tree.
#[derive(Debug, Clone, Default)]
pub struct CreateTreeRequest {
    /// Tree to inherit unmentioned entries from
    pub base_tree: Option<ObjectId>,
    /// Entries to write or remove
    pub entries: Vec<TreeEntry>,
}

/// Request to create a commit.
#[derive(Debug, Clone)]
pub struct CreateCommitRequest {
    /// Commit message
    pub message: String,
    /// Root tree of the commit
    pub tree: ObjectId,
    /// Parent commits (empty for a root commit)
    pub parents: Vec<ObjectId>,
}

/// Commit metadata returned from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Commit id
    pub sha: ObjectId,
    /// Root tree id
    pub tree: ObjectId,
    /// Parent commit ids
    pub parents: Vec<ObjectId>,
}

/// Repository visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Anyone can read
    #[default]
    Public,
    /// Only collaborators can read
    Private,
}

impl Visibility {
    /// Parse a configuration value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// Request to create a repository.
#[derive(Debug, Clone)]
pub struct CreateRepoRequest {
    /// Repository name
    pub name: String,
    /// Organization to create under; `None` for the authenticated user
    pub org: Option<String>,
    /// Short description
    pub description: Option<String>,
    /// Visibility
    pub visibility: Visibility,
    /// Seed the default branch with an initial commit
    pub auto_init: bool,
}

/// Repository information returned from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Owner and name as assigned by the host
    pub id: RepoId,
    /// Web URL of the repository
    pub html_url: String,
    /// Default branch name
    pub default_branch: String,
}

/// Static hosting site information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostingInfo {
    /// Public URL the site is served from
    pub url: String,
}

/// The `GitHost` trait for talking to a remote Git hosting service.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the object builder issues blob
/// creation requests concurrently against a shared host.
///
/// # Error Handling
///
/// - `AuthRequired` / `AuthFailed`: configuration problem, do not retry
/// - `NotFound`: repository, object, or ref missing
/// - `RateLimited` / `NetworkError` / 5xx `ApiError`: transient
/// - `NameCollision`: repository name already taken
/// - `RefConflict`: the branch moved underneath us
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Get the host name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Describe what the tree and ref APIs support.
    fn capabilities(&self) -> HostCapabilities;

    /// Create a blob from UTF-8 content. Idempotent for identical content.
    async fn create_blob(&self, repo: &RepoId, content: &str) -> Result<ObjectId, ForgeError>;

    /// Read a commit's tree and parents.
    async fn get_commit(&self, repo: &RepoId, sha: &ObjectId) -> Result<CommitInfo, ForgeError>;

    /// List every blob reachable from a tree.
    async fn get_tree(&self, repo: &RepoId, sha: &ObjectId) -> Result<TreeListing, ForgeError>;

    /// Create a tree, optionally on top of a base tree.
    async fn create_tree(
        &self,
        repo: &RepoId,
        request: CreateTreeRequest,
    ) -> Result<ObjectId, ForgeError>;

    /// Create a commit object. Does not move any ref.
    async fn create_commit(
        &self,
        repo: &RepoId,
        request: CreateCommitRequest,
    ) -> Result<ObjectId, ForgeError>;

    /// Resolve a branch to its head commit.
    ///
    /// Returns `Ok(None)` when the branch does not exist or the repository
    /// has no commits yet.
    async fn get_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
    ) -> Result<Option<ObjectId>, ForgeError>;

    /// Create a branch pointing at `sha`.
    ///
    /// # Errors
    ///
    /// - `RefConflict` if the branch already exists
    async fn create_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        sha: &ObjectId,
    ) -> Result<(), ForgeError>;

    /// Move a branch to `sha`.
    ///
    /// Without `force`, hosts with `conditional_ref_update` only accept a
    /// fast-forward.
    ///
    /// # Errors
    ///
    /// - `RefConflict` if the update is not a fast-forward
    async fn update_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        sha: &ObjectId,
        force: bool,
    ) -> Result<(), ForgeError>;

    /// Create a new repository.
    ///
    /// # Errors
    ///
    /// - `NameCollision` if the name is already taken
    async fn create_repository(&self, request: CreateRepoRequest) -> Result<RepoInfo, ForgeError>;

    /// Enable static hosting for a repository, built from `branch`.
    async fn enable_static_hosting(
        &self,
        repo: &RepoId,
        branch: &BranchName,
    ) -> Result<HostingInfo, ForgeError>;

    /// Read the current static hosting configuration, if enabled.
    async fn get_static_hosting(&self, repo: &RepoId) -> Result<Option<HostingInfo>, ForgeError>;
}
