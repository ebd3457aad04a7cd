//! forge::mock
//!
//! In-memory Git host for deterministic testing.
//!
//! # Design
//!
//! The mock host keeps blobs, trees, commits and refs per repository in
//! memory and follows the same rules as GitHub where the sync engine relies
//! on them:
//! - object ids are content hashes, so identical blobs share an id
//! - a non-forced ref update must be a fast-forward
//! - `create_ref` fails if the branch exists
//! - `auto_init` seeds the default branch with a root commit
//!
//! Every call is recorded so tests can assert how many writes happened.
//! Failures, missing capabilities and a concurrent writer can be injected.
//!
//! # Example
//!
//! ```
//! use regsync::forge::mock::MockHost;
//! use regsync::forge::{GitHost, RepoId};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let host = MockHost::new();
//! let repo = RepoId::new("acme", "ui");
//! host.seed_repository(&repo, true);
//!
//! let blob = host.create_blob(&repo, "export {}").await.unwrap();
//! assert_eq!(blob, host.create_blob(&repo, "export {}").await.unwrap());
//! assert_eq!(host.write_count(), 2);
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{
    CommitInfo, CreateCommitRequest, CreateRepoRequest, CreateTreeRequest, FileMode, ForgeError,
    GitHost, HostCapabilities, HostingInfo, RepoId, RepoInfo, TreeEntry, TreeListing,
};
use crate::core::types::{BranchName, ObjectId, RepoPath};

/// Mock host for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    inner: Arc<Mutex<MockHostInner>>,
}

#[derive(Debug, Default)]
struct MockHostInner {
    capabilities: HostCapabilities,
    repos: HashMap<RepoId, MockRepo>,
    fail_on: Option<FailOn>,
    /// Move the branch under the caller right after the next commit is built.
    pending_race: Option<(RepoId, BranchName)>,
    /// Report tree listings as truncated.
    truncate_listings: bool,
    /// Distinguishes commits with identical tree, parents and message.
    commit_counter: u64,
    operations: Vec<MockOperation>,
}

#[derive(Debug, Default)]
struct MockRepo {
    blobs: HashMap<ObjectId, String>,
    trees: HashMap<ObjectId, BTreeMap<RepoPath, (FileMode, ObjectId)>>,
    commits: HashMap<ObjectId, MockCommit>,
    refs: HashMap<BranchName, ObjectId>,
    hosting: Option<String>,
}

#[derive(Debug, Clone)]
struct MockCommit {
    tree: ObjectId,
    parents: Vec<ObjectId>,
    message: String,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail every create_blob with the given error.
    CreateBlob(ForgeError),
    /// Fail create_blob only for content containing the needle.
    CreateBlobContaining(String, ForgeError),
    /// Fail get_commit with the given error.
    GetCommit(ForgeError),
    /// Fail get_tree with the given error.
    GetTree(ForgeError),
    /// Fail create_tree with the given error.
    CreateTree(ForgeError),
    /// Fail create_commit with the given error.
    CreateCommit(ForgeError),
    /// Fail get_ref with the given error.
    GetRef(ForgeError),
    /// Fail create_ref with the given error.
    CreateRef(ForgeError),
    /// Fail update_ref with the given error.
    UpdateRef(ForgeError),
    /// Fail create_repository with the given error.
    CreateRepository(ForgeError),
    /// Fail enable_static_hosting with the given error.
    EnableStaticHosting(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    CreateBlob {
        repo: RepoId,
        content: String,
    },
    GetCommit {
        repo: RepoId,
        sha: ObjectId,
    },
    GetTree {
        repo: RepoId,
        sha: ObjectId,
    },
    CreateTree {
        repo: RepoId,
        base_tree: Option<ObjectId>,
        entries: Vec<TreeEntry>,
    },
    CreateCommit {
        repo: RepoId,
        tree: ObjectId,
        parents: Vec<ObjectId>,
        message: String,
    },
    GetRef {
        repo: RepoId,
        branch: BranchName,
    },
    CreateRef {
        repo: RepoId,
        branch: BranchName,
        sha: ObjectId,
    },
    UpdateRef {
        repo: RepoId,
        branch: BranchName,
        sha: ObjectId,
        force: bool,
    },
    CreateRepository {
        name: String,
        org: Option<String>,
        auto_init: bool,
    },
    EnableStaticHosting {
        repo: RepoId,
    },
    GetStaticHosting {
        repo: RepoId,
    },
}

impl MockOperation {
    /// Whether the operation mutates remote state.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            MockOperation::GetCommit { .. }
                | MockOperation::GetTree { .. }
                | MockOperation::GetRef { .. }
                | MockOperation::GetStaticHosting { .. }
        )
    }
}

fn hash_id(kind: &str, data: &[u8]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(data);
    let digest = hex::encode(hasher.finalize());
    // 40 hex characters, like the SHA-1 ids GitHub hands out.
    ObjectId::new(&digest[..40]).unwrap_or_else(|_| unreachable!("sha256 hex is valid"))
}

fn tree_id(entries: &BTreeMap<RepoPath, (FileMode, ObjectId)>) -> ObjectId {
    let mut data = Vec::new();
    for (path, (mode, sha)) in entries {
        data.extend_from_slice(format!("{} {} {}\n", mode, path, sha).as_bytes());
    }
    hash_id("tree", &data)
}

fn unprocessable(message: impl Into<String>) -> ForgeError {
    ForgeError::ApiError {
        status: 422,
        message: message.into(),
    }
}

impl MockRepo {
    fn insert_tree(&mut self, entries: BTreeMap<RepoPath, (FileMode, ObjectId)>) -> ObjectId {
        let sha = tree_id(&entries);
        self.trees.insert(sha.clone(), entries);
        sha
    }

    /// Whether `ancestor` is reachable from `sha` through parent links.
    fn is_ancestor(&self, ancestor: &ObjectId, sha: &ObjectId) -> bool {
        let mut stack = vec![sha.clone()];
        while let Some(current) = stack.pop() {
            if &current == ancestor {
                return true;
            }
            if let Some(commit) = self.commits.get(&current) {
                stack.extend(commit.parents.iter().cloned());
            }
        }
        false
    }
}

impl MockHostInner {
    fn repo(&self, repo: &RepoId) -> Result<&MockRepo, ForgeError> {
        self.repos
            .get(repo)
            .ok_or_else(|| ForgeError::NotFound(format!("repository {}", repo)))
    }

    fn repo_mut(&mut self, repo: &RepoId) -> Result<&mut MockRepo, ForgeError> {
        self.repos
            .get_mut(repo)
            .ok_or_else(|| ForgeError::NotFound(format!("repository {}", repo)))
    }

    fn next_commit(
        &mut self,
        repo: &RepoId,
        tree: ObjectId,
        parents: Vec<ObjectId>,
        message: String,
    ) -> Result<ObjectId, ForgeError> {
        self.commit_counter += 1;
        let data = format!(
            "{}\n{}\n{}\n{}",
            tree,
            parents
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            message,
            self.commit_counter
        );
        let sha = hash_id("commit", data.as_bytes());
        self.repo_mut(repo)?.commits.insert(
            sha.clone(),
            MockCommit {
                tree,
                parents,
                message,
            },
        );
        Ok(sha)
    }

    /// Commit `files` on top of the branch head without recording an operation.
    fn foreign_commit(
        &mut self,
        repo: &RepoId,
        branch: &BranchName,
        files: &[(&str, &str)],
        message: &str,
    ) -> Result<ObjectId, ForgeError> {
        let r = self.repo_mut(repo)?;
        let head = r.refs.get(branch).cloned();
        let mut entries = match &head {
            Some(head) => r
                .commits
                .get(head)
                .and_then(|c| r.trees.get(&c.tree))
                .cloned()
                .unwrap_or_default(),
            None => BTreeMap::new(),
        };
        for (path, content) in files {
            let path = RepoPath::new(*path).map_err(|e| unprocessable(e.to_string()))?;
            let blob = hash_id("blob", content.as_bytes());
            r.blobs.insert(blob.clone(), content.to_string());
            entries.insert(path, (FileMode::Regular, blob));
        }
        let tree = r.insert_tree(entries);
        let sha = self.next_commit(repo, tree, head.into_iter().collect(), message.to_string())?;
        self.repo_mut(repo)?.refs.insert(branch.clone(), sha.clone());
        Ok(sha)
    }
}

impl MockHost {
    /// Create an empty mock host with full capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock host with the given capabilities.
    pub fn with_capabilities(capabilities: HostCapabilities) -> Self {
        let host = Self::new();
        host.state().capabilities = capabilities;
        host
    }

    fn state(&self) -> MutexGuard<'_, MockHostInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use regsync::forge::mock::{MockHost, FailOn};
    /// use regsync::forge::ForgeError;
    ///
    /// let host = MockHost::new()
    ///     .fail_on(FailOn::CreateTree(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.set_fail_on(fail_on);
        self
    }

    /// Configure a failure on a shared handle.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        self.state().fail_on = Some(fail_on);
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Report every tree listing as truncated.
    pub fn truncate_listings(&self, truncate: bool) {
        self.state().truncate_listings = truncate;
    }

    /// Simulate another writer: right after the next `create_commit` in
    /// `repo`, move `branch` to a foreign commit.
    pub fn inject_race(&self, repo: &RepoId, branch: &BranchName) {
        self.state().pending_race = Some((repo.clone(), branch.clone()));
    }

    /// Create a repository directly, without recording an operation.
    ///
    /// With `auto_init`, `main` gets a root commit containing a README.
    pub fn seed_repository(&self, repo: &RepoId, auto_init: bool) {
        let mut inner = self.state();
        inner.repos.insert(repo.clone(), MockRepo::default());
        if auto_init {
            let readme = format!("# {}\n", repo.name);
            let _ = inner.foreign_commit(
                repo,
                &BranchName::default(),
                &[("README.md", readme.as_str())],
                "Initial commit",
            );
        }
    }

    /// Commit `files` on top of `branch` as some other writer would.
    ///
    /// Returns the new head. Nothing is recorded as an operation.
    pub fn advance_branch(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        files: &[(&str, &str)],
    ) -> Result<ObjectId, ForgeError> {
        self.state()
            .foreign_commit(repo, branch, files, "Edit on the host")
    }

    /// Current head of `branch`.
    pub fn head(&self, repo: &RepoId, branch: &BranchName) -> Option<ObjectId> {
        let inner = self.state();
        inner.repos.get(repo)?.refs.get(branch).cloned()
    }

    /// Commit metadata, if the commit exists.
    pub fn commit(&self, repo: &RepoId, sha: &ObjectId) -> Option<CommitInfo> {
        let inner = self.state();
        let commit = inner.repos.get(repo)?.commits.get(sha)?;
        Some(CommitInfo {
            sha: sha.clone(),
            tree: commit.tree.clone(),
            parents: commit.parents.clone(),
        })
    }

    /// Commit message, if the commit exists.
    pub fn commit_message(&self, repo: &RepoId, sha: &ObjectId) -> Option<String> {
        let inner = self.state();
        Some(inner.repos.get(repo)?.commits.get(sha)?.message.clone())
    }

    /// Full `path -> content` view of a commit's tree.
    pub fn tree_files(&self, repo: &RepoId, commit: &ObjectId) -> BTreeMap<String, String> {
        let inner = self.state();
        let Some(r) = inner.repos.get(repo) else {
            return BTreeMap::new();
        };
        let Some(tree) = r.commits.get(commit).and_then(|c| r.trees.get(&c.tree)) else {
            return BTreeMap::new();
        };
        tree.iter()
            .filter_map(|(path, (_, blob))| {
                r.blobs
                    .get(blob)
                    .map(|content| (path.to_string(), content.clone()))
            })
            .collect()
    }

    /// Static hosting URL, if enabled.
    pub fn hosting_url(&self, repo: &RepoId) -> Option<String> {
        let inner = self.state();
        inner.repos.get(repo)?.hosting.clone()
    }

    /// Number of repositories on the host.
    pub fn repository_count(&self) -> usize {
        self.state().repos.len()
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Number of recorded operations that mutate remote state.
    pub fn write_count(&self) -> usize {
        self.state()
            .operations
            .iter()
            .filter(|op| op.is_write())
            .count()
    }

    /// Number of recorded `create_blob` calls.
    pub fn blob_count(&self) -> usize {
        self.count(|op| matches!(op, MockOperation::CreateBlob { .. }))
    }

    /// Number of recorded `create_ref` and `update_ref` calls.
    pub fn ref_write_count(&self) -> usize {
        self.count(|op| {
            matches!(
                op,
                MockOperation::CreateRef { .. } | MockOperation::UpdateRef { .. }
            )
        })
    }

    /// Number of recorded operations matching `pred`.
    pub fn count(&self, pred: impl Fn(&MockOperation) -> bool) -> usize {
        self.state().operations.iter().filter(|op| pred(op)).count()
    }

    fn record(&self, op: MockOperation) {
        self.state().operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str, content: Option<&str>) -> Result<(), ForgeError> {
        let inner = self.state();
        let err = match (&inner.fail_on, expected) {
            (Some(FailOn::CreateBlob(e)), "create_blob") => e,
            (Some(FailOn::CreateBlobContaining(needle, e)), "create_blob")
                if content.is_some_and(|c| c.contains(needle.as_str())) =>
            {
                e
            }
            (Some(FailOn::GetCommit(e)), "get_commit") => e,
            (Some(FailOn::GetTree(e)), "get_tree") => e,
            (Some(FailOn::CreateTree(e)), "create_tree") => e,
            (Some(FailOn::CreateCommit(e)), "create_commit") => e,
            (Some(FailOn::GetRef(e)), "get_ref") => e,
            (Some(FailOn::CreateRef(e)), "create_ref") => e,
            (Some(FailOn::UpdateRef(e)), "update_ref") => e,
            (Some(FailOn::CreateRepository(e)), "create_repository") => e,
            (Some(FailOn::EnableStaticHosting(e)), "enable_static_hosting") => e,
            _ => return Ok(()),
        };
        Err(err.clone())
    }
}

#[async_trait]
impl GitHost for MockHost {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn capabilities(&self) -> HostCapabilities {
        self.state().capabilities
    }

    async fn create_blob(&self, repo: &RepoId, content: &str) -> Result<ObjectId, ForgeError> {
        self.record(MockOperation::CreateBlob {
            repo: repo.clone(),
            content: content.to_string(),
        });
        self.check_fail("create_blob", Some(content))?;

        let mut inner = self.state();
        let r = inner.repo_mut(repo)?;
        if r.refs.is_empty() {
            return Err(ForgeError::ApiError {
                status: 409,
                message: "Git Repository is empty.".into(),
            });
        }
        let sha = hash_id("blob", content.as_bytes());
        r.blobs.insert(sha.clone(), content.to_string());
        Ok(sha)
    }

    async fn get_commit(&self, repo: &RepoId, sha: &ObjectId) -> Result<CommitInfo, ForgeError> {
        self.record(MockOperation::GetCommit {
            repo: repo.clone(),
            sha: sha.clone(),
        });
        self.check_fail("get_commit", None)?;

        let inner = self.state();
        let commit = inner
            .repo(repo)?
            .commits
            .get(sha)
            .ok_or_else(|| ForgeError::NotFound(format!("commit {}", sha)))?;
        Ok(CommitInfo {
            sha: sha.clone(),
            tree: commit.tree.clone(),
            parents: commit.parents.clone(),
        })
    }

    async fn get_tree(&self, repo: &RepoId, sha: &ObjectId) -> Result<TreeListing, ForgeError> {
        self.record(MockOperation::GetTree {
            repo: repo.clone(),
            sha: sha.clone(),
        });
        self.check_fail("get_tree", None)?;

        let inner = self.state();
        let tree = inner
            .repo(repo)?
            .trees
            .get(sha)
            .ok_or_else(|| ForgeError::NotFound(format!("tree {}", sha)))?;
        Ok(TreeListing {
            entries: tree
                .iter()
                .map(|(path, (mode, blob))| TreeEntry {
                    path: path.clone(),
                    mode: *mode,
                    sha: Some(blob.clone()),
                })
                .collect(),
            truncated: inner.truncate_listings,
        })
    }

    async fn create_tree(
        &self,
        repo: &RepoId,
        request: CreateTreeRequest,
    ) -> Result<ObjectId, ForgeError> {
        self.record(MockOperation::CreateTree {
            repo: repo.clone(),
            base_tree: request.base_tree.clone(),
            entries: request.entries.clone(),
        });
        self.check_fail("create_tree", None)?;

        let mut inner = self.state();
        let supports_base = inner.capabilities.base_tree;
        let r = inner.repo_mut(repo)?;

        let mut entries = match &request.base_tree {
            Some(_) if !supports_base => {
                return Err(unprocessable("base_tree is not supported by this host"))
            }
            Some(base) => r
                .trees
                .get(base)
                .cloned()
                .ok_or_else(|| unprocessable(format!("base_tree {} does not exist", base)))?,
            None => BTreeMap::new(),
        };

        for entry in request.entries {
            match entry.sha {
                Some(sha) => {
                    if !r.blobs.contains_key(&sha) {
                        return Err(unprocessable(format!("blob {} does not exist", sha)));
                    }
                    entries.insert(entry.path, (entry.mode, sha));
                }
                None => {
                    if entries.remove(&entry.path).is_none() {
                        return Err(unprocessable(format!(
                            "cannot remove '{}': not in base tree",
                            entry.path
                        )));
                    }
                }
            }
        }

        Ok(r.insert_tree(entries))
    }

    async fn create_commit(
        &self,
        repo: &RepoId,
        request: CreateCommitRequest,
    ) -> Result<ObjectId, ForgeError> {
        self.record(MockOperation::CreateCommit {
            repo: repo.clone(),
            tree: request.tree.clone(),
            parents: request.parents.clone(),
            message: request.message.clone(),
        });
        self.check_fail("create_commit", None)?;

        let mut inner = self.state();
        {
            let r = inner.repo(repo)?;
            if !r.trees.contains_key(&request.tree) {
                return Err(unprocessable(format!("tree {} does not exist", request.tree)));
            }
            if let Some(missing) = request.parents.iter().find(|p| !r.commits.contains_key(p)) {
                return Err(unprocessable(format!("parent {} does not exist", missing)));
            }
        }
        let sha = inner.next_commit(repo, request.tree, request.parents, request.message)?;

        if let Some((race_repo, branch)) = inner.pending_race.take() {
            if &race_repo == repo {
                inner.foreign_commit(
                    repo,
                    &branch,
                    &[("RACE.md", "concurrent edit\n")],
                    "Concurrent edit",
                )?;
            } else {
                inner.pending_race = Some((race_repo, branch));
            }
        }

        Ok(sha)
    }

    async fn get_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
    ) -> Result<Option<ObjectId>, ForgeError> {
        self.record(MockOperation::GetRef {
            repo: repo.clone(),
            branch: branch.clone(),
        });
        self.check_fail("get_ref", None)?;

        let inner = self.state();
        let r = inner.repo(repo)?;
        if r.refs.is_empty() {
            return Err(ForgeError::EmptyRepository(repo.to_string()));
        }
        Ok(r.refs.get(branch).cloned())
    }

    async fn create_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        sha: &ObjectId,
    ) -> Result<(), ForgeError> {
        self.record(MockOperation::CreateRef {
            repo: repo.clone(),
            branch: branch.clone(),
            sha: sha.clone(),
        });
        self.check_fail("create_ref", None)?;

        let mut inner = self.state();
        let r = inner.repo_mut(repo)?;
        if r.refs.contains_key(branch) {
            return Err(ForgeError::RefConflict(format!(
                "{} already exists",
                branch.qualified()
            )));
        }
        if !r.commits.contains_key(sha) {
            return Err(unprocessable(format!("commit {} does not exist", sha)));
        }
        r.refs.insert(branch.clone(), sha.clone());
        Ok(())
    }

    async fn update_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        sha: &ObjectId,
        force: bool,
    ) -> Result<(), ForgeError> {
        self.record(MockOperation::UpdateRef {
            repo: repo.clone(),
            branch: branch.clone(),
            sha: sha.clone(),
            force,
        });
        self.check_fail("update_ref", None)?;

        let mut inner = self.state();
        let conditional = inner.capabilities.conditional_ref_update;
        let r = inner.repo_mut(repo)?;
        let current = r
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| unprocessable("Reference does not exist"))?;
        if !r.commits.contains_key(sha) {
            return Err(unprocessable(format!("commit {} does not exist", sha)));
        }
        if conditional && !force && !r.is_ancestor(&current, sha) {
            return Err(ForgeError::RefConflict(format!(
                "{} is not a fast forward of {}",
                sha.short(7),
                branch
            )));
        }
        r.refs.insert(branch.clone(), sha.clone());
        Ok(())
    }

    async fn create_repository(&self, request: CreateRepoRequest) -> Result<RepoInfo, ForgeError> {
        self.record(MockOperation::CreateRepository {
            name: request.name.clone(),
            org: request.org.clone(),
            auto_init: request.auto_init,
        });
        self.check_fail("create_repository", None)?;

        let owner = request.org.clone().unwrap_or_else(|| "mock-user".to_string());
        let id = RepoId::new(owner, request.name.clone());
        if self.state().repos.contains_key(&id) {
            return Err(ForgeError::NameCollision(request.name));
        }
        self.seed_repository(&id, request.auto_init);

        Ok(RepoInfo {
            html_url: format!("https://github.com/{}", id),
            default_branch: BranchName::default().to_string(),
            id,
        })
    }

    async fn enable_static_hosting(
        &self,
        repo: &RepoId,
        _branch: &BranchName,
    ) -> Result<HostingInfo, ForgeError> {
        self.record(MockOperation::EnableStaticHosting { repo: repo.clone() });
        self.check_fail("enable_static_hosting", None)?;

        let mut inner = self.state();
        let r = inner.repo_mut(repo)?;
        let url = format!("https://{}.github.io/{}/", repo.owner, repo.name);
        r.hosting = Some(url.clone());
        Ok(HostingInfo { url })
    }

    async fn get_static_hosting(&self, repo: &RepoId) -> Result<Option<HostingInfo>, ForgeError> {
        self.record(MockOperation::GetStaticHosting { repo: repo.clone() });

        let inner = self.state();
        Ok(inner
            .repo(repo)?
            .hosting
            .clone()
            .map(|url| HostingInfo { url }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoId {
        RepoId::new("acme", "ui")
    }

    fn main() -> BranchName {
        BranchName::default()
    }

    fn path(p: &str) -> RepoPath {
        RepoPath::new(p).unwrap()
    }

    #[tokio::test]
    async fn auto_init_seeds_branch() {
        let host = MockHost::new();
        host.seed_repository(&repo(), true);

        let head = host.get_ref(&repo(), &main()).await.unwrap().unwrap();
        let files = host.tree_files(&repo(), &head);
        assert_eq!(files.get("README.md").map(String::as_str), Some("# ui\n"));
        assert!(host.commit(&repo(), &head).unwrap().parents.is_empty());
    }

    #[tokio::test]
    async fn empty_repository_rejects_blobs() {
        let host = MockHost::new();
        host.seed_repository(&repo(), false);

        let err = host.get_ref(&repo(), &main()).await.unwrap_err();
        assert!(matches!(err, ForgeError::EmptyRepository(_)));
        let err = host.create_blob(&repo(), "x").await.unwrap_err();
        assert!(matches!(err, ForgeError::ApiError { status: 409, .. }));
    }

    #[tokio::test]
    async fn base_tree_inherits_and_removes() {
        let host = MockHost::new();
        host.seed_repository(&repo(), true);
        let head = host
            .advance_branch(&repo(), &main(), &[("a.txt", "a"), ("b.txt", "b")])
            .unwrap();
        let base = host.commit(&repo(), &head).unwrap().tree;

        let c = host.create_blob(&repo(), "c").await.unwrap();
        let tree = host
            .create_tree(
                &repo(),
                CreateTreeRequest {
                    base_tree: Some(base),
                    entries: vec![
                        TreeEntry::blob(path("c.txt"), c),
                        TreeEntry::removal(path("b.txt")),
                    ],
                },
            )
            .await
            .unwrap();
        let commit = host
            .create_commit(
                &repo(),
                CreateCommitRequest {
                    message: "edit".into(),
                    tree,
                    parents: vec![head],
                },
            )
            .await
            .unwrap();

        let files = host.tree_files(&repo(), &commit);
        let paths: Vec<_> = files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["README.md", "a.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn removing_missing_path_is_rejected() {
        let host = MockHost::new();
        host.seed_repository(&repo(), true);

        let err = host
            .create_tree(
                &repo(),
                CreateTreeRequest {
                    base_tree: None,
                    entries: vec![TreeEntry::removal(path("ghost.txt"))],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::ApiError { status: 422, .. }));
    }

    #[tokio::test]
    async fn base_tree_rejected_without_capability() {
        let host = MockHost::with_capabilities(HostCapabilities {
            base_tree: false,
            conditional_ref_update: true,
        });
        host.seed_repository(&repo(), true);
        let head = host.head(&repo(), &main()).unwrap();
        let base = host.commit(&repo(), &head).unwrap().tree;

        let result = host
            .create_tree(
                &repo(),
                CreateTreeRequest {
                    base_tree: Some(base),
                    entries: vec![],
                },
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn non_fast_forward_update_conflicts() {
        let host = MockHost::new();
        host.seed_repository(&repo(), true);
        let root = host.head(&repo(), &main()).unwrap();
        let tree = host.commit(&repo(), &root).unwrap().tree;

        // Sibling of the current head, not a descendant
        let sibling = host
            .create_commit(
                &repo(),
                CreateCommitRequest {
                    message: "orphan".into(),
                    tree,
                    parents: vec![],
                },
            )
            .await
            .unwrap();

        let err = host
            .update_ref(&repo(), &main(), &sibling, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::RefConflict(_)));
        assert_eq!(host.head(&repo(), &main()), Some(root));

        host.update_ref(&repo(), &main(), &sibling, true)
            .await
            .unwrap();
        assert_eq!(host.head(&repo(), &main()), Some(sibling));
    }

    #[tokio::test]
    async fn create_ref_on_existing_branch_conflicts() {
        let host = MockHost::new();
        host.seed_repository(&repo(), true);
        let head = host.head(&repo(), &main()).unwrap();

        let err = host.create_ref(&repo(), &main(), &head).await.unwrap_err();
        assert!(matches!(err, ForgeError::RefConflict(_)));
    }

    #[tokio::test]
    async fn injected_race_moves_branch_after_commit() {
        let host = MockHost::new();
        host.seed_repository(&repo(), true);
        let root = host.head(&repo(), &main()).unwrap();
        let tree = host.commit(&repo(), &root).unwrap().tree;
        host.inject_race(&repo(), &main());

        let ours = host
            .create_commit(
                &repo(),
                CreateCommitRequest {
                    message: "ours".into(),
                    tree,
                    parents: vec![root.clone()],
                },
            )
            .await
            .unwrap();

        let head = host.head(&repo(), &main()).unwrap();
        assert_ne!(head, root);
        assert_ne!(head, ours);
    }

    #[tokio::test]
    async fn name_collision() {
        let host = MockHost::new();
        let request = CreateRepoRequest {
            name: "ui".into(),
            org: Some("acme".into()),
            description: None,
            visibility: Default::default(),
            auto_init: true,
        };
        host.create_repository(request.clone()).await.unwrap();

        let err = host.create_repository(request).await.unwrap_err();
        assert!(matches!(err, ForgeError::NameCollision(name) if name == "ui"));
        assert_eq!(host.repository_count(), 1);
    }

    #[tokio::test]
    async fn fail_on_blob_content() {
        let host = MockHost::new().fail_on(FailOn::CreateBlobContaining(
            "boom".into(),
            ForgeError::NetworkError("reset".into()),
        ));
        host.seed_repository(&repo(), true);

        assert!(host.create_blob(&repo(), "fine").await.is_ok());
        assert!(host.create_blob(&repo(), "boom!").await.is_err());
        assert_eq!(host.blob_count(), 2);
    }

    #[tokio::test]
    async fn reads_are_not_writes() {
        let host = MockHost::new();
        host.seed_repository(&repo(), true);

        host.get_ref(&repo(), &main()).await.unwrap();
        host.get_static_hosting(&repo()).await.unwrap();
        assert_eq!(host.operations().len(), 2);
        assert_eq!(host.write_count(), 0);
    }
}
