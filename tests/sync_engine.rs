//! Integration tests for the sync engine.
//!
//! Every test runs the engine against the in-memory host and snapshot store
//! and checks the resulting remote state: commits, trees, refs, and the
//! number of write requests issued.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use regsync::core::types::{BranchName, RegistryId};
use regsync::forge::mock::{FailOn, MockHost, MockOperation};
use regsync::forge::{ForgeError, HostCapabilities, RepoId, Visibility};
use regsync::registry::{ItemFile, Registry, RegistryItem};
use regsync::sync::{
    DesiredFileSet, ExportOptions, MemorySnapshotStore, PushOptions, PushOutcome,
    RepositoryBinding, SnapshotStore, StatusAdvice, SyncEngine, SyncError, SyncSnapshot,
};

// =============================================================================
// Test Fixtures
// =============================================================================

/// An engine wired to a mock host and an in-memory store.
struct Harness {
    host: MockHost,
    store: Arc<MemorySnapshotStore>,
    engine: SyncEngine,
}

impl Harness {
    fn new() -> Self {
        Self::with_host(MockHost::new())
    }

    fn with_host(host: MockHost) -> Self {
        let store = Arc::new(MemorySnapshotStore::new());
        let engine = SyncEngine::new(Arc::new(host.clone()), store.clone(), 4);
        Self {
            host,
            store,
            engine,
        }
    }

    /// Export the sample registry and return the repository it landed in.
    async fn exported(&self) -> RepoId {
        let outcome = self
            .engine
            .export(&registry(), &export_options())
            .await
            .expect("export failed");
        outcome.binding.repo
    }

    fn head(&self, repo: &RepoId) -> regsync::core::types::ObjectId {
        self.host
            .head(repo, &main_branch())
            .expect("branch should exist")
    }

    fn files(&self, repo: &RepoId) -> BTreeMap<String, String> {
        self.host.tree_files(repo, &self.head(repo))
    }

    async fn push(&self, desired: &DesiredFileSet) -> PushOutcome {
        self.engine
            .push(&registry_id(), desired, &PushOptions::default())
            .await
            .expect("push failed")
    }

    async fn force_push(&self, desired: &DesiredFileSet) -> PushOutcome {
        let options = PushOptions {
            force: true,
            ..Default::default()
        };
        self.engine
            .push(&registry_id(), desired, &options)
            .await
            .expect("push failed")
    }
}

fn registry_id() -> RegistryId {
    RegistryId::new("acme-ui").unwrap()
}

fn main_branch() -> BranchName {
    BranchName::new("main").unwrap()
}

fn item(name: &str, content: &str) -> RegistryItem {
    RegistryItem {
        name: name.into(),
        kind: "registry:ui".into(),
        title: None,
        description: None,
        version: None,
        dependencies: vec![],
        registry_dependencies: vec![],
        files: vec![ItemFile {
            path: format!("{name}.tsx"),
            kind: "registry:ui".into(),
            target: None,
            content: content.into(),
        }],
    }
}

fn registry() -> Registry {
    Registry {
        id: registry_id(),
        name: "Acme UI".into(),
        description: Some("Components for Acme apps.".into()),
        homepage: None,
        items: vec![item("button", "export function Button() {}\n")],
    }
}

fn export_options() -> ExportOptions {
    ExportOptions {
        repo_name: "acme-ui".into(),
        org: Some("acme".into()),
        visibility: Visibility::Public,
        description: None,
    }
}

/// A binding of the sample registry to `branch` of `repo`.
fn binding(repo: &RepoId, branch: &str) -> RepositoryBinding {
    RepositoryBinding {
        registry_id: registry_id(),
        repo: repo.clone(),
        repo_url: format!("https://github.com/{repo}"),
        hosting_url: None,
        default_branch: BranchName::new(branch).unwrap(),
        created_at: Utc::now(),
    }
}

fn desired(files: &[(&str, &str)]) -> DesiredFileSet {
    let mut set = DesiredFileSet::new();
    for (path, content) in files {
        set.insert_str(path, *content).unwrap();
    }
    set
}

fn as_map(files: &[(&str, &str)]) -> BTreeMap<String, String> {
    files
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect()
}

fn pushed(outcome: PushOutcome) -> regsync::core::types::ObjectId {
    match outcome {
        PushOutcome::Pushed { commit, .. } => commit,
        other => panic!("expected a push, got {other:?}"),
    }
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn export_creates_repository_and_publishes_scaffold() {
    let h = Harness::new();
    let outcome = h.engine.export(&registry(), &export_options()).await.unwrap();

    let repo = outcome.binding.repo.clone();
    assert_eq!(repo, RepoId::new("acme", "acme-ui"));
    assert_eq!(h.host.repository_count(), 1);
    assert_eq!(outcome.binding.hosting_url, h.host.hosting_url(&repo));
    assert_eq!(
        outcome.binding.hosting_url.as_deref(),
        Some("https://acme.github.io/acme-ui/")
    );

    let commit = pushed(outcome.push);
    assert_eq!(
        h.host.commit_message(&repo, &commit).as_deref(),
        Some("Initial export of Acme UI")
    );

    let files = h.files(&repo);
    for path in [
        "registry.json",
        "registry/button/button.tsx",
        "package.json",
        ".github/workflows/publish.yml",
        "README.md",
    ] {
        assert!(files.contains_key(path), "missing {path}");
    }
    // The auto-init README was replaced, not merged.
    assert!(files["README.md"].starts_with("# Acme UI"));
    assert!(files["registry.json"].contains("https://acme.github.io/acme-ui/"));
}

#[tokio::test]
async fn export_twice_is_refused() {
    let h = Harness::new();
    h.exported().await;

    let err = h
        .engine
        .export(&registry(), &export_options())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::AlreadyExported { .. }));
    assert_eq!(h.host.repository_count(), 1);
}

#[tokio::test]
async fn export_name_collision_leaves_no_binding() {
    let h = Harness::new();
    h.host.seed_repository(&RepoId::new("acme", "acme-ui"), true);

    let err = h
        .engine
        .export(&registry(), &export_options())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Forge(ForgeError::NameCollision(ref name)) if name == "acme-ui"
    ));
    assert!(h.store.load(&registry_id()).await.unwrap().is_none());
}

#[tokio::test]
async fn interrupted_export_resumes_without_new_repository() {
    let h = Harness::new();
    h.host
        .set_fail_on(FailOn::EnableStaticHosting(ForgeError::RateLimited));

    let err = h
        .engine
        .export(&registry(), &export_options())
        .await
        .unwrap_err();
    assert!(err.is_transient());

    let stored = h.store.load(&registry_id()).await.unwrap().unwrap();
    assert!(stored.binding.hosting_url.is_none());
    assert!(stored.snapshot.last_commit.is_none());

    h.host.clear_fail_on();
    let outcome = h.engine.export(&registry(), &export_options()).await.unwrap();
    assert!(matches!(outcome.push, PushOutcome::Pushed { .. }));
    assert!(outcome.binding.hosting_url.is_some());
    assert_eq!(h.host.repository_count(), 1);
    assert_eq!(
        h.host
            .count(|op| matches!(op, MockOperation::CreateRepository { .. })),
        1
    );
}

// =============================================================================
// Push
// =============================================================================

#[tokio::test]
async fn repeated_push_writes_nothing() {
    let h = Harness::new();
    h.exported().await;
    let desired = h.engine.desired_for(&registry()).await.unwrap();

    h.host.clear_operations();
    let outcome = h.push(&desired).await;

    assert_eq!(outcome, PushOutcome::AlreadyUpToDate);
    assert_eq!(h.host.write_count(), 0);
}

#[tokio::test]
async fn forced_push_without_changes_writes_nothing() {
    let h = Harness::new();
    h.exported().await;
    let desired = h.engine.desired_for(&registry()).await.unwrap();

    h.host.clear_operations();
    let outcome = h.force_push(&desired).await;

    assert_eq!(outcome, PushOutcome::AlreadyUpToDate);
    assert_eq!(h.host.write_count(), 0);
}

#[tokio::test]
async fn pushed_tree_matches_desired_set() {
    let h = Harness::new();
    let repo = h.exported().await;
    let files = [("index.ts", "export {}\n"), ("lib/utils.ts", "export const x = 1;\n")];

    h.force_push(&desired(&files)).await;

    assert_eq!(h.files(&repo), as_map(&files));
}

#[tokio::test]
async fn modify_and_add_builds_on_previous_commit() {
    let h = Harness::new();
    let repo = h.exported().await;
    let c1 = pushed(h.force_push(&desired(&[("r.json", "h1")])).await);

    h.host.clear_operations();
    let outcome = h
        .push(&desired(&[("r.json", "h2"), ("items/x.tsx", "x")]))
        .await;

    let PushOutcome::Pushed { commit: c2, changes } = outcome else {
        panic!("expected a push, got {outcome:?}");
    };
    assert_eq!((changes.added, changes.modified, changes.deleted), (1, 1, 0));
    assert_eq!(h.host.blob_count(), 2);
    assert_eq!(h.host.commit(&repo, &c2).unwrap().parents, vec![c1]);
    assert_eq!(
        h.files(&repo),
        as_map(&[("r.json", "h2"), ("items/x.tsx", "x")])
    );
    let snapshot = h.store.load(&registry_id()).await.unwrap().unwrap().snapshot;
    assert_eq!(snapshot.last_commit, Some(c2));
    assert_eq!(snapshot.files.len(), 2);
}

#[tokio::test]
async fn removed_file_disappears_from_tree() {
    let h = Harness::new();
    let repo = h.exported().await;
    h.force_push(&desired(&[("a", "1"), ("b", "2"), ("c", "3")]))
        .await;

    h.host.clear_operations();
    let outcome = h.push(&desired(&[("a", "1"), ("c", "3")])).await;

    assert!(matches!(outcome, PushOutcome::Pushed { changes, .. } if changes.deleted == 1));
    assert_eq!(h.host.blob_count(), 0);
    assert_eq!(h.files(&repo), as_map(&[("a", "1"), ("c", "3")]));
}

#[tokio::test]
async fn removal_without_base_tree_support_merges_listing() {
    let h = Harness::with_host(MockHost::with_capabilities(HostCapabilities {
        base_tree: false,
        conditional_ref_update: true,
    }));
    let repo = h.exported().await;
    h.force_push(&desired(&[("a", "1"), ("b", "2"), ("c", "3")]))
        .await;

    h.host.clear_operations();
    h.push(&desired(&[("a", "1"), ("c", "4")])).await;

    assert_eq!(
        h.host
            .count(|op| matches!(op, MockOperation::GetTree { .. })),
        1
    );
    assert_eq!(
        h.host.count(|op| matches!(
            op,
            MockOperation::CreateTree {
                base_tree: None,
                ..
            }
        )),
        1
    );
    assert_eq!(h.files(&repo), as_map(&[("a", "1"), ("c", "4")]));
}

#[tokio::test]
async fn truncated_listing_without_base_tree_fails_before_ref_write() {
    let h = Harness::with_host(MockHost::with_capabilities(HostCapabilities {
        base_tree: false,
        conditional_ref_update: true,
    }));
    let repo = h.exported().await;
    let before = h.head(&repo);

    h.host.truncate_listings(true);
    h.host.clear_operations();
    let err = h
        .engine
        .push(
            &registry_id(),
            &desired(&[("a", "1")]),
            &PushOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Build(_)));
    assert_eq!(h.host.ref_write_count(), 0);
    assert_eq!(h.head(&repo), before);
}

#[tokio::test]
async fn failed_blob_leaves_branch_and_snapshot_alone() {
    let h = Harness::new();
    let repo = h.exported().await;
    let before = h.head(&repo);
    let snapshot_before = h.store.load(&registry_id()).await.unwrap().unwrap().snapshot;

    h.host.set_fail_on(FailOn::CreateBlobContaining(
        "boom".into(),
        ForgeError::ApiError {
            status: 502,
            message: "upstream unavailable".into(),
        },
    ));
    h.host.clear_operations();
    let err = h
        .engine
        .push(
            &registry_id(),
            &desired(&[("ok.ts", "fine"), ("bad.ts", "boom")]),
            &PushOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert_eq!(h.host.ref_write_count(), 0);
    assert_eq!(
        h.host
            .count(|op| matches!(op, MockOperation::CreateCommit { .. })),
        0
    );
    assert_eq!(h.head(&repo), before);
    let snapshot_after = h.store.load(&registry_id()).await.unwrap().unwrap().snapshot;
    assert_eq!(snapshot_after, snapshot_before);
}

// =============================================================================
// Conflicts
// =============================================================================

#[tokio::test]
async fn remote_edit_blocks_push_without_writes() {
    let h = Harness::new();
    let repo = h.exported().await;
    let local = h.head(&repo);
    let remote = h
        .host
        .advance_branch(&repo, &main_branch(), &[("EDITED.md", "by hand")])
        .unwrap();

    h.host.clear_operations();
    let outcome = h.push(&desired(&[("a", "1")])).await;

    assert_eq!(
        outcome,
        PushOutcome::Conflict {
            local: Some(local),
            remote: Some(remote.clone()),
        }
    );
    assert_eq!(h.host.write_count(), 0);
    assert_eq!(h.head(&repo), remote);
}

#[tokio::test]
async fn force_push_supersedes_remote_edit() {
    let h = Harness::new();
    let repo = h.exported().await;
    let remote = h
        .host
        .advance_branch(&repo, &main_branch(), &[("EDITED.md", "by hand")])
        .unwrap();

    let files = [("a", "1"), ("b", "2")];
    let commit = pushed(h.force_push(&desired(&files)).await);

    assert_eq!(h.host.commit(&repo, &commit).unwrap().parents, vec![remote]);
    assert_eq!(h.files(&repo), as_map(&files));
    assert_eq!(
        h.host
            .count(|op| matches!(op, MockOperation::UpdateRef { force: true, .. })),
        0
    );

    let status = h.engine.status(&registry_id()).await.unwrap();
    assert_eq!(status.advice(), StatusAdvice::InSync);
}

#[tokio::test]
async fn lost_race_reports_conflict_and_keeps_snapshot() {
    let h = Harness::new();
    let repo = h.exported().await;
    let snapshot_before = h.store.load(&registry_id()).await.unwrap().unwrap().snapshot;

    h.host.inject_race(&repo, &main_branch());
    let outcome = h.push(&desired(&[("a", "1")])).await;

    let PushOutcome::Conflict { local, remote } = outcome else {
        panic!("expected a conflict, got {outcome:?}");
    };
    assert_eq!(local, snapshot_before.last_commit);
    assert_eq!(remote, Some(h.head(&repo)));
    let snapshot_after = h.store.load(&registry_id()).await.unwrap().unwrap().snapshot;
    assert_eq!(snapshot_after, snapshot_before);

    // The foreign commit stays in place until a forced push.
    let again = h.push(&desired(&[("a", "1")])).await;
    assert!(matches!(again, PushOutcome::Conflict { .. }));
    assert!(matches!(
        h.force_push(&desired(&[("a", "1")])).await,
        PushOutcome::Pushed { .. }
    ));
}

// =============================================================================
// Missing branches
// =============================================================================

#[tokio::test]
async fn missing_branch_is_recreated_without_parent() {
    let h = Harness::new();
    let repo = RepoId::new("acme", "acme-ui");
    h.host.seed_repository(&repo, true);
    let published = h.host.head(&repo, &main_branch()).unwrap();
    let files = [("index.ts", "export {}\n")];
    h.store
        .save(
            &binding(&repo, "pub"),
            &SyncSnapshot::after_push(&desired(&files), published, Utc::now()),
        )
        .await
        .unwrap();

    let status = h.engine.status(&registry_id()).await.unwrap();
    assert!(status.has_remote_changes);
    assert_eq!(status.remote_commit, None);
    assert_eq!(status.advice(), StatusAdvice::RemoteMissing);

    h.host.clear_operations();
    let commit = pushed(h.push(&desired(&files)).await);

    let branch = BranchName::new("pub").unwrap();
    assert_eq!(h.host.head(&repo, &branch), Some(commit.clone()));
    assert!(h.host.commit(&repo, &commit).unwrap().parents.is_empty());
    assert_eq!(h.host.tree_files(&repo, &commit), as_map(&files));
    assert_eq!(
        h.host
            .count(|op| matches!(op, MockOperation::CreateRef { branch: b, .. } if *b == branch)),
        1
    );
    assert_eq!(
        h.host
            .count(|op| matches!(op, MockOperation::UpdateRef { .. })),
        0
    );
}

#[tokio::test]
async fn empty_repository_is_reported_before_any_write() {
    let h = Harness::new();
    let repo = RepoId::new("acme", "acme-ui");
    h.host.seed_repository(&repo, false);
    h.store
        .save(&binding(&repo, "main"), &SyncSnapshot::empty())
        .await
        .unwrap();

    let err = h
        .engine
        .push(&registry_id(), &desired(&[("a", "1")]), &PushOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::EmptyRepository { ref repo, .. } if repo == "acme/acme-ui"));
    assert!(err.to_string().contains("has no commits"));
    assert!(!err.is_transient());
    assert_eq!(h.host.write_count(), 0);

    let status = h.engine.status(&registry_id()).await.unwrap();
    assert!(!status.has_remote_changes);
    assert_eq!(status.advice(), StatusAdvice::NeverPushed);
}

// =============================================================================
// Status
// =============================================================================

#[tokio::test]
async fn status_tracks_remote_changes() {
    let h = Harness::new();
    let repo = h.exported().await;

    let status = h.engine.status(&registry_id()).await.unwrap();
    assert!(!status.has_remote_changes);
    assert_eq!(status.local_commit, status.remote_commit);
    assert!(status.last_synced_at.is_some());

    h.host
        .advance_branch(&repo, &main_branch(), &[("x", "y")])
        .unwrap();
    h.host.clear_operations();
    let status = h.engine.status(&registry_id()).await.unwrap();
    assert!(status.has_remote_changes);
    assert_eq!(status.advice(), StatusAdvice::RemoteAhead);
    assert_eq!(h.host.write_count(), 0);
}

#[tokio::test]
async fn bindings_lists_exported_registries() {
    let h = Harness::new();
    assert!(h.engine.bindings().await.unwrap().is_empty());

    h.exported().await;
    assert_eq!(h.engine.bindings().await.unwrap(), vec![registry_id()]);
}
