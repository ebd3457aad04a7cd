//! sync::snapshot
//!
//! Persistence of repository bindings and sync snapshots.
//!
//! # Design
//!
//! Each registry has at most one binding. The binding and its snapshot are
//! stored together as one [`BindingRecord`] and replaced wholesale on every
//! save, so a reader never sees a half-updated snapshot.
//!
//! The persisted record and the domain types are kept apart. The mapping
//! layer in this module converts between them in both directions and
//! validates every field on the way in.
//!
//! Storage setup is an idempotent [`SnapshotStore::ensure_ready`] backed by
//! a single-flight `OnceCell`, so concurrent first callers share one
//! initialization.
//!
//! # Layout
//!
//! [`FileSnapshotStore`] writes `<data_dir>/bindings/<registry-id>.json`
//! as pretty JSON via temp file and rename.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::core::paths::DataPaths;
use crate::core::types::{BranchName, Fingerprint, ObjectId, RegistryId, RepoPath};
use crate::forge::RepoId;
use crate::sync::diff::DesiredFileSet;

/// Current binding record schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from the snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("binding record for '{registry_id}' is corrupt: {message}")]
    Corrupt {
        registry_id: String,
        message: String,
    },

    #[error("binding record for '{registry_id}' has schema version {found}, this build supports up to {supported}")]
    UnsupportedSchema {
        registry_id: String,
        found: u32,
        supported: u32,
    },

    #[error("failed to serialize binding record: {0}")]
    Serialize(String),
}

/// The link between a registry and its remote repository.
///
/// Created once by export. Only the hosting URL changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryBinding {
    pub registry_id: RegistryId,
    pub repo: RepoId,
    /// Web URL of the repository
    pub repo_url: String,
    /// Public static hosting URL, once known
    pub hosting_url: Option<String>,
    pub default_branch: BranchName,
    pub created_at: DateTime<Utc>,
}

/// What was last published, and at which commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSnapshot {
    /// Fingerprint of every published path
    pub files: BTreeMap<RepoPath, Fingerprint>,
    /// Commit the files correspond to; `None` before the first push
    pub last_commit: Option<ObjectId>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl SyncSnapshot {
    /// Snapshot of a binding that has never been pushed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot after successfully publishing `desired` as `commit`.
    pub fn after_push(desired: &DesiredFileSet, commit: ObjectId, at: DateTime<Utc>) -> Self {
        Self {
            files: desired.fingerprints(),
            last_commit: Some(commit),
            last_synced_at: Some(at),
        }
    }
}

/// A binding with its snapshot, as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBinding {
    pub binding: RepositoryBinding,
    pub snapshot: SyncSnapshot,
}

/// Persisted form of a binding and its snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRecord {
    pub registry_id: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub repo_url: String,
    pub hosting_url: Option<String>,
    pub default_branch: String,
    pub created_at: DateTime<Utc>,
    pub last_commit_id: Option<String>,
    /// path -> fingerprint
    pub snapshot: BTreeMap<String, String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub schema_version: u32,
}

impl BindingRecord {
    /// Map domain values to the persisted form.
    pub fn from_domain(binding: &RepositoryBinding, snapshot: &SyncSnapshot) -> Self {
        Self {
            registry_id: binding.registry_id.to_string(),
            repo_owner: binding.repo.owner.clone(),
            repo_name: binding.repo.name.clone(),
            repo_url: binding.repo_url.clone(),
            hosting_url: binding.hosting_url.clone(),
            default_branch: binding.default_branch.to_string(),
            created_at: binding.created_at,
            last_commit_id: snapshot.last_commit.as_ref().map(|c| c.to_string()),
            snapshot: snapshot
                .files
                .iter()
                .map(|(path, fp)| (path.to_string(), fp.to_string()))
                .collect(),
            last_synced_at: snapshot.last_synced_at,
            schema_version: SCHEMA_VERSION,
        }
    }

    /// Map the persisted form back to domain values, validating every field.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if any field is invalid and
    /// `StoreError::UnsupportedSchema` for records from a newer build.
    pub fn into_domain(self) -> Result<StoredBinding, StoreError> {
        let corrupt = |message: String| StoreError::Corrupt {
            registry_id: self.registry_id.clone(),
            message,
        };

        if self.schema_version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                registry_id: self.registry_id.clone(),
                found: self.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        if self.repo_owner.is_empty() || self.repo_name.is_empty() {
            return Err(corrupt("repository owner and name are required".into()));
        }

        let registry_id =
            RegistryId::new(self.registry_id.as_str()).map_err(|e| corrupt(e.to_string()))?;
        let default_branch =
            BranchName::new(self.default_branch.as_str()).map_err(|e| corrupt(e.to_string()))?;
        let last_commit = self
            .last_commit_id
            .as_deref()
            .map(ObjectId::new)
            .transpose()
            .map_err(|e| corrupt(e.to_string()))?;
        let files = self
            .snapshot
            .iter()
            .map(|(path, fp)| Ok((RepoPath::new(path.as_str())?, Fingerprint::parse(fp.as_str())?)))
            .collect::<Result<BTreeMap<_, _>, crate::core::types::TypeError>>()
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(StoredBinding {
            binding: RepositoryBinding {
                registry_id,
                repo: RepoId::new(self.repo_owner, self.repo_name),
                repo_url: self.repo_url,
                hosting_url: self.hosting_url,
                default_branch,
                created_at: self.created_at,
            },
            snapshot: SyncSnapshot {
                files,
                last_commit,
                last_synced_at: self.last_synced_at,
            },
        })
    }
}

/// Storage for bindings and snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Prepare storage. Idempotent; concurrent callers share one attempt.
    async fn ensure_ready(&self) -> Result<(), StoreError>;

    /// Load the binding for a registry, if one exists.
    async fn load(&self, id: &RegistryId) -> Result<Option<StoredBinding>, StoreError>;

    /// Replace the binding and snapshot for `binding.registry_id`.
    async fn save(
        &self,
        binding: &RepositoryBinding,
        snapshot: &SyncSnapshot,
    ) -> Result<(), StoreError>;

    /// Remove a binding. Returns whether one existed.
    async fn delete(&self, id: &RegistryId) -> Result<bool, StoreError>;

    /// Ids of every stored binding, sorted.
    async fn list(&self) -> Result<Vec<RegistryId>, StoreError>;
}

/// File-backed snapshot store under the data directory.
#[derive(Debug)]
pub struct FileSnapshotStore {
    paths: DataPaths,
    ready: OnceCell<()>,
}

impl FileSnapshotStore {
    /// Create a store rooted at `paths`. Nothing touches disk until first use.
    pub fn new(paths: DataPaths) -> Self {
        Self {
            paths,
            ready: OnceCell::new(),
        }
    }

    fn io_error(path: PathBuf) -> impl FnOnce(std::io::Error) -> StoreError {
        move |source| StoreError::Io { path, source }
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        self.ready
            .get_or_try_init(|| async {
                debug!(dir = %self.paths.bindings_dir().display(), "initializing snapshot store");
                self.paths
                    .ensure_dirs()
                    .await
                    .map_err(Self::io_error(self.paths.bindings_dir()))
            })
            .await
            .map(|_| ())
    }

    async fn load(&self, id: &RegistryId) -> Result<Option<StoredBinding>, StoreError> {
        self.ensure_ready().await?;
        let path = self.paths.binding_path(id);

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(path)(e)),
        };

        let record: BindingRecord =
            serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                registry_id: id.to_string(),
                message: e.to_string(),
            })?;
        if record.registry_id != id.as_str() {
            return Err(StoreError::Corrupt {
                registry_id: id.to_string(),
                message: format!("file holds registry '{}'", record.registry_id),
            });
        }
        record.into_domain().map(Some)
    }

    async fn save(
        &self,
        binding: &RepositoryBinding,
        snapshot: &SyncSnapshot,
    ) -> Result<(), StoreError> {
        self.ensure_ready().await?;
        let id = &binding.registry_id;
        let record = BindingRecord::from_domain(binding, snapshot);
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        let path = self.paths.binding_path(id);
        let temp_path = self.paths.binding_temp_path(id);

        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(Self::io_error(temp_path.clone()))?;
        file.write_all(json.as_bytes())
            .await
            .map_err(Self::io_error(temp_path.clone()))?;
        file.sync_all()
            .await
            .map_err(Self::io_error(temp_path.clone()))?;
        drop(file);

        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(Self::io_error(path.clone()))?;

        debug!(registry = %id, files = snapshot.files.len(), "saved binding");
        Ok(())
    }

    async fn delete(&self, id: &RegistryId) -> Result<bool, StoreError> {
        self.ensure_ready().await?;
        let path = self.paths.binding_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(path)(e)),
        }
    }

    async fn list(&self) -> Result<Vec<RegistryId>, StoreError> {
        self.ensure_ready().await?;
        let dir = self.paths.bindings_dir();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(Self::io_error(dir.clone()))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(Self::io_error(dir.clone()))?
        {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(id) = RegistryId::new(stem) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// In-memory snapshot store.
///
/// Records go through the same mapping layer as the file store.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    records: Mutex<HashMap<RegistryId, BindingRecord>>,
    ready: OnceCell<()>,
    init_count: AtomicUsize,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times initialization actually ran.
    pub fn init_count(&self) -> usize {
        self.init_count.load(Ordering::SeqCst)
    }

    /// Raw persisted record, for inspection.
    pub fn record(&self, id: &RegistryId) -> Option<BindingRecord> {
        self.records().get(id).cloned()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<RegistryId, BindingRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn ensure_ready(&self) -> Result<(), StoreError> {
        self.ready
            .get_or_init(|| async {
                self.init_count.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
            })
            .await;
        Ok(())
    }

    async fn load(&self, id: &RegistryId) -> Result<Option<StoredBinding>, StoreError> {
        self.ensure_ready().await?;
        let record = self.records().get(id).cloned();
        record.map(BindingRecord::into_domain).transpose()
    }

    async fn save(
        &self,
        binding: &RepositoryBinding,
        snapshot: &SyncSnapshot,
    ) -> Result<(), StoreError> {
        self.ensure_ready().await?;
        let record = BindingRecord::from_domain(binding, snapshot);
        self.records().insert(binding.registry_id.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &RegistryId) -> Result<bool, StoreError> {
        self.ensure_ready().await?;
        Ok(self.records().remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<RegistryId>, StoreError> {
        self.ensure_ready().await?;
        let mut ids: Vec<_> = self.records().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn id(s: &str) -> RegistryId {
        RegistryId::new(s).unwrap()
    }

    fn binding(registry: &str) -> RepositoryBinding {
        RepositoryBinding {
            registry_id: id(registry),
            repo: RepoId::new("acme", "ui"),
            repo_url: "https://github.com/acme/ui".into(),
            hosting_url: Some("https://acme.github.io/ui/".into()),
            default_branch: BranchName::default(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    fn pushed_snapshot() -> SyncSnapshot {
        let mut desired = DesiredFileSet::new();
        desired.insert_str("registry.json", "{}").unwrap();
        desired.insert_str("registry/x/x.tsx", "export {}").unwrap();
        SyncSnapshot::after_push(
            &desired,
            ObjectId::new("c".repeat(40)).unwrap(),
            Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap(),
        )
    }

    mod mapping {
        use super::*;

        #[test]
        fn domain_record_domain() {
            let record = BindingRecord::from_domain(&binding("r1"), &pushed_snapshot());
            assert_eq!(record.repo_owner, "acme");
            assert_eq!(record.last_commit_id.as_deref(), Some("c".repeat(40).as_str()));
            assert_eq!(record.snapshot.len(), 2);
            assert_eq!(record.schema_version, SCHEMA_VERSION);

            let stored = record.into_domain().unwrap();
            assert_eq!(stored.binding, binding("r1"));
            assert_eq!(stored.snapshot, pushed_snapshot());
        }

        #[test]
        fn rejects_invalid_fields() {
            let good = BindingRecord::from_domain(&binding("r1"), &pushed_snapshot());

            let mut bad = good.clone();
            bad.last_commit_id = Some("zzz".into());
            assert!(matches!(bad.into_domain(), Err(StoreError::Corrupt { .. })));

            let mut bad = good.clone();
            bad.snapshot.insert("../escape".into(), "0".repeat(64));
            assert!(matches!(bad.into_domain(), Err(StoreError::Corrupt { .. })));

            let mut bad = good.clone();
            bad.default_branch = "bad branch".into();
            assert!(matches!(bad.into_domain(), Err(StoreError::Corrupt { .. })));

            let mut bad = good;
            bad.repo_owner.clear();
            assert!(matches!(bad.into_domain(), Err(StoreError::Corrupt { .. })));
        }

        #[test]
        fn rejects_newer_schema() {
            let mut record = BindingRecord::from_domain(&binding("r1"), &SyncSnapshot::empty());
            record.schema_version = SCHEMA_VERSION + 1;
            assert!(matches!(
                record.into_domain(),
                Err(StoreError::UnsupportedSchema { found, .. }) if found == SCHEMA_VERSION + 1
            ));
        }
    }

    mod file_store {
        use super::*;

        fn store(temp: &TempDir) -> FileSnapshotStore {
            FileSnapshotStore::new(DataPaths::new(temp.path().join("data")))
        }

        #[tokio::test]
        async fn load_missing_is_none() {
            let temp = TempDir::new().unwrap();
            assert!(store(&temp).load(&id("nope")).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn save_then_load() {
            let temp = TempDir::new().unwrap();
            let store = store(&temp);
            store.save(&binding("r1"), &pushed_snapshot()).await.unwrap();

            let stored = store.load(&id("r1")).await.unwrap().unwrap();
            assert_eq!(stored.binding, binding("r1"));
            assert_eq!(stored.snapshot, pushed_snapshot());
            assert!(!temp.path().join("data/bindings/r1.json.tmp").exists());
        }

        #[tokio::test]
        async fn save_replaces_wholesale() {
            let temp = TempDir::new().unwrap();
            let store = store(&temp);
            store.save(&binding("r1"), &pushed_snapshot()).await.unwrap();
            store.save(&binding("r1"), &SyncSnapshot::empty()).await.unwrap();

            let stored = store.load(&id("r1")).await.unwrap().unwrap();
            assert_eq!(stored.snapshot, SyncSnapshot::empty());
        }

        #[tokio::test]
        async fn record_is_pretty_json() {
            let temp = TempDir::new().unwrap();
            store(&temp)
                .save(&binding("r1"), &pushed_snapshot())
                .await
                .unwrap();

            let raw =
                std::fs::read_to_string(temp.path().join("data/bindings/r1.json")).unwrap();
            assert!(raw.contains("\n  \"repo_owner\": \"acme\""));
            assert!(raw.contains("\"schema_version\": 1"));
        }

        #[tokio::test]
        async fn corrupt_file_is_reported() {
            let temp = TempDir::new().unwrap();
            let store = store(&temp);
            store.ensure_ready().await.unwrap();
            std::fs::write(temp.path().join("data/bindings/r1.json"), "{ not json").unwrap();

            assert!(matches!(
                store.load(&id("r1")).await,
                Err(StoreError::Corrupt { .. })
            ));
        }

        #[tokio::test]
        async fn delete_and_list() {
            let temp = TempDir::new().unwrap();
            let store = store(&temp);
            store.save(&binding("b"), &SyncSnapshot::empty()).await.unwrap();
            store.save(&binding("a"), &SyncSnapshot::empty()).await.unwrap();

            assert_eq!(store.list().await.unwrap(), vec![id("a"), id("b")]);
            assert!(store.delete(&id("a")).await.unwrap());
            assert!(!store.delete(&id("a")).await.unwrap());
            assert_eq!(store.list().await.unwrap(), vec![id("b")]);
        }

        #[tokio::test]
        async fn ensure_ready_creates_directories_once() {
            let temp = TempDir::new().unwrap();
            let store = Arc::new(store(&temp));

            let (a, b) = tokio::join!(store.ensure_ready(), store.ensure_ready());
            a.unwrap();
            b.unwrap();
            assert!(temp.path().join("data/bindings").is_dir());
        }
    }

    mod memory_store {
        use super::*;

        #[tokio::test]
        async fn single_flight_initialization() {
            let store = Arc::new(MemorySnapshotStore::new());
            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move { store.ensure_ready().await })
                })
                .collect();
            for task in tasks {
                task.await.unwrap().unwrap();
            }
            store.load(&id("r1")).await.unwrap();

            assert_eq!(store.init_count(), 1);
        }

        #[tokio::test]
        async fn goes_through_mapping_layer() {
            let store = MemorySnapshotStore::new();
            store.save(&binding("r1"), &pushed_snapshot()).await.unwrap();

            let record = store.record(&id("r1")).unwrap();
            assert_eq!(record.repo_name, "ui");
            let stored = store.load(&id("r1")).await.unwrap().unwrap();
            assert_eq!(stored.snapshot.last_commit, pushed_snapshot().last_commit);
        }
    }
}
