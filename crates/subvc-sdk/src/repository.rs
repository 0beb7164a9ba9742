use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use subvc_diff::{DiffEngine, VersionDiff};
use subvc_graph::{HistoryReport, HistoryValidator, VersionGraph, VersionRequest};
use subvc_store::{
    Blob, BlobRef, BlobStore, InMemoryStorage, StateFile, StorageStats, Version,
};
use subvc_types::{BlobId, CommitHash, ContentHash, SubmissionId, VersionId};

use crate::config::VersionControlConfig;
use crate::error::{SdkError, SdkResult};
use crate::lock::RepoLock;

/// Name of the repository metadata directory.
pub const REPO_DIR: &str = ".subvc";
const CONFIG_FILE: &str = "config.toml";
const STATE_FILE: &str = "state.bin";
const LOCK_FILE: &str = "lock";

/// High-level subvc API.
///
/// In-memory instances keep everything in process. On-disk instances run
/// every mutation under the repository lock: the current state file is
/// loaded into a staging store, the change is applied there and saved, and
/// only then does this handle's view switch to the new state. A mutation
/// that fails at any step leaves both the file and the view untouched.
///
/// Reads are served from this handle's view, which picks up other writers'
/// changes on the next mutation or on [`refresh`](Self::refresh).
pub struct VersionControl {
    config: VersionControlConfig,
    store: Arc<InMemoryStorage>,
    graph: VersionGraph<InMemoryStorage>,
    diff: DiffEngine<InMemoryStorage>,
    disk: Option<OnDisk>,
    /// Keeps this handle's own mutations from queueing on the lock file.
    writer: Mutex<()>,
}

#[derive(Debug)]
struct OnDisk {
    state: StateFile,
    lock_path: PathBuf,
}

impl OnDisk {
    fn new(dir: &Path) -> Self {
        Self {
            state: StateFile::new(dir.join(STATE_FILE)),
            lock_path: dir.join(LOCK_FILE),
        }
    }
}

impl VersionControl {
    /// An empty, purely in-memory instance.
    pub fn in_memory(config: VersionControlConfig) -> SdkResult<Self> {
        let store = InMemoryStorage::with_compression(config.compression.clone());
        Self::assemble(config, store, None)
    }

    /// Create a new repository under `root/.subvc`.
    pub fn init(root: &Path, config: VersionControlConfig) -> SdkResult<Self> {
        let dir = root.join(REPO_DIR);
        if dir.join(CONFIG_FILE).exists() {
            return Err(SdkError::AlreadyInitialized(dir));
        }
        config.graph_config()?;
        std::fs::create_dir_all(&dir)?;
        config.save(&dir.join(CONFIG_FILE))?;

        let store = InMemoryStorage::with_compression(config.compression.clone());
        let vc = Self::assemble(config, store, Some(OnDisk::new(&dir)))?;
        vc.mutate(|_| Ok(()))?;
        info!(path = %dir.display(), "initialized repository");
        Ok(vc)
    }

    /// Open an existing repository under `root/.subvc`.
    pub fn open(root: &Path) -> SdkResult<Self> {
        let dir = root.join(REPO_DIR);
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(SdkError::NotInitialized(root.to_path_buf()));
        }
        let config = VersionControlConfig::load(&config_path)?;

        let disk = OnDisk::new(&dir);
        let store = match disk.state.load()? {
            Some(snapshot) => InMemoryStorage::restore(snapshot, config.compression.clone())?,
            None => InMemoryStorage::with_compression(config.compression.clone()),
        };
        debug!(path = %dir.display(), "opened repository");
        Self::assemble(config, store, Some(disk))
    }

    /// Walk up from `start` to the nearest directory containing `.subvc`.
    pub fn discover(start: &Path) -> SdkResult<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(REPO_DIR).join(CONFIG_FILE).exists())
            .map(Path::to_path_buf)
            .ok_or_else(|| SdkError::NotInitialized(start.to_path_buf()))
    }

    fn assemble(
        config: VersionControlConfig,
        store: InMemoryStorage,
        disk: Option<OnDisk>,
    ) -> SdkResult<Self> {
        let store = Arc::new(store);
        let graph = VersionGraph::new(store.clone(), config.graph_config()?);
        let diff = DiffEngine::new(store.clone(), config.diff.clone());
        Ok(Self {
            config,
            store,
            graph,
            diff,
            disk,
            writer: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &VersionControlConfig {
        &self.config
    }

    /// Path of the state file, for on-disk instances.
    pub fn state_path(&self) -> Option<&Path> {
        self.disk.as_ref().map(|disk| disk.state.path())
    }

    /// Reload this handle's view from the state file. No-op in memory.
    pub fn refresh(&self) -> SdkResult<()> {
        let Some(disk) = &self.disk else {
            return Ok(());
        };
        if let Some(snapshot) = disk.state.load()? {
            self.store.replace(snapshot)?;
        }
        Ok(())
    }

    /// Apply `op` to the repository and publish the result.
    ///
    /// On disk, `op` runs against a staging copy of the latest saved state
    /// while the repository lock is held. The view is replaced only after
    /// the new state is saved.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&VersionGraph<InMemoryStorage>) -> SdkResult<T>,
    ) -> SdkResult<T> {
        let Some(disk) = &self.disk else {
            return op(&self.graph);
        };
        let _writer = self
            .writer
            .lock()
            .map_err(|_| SdkError::Internal("writer lock poisoned".into()))?;
        let _lock = RepoLock::acquire(&disk.lock_path, self.config.lock_timeout())?;

        let compression = self.config.compression.clone();
        let staging = match disk.state.load()? {
            Some(snapshot) => InMemoryStorage::restore(snapshot, compression)?,
            None => InMemoryStorage::with_compression(compression),
        };
        let staging = Arc::new(staging);
        let graph = VersionGraph::new(staging.clone(), self.graph.config().clone());

        let value = op(&graph)?;
        let snapshot = staging.snapshot()?;
        disk.state.save(&snapshot)?;
        self.store.replace(snapshot)?;
        Ok(value)
    }

    // ---- Version operations ----

    pub fn create_version(&self, request: VersionRequest) -> SdkResult<Version> {
        self.mutate(|graph| Ok(graph.create_version(request)?))
    }

    pub fn get_version(&self, id: VersionId) -> SdkResult<Version> {
        Ok(self.graph.get_version(id)?)
    }

    /// Newest first.
    pub fn get_versions(&self, submission: SubmissionId) -> SdkResult<Vec<Version>> {
        Ok(self.graph.get_versions(submission)?)
    }

    pub fn get_latest_version(&self, submission: SubmissionId) -> SdkResult<Version> {
        Ok(self.graph.get_latest_version(submission)?)
    }

    pub fn get_version_by_number(
        &self,
        submission: SubmissionId,
        version_number: u32,
    ) -> SdkResult<Version> {
        Ok(self.graph.get_version_by_number(submission, version_number)?)
    }

    pub fn find_by_commit_hash(&self, hash: &CommitHash) -> SdkResult<Option<Version>> {
        Ok(self.graph.find_by_commit_hash(hash)?)
    }

    pub fn count_versions(&self, submission: SubmissionId) -> SdkResult<usize> {
        Ok(self.graph.count_versions(submission)?)
    }

    pub fn get_snapshots(&self, submission: SubmissionId) -> SdkResult<Vec<Version>> {
        Ok(self.graph.get_snapshots(submission)?)
    }

    pub fn lineage(&self, id: VersionId) -> SdkResult<Vec<Version>> {
        Ok(self.graph.lineage(id)?)
    }

    pub fn get_file_content(&self, version: VersionId, path: &str) -> SdkResult<Vec<u8>> {
        Ok(self.graph.get_file_content(version, path)?)
    }

    pub fn submissions(&self) -> SdkResult<Vec<SubmissionId>> {
        Ok(subvc_store::VersionStore::submissions(self.store.as_ref())?)
    }

    // ---- Diff ----

    pub fn diff(
        &self,
        source: VersionId,
        target: VersionId,
        path: Option<&str>,
    ) -> SdkResult<VersionDiff> {
        Ok(self.diff.diff(source, target, path)?)
    }

    // ---- Integrity ----

    pub fn validate_history(&self, submission: SubmissionId) -> SdkResult<HistoryReport> {
        Ok(HistoryValidator::validate(
            self.store.as_ref(),
            self.graph.config(),
            submission,
        )?)
    }

    pub fn validate_all(&self) -> SdkResult<Vec<HistoryReport>> {
        Ok(HistoryValidator::validate_all(
            self.store.as_ref(),
            self.graph.config(),
        )?)
    }

    // ---- Blob maintenance ----

    pub fn find_blob_by_hash(&self, hash: &ContentHash) -> SdkResult<Option<Blob>> {
        Ok(self.store.find_blob_by_hash(hash)?)
    }

    pub fn read_blob(&self, id: BlobId) -> SdkResult<Option<Blob>> {
        Ok(self.store.read_blob(id)?)
    }

    /// Drop one reference to a blob. Nothing is deleted until
    /// [`collect_garbage`](Self::collect_garbage) runs, and a blob that a
    /// version still binds is never deleted.
    pub fn release_reference(&self, id: BlobId) -> SdkResult<u32> {
        self.mutate(|graph| Ok(graph.store().release_reference(id)?))
    }

    pub fn unreferenced_blobs(&self) -> SdkResult<Vec<BlobRef>> {
        Ok(self.store.unreferenced_blobs()?)
    }

    pub fn collect_garbage(&self) -> SdkResult<Vec<BlobRef>> {
        self.mutate(|graph| Ok(graph.store().collect_garbage()?))
    }

    pub fn stats(&self) -> SdkResult<StorageStats> {
        Ok(self.store.stats()?)
    }
}

impl std::fmt::Debug for VersionControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionControl")
            .field("config", &self.config)
            .field("state", &self.state_path())
            .finish_non_exhaustive()
    }
}
