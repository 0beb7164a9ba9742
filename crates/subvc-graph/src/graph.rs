//! The version graph service.
//!
//! [`VersionGraph`] is the single writer of version history. Versions are
//! stored in the backend's arena keyed by [`VersionId`]; the chain of a
//! submission is recovered by following `parent_version_id` lookups.
//!
//! # Invariants
//!
//! - Version numbers of a submission are exactly `1..=N`, in creation order.
//! - The parent of version `k > 1` is version `k - 1`; version 1 has none.
//! - `is_snapshot` holds iff `version_number % snapshot_interval == 0`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info};

use subvc_crypto::ContentHasher;
use subvc_store::{NewVersion, NewVersionFile, Storage, StoreError, Version};
use subvc_types::{CommitHash, SubmissionId, VersionId};

use crate::error::{GraphError, GraphResult};
use crate::file_info::FileInfo;
use crate::request::VersionRequest;

/// Tunables for version creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphConfig {
    snapshot_interval: u32,
}

impl GraphConfig {
    pub const DEFAULT_SNAPSHOT_INTERVAL: u32 = 10;

    /// Fails if `snapshot_interval` is zero.
    pub fn new(snapshot_interval: u32) -> GraphResult<Self> {
        if snapshot_interval == 0 {
            return Err(GraphError::InvalidConfig(
                "snapshot_interval must be at least 1".into(),
            ));
        }
        Ok(Self { snapshot_interval })
    }

    pub fn snapshot_interval(&self) -> u32 {
        self.snapshot_interval
    }

    pub fn is_snapshot(&self, version_number: u32) -> bool {
        version_number % self.snapshot_interval == 0
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: Self::DEFAULT_SNAPSHOT_INTERVAL,
        }
    }
}

/// Builds and queries the linear version history of every submission.
pub struct VersionGraph<S> {
    store: Arc<S>,
    config: GraphConfig,
    /// One mutex per submission serializes "read max, write max + 1".
    /// Entries exist only while a writer holds or waits on them.
    writers: Mutex<HashMap<SubmissionId, Arc<Mutex<()>>>>,
}

impl<S: Storage> VersionGraph<S> {
    pub fn new(store: Arc<S>, config: GraphConfig) -> Self {
        Self {
            store,
            config,
            writers: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn writer_lock(&self, submission: SubmissionId) -> GraphResult<Arc<Mutex<()>>> {
        let mut writers = self
            .writers
            .lock()
            .map_err(|_| GraphError::Store(StoreError::Poisoned))?;
        Ok(writers.entry(submission).or_default().clone())
    }

    /// Drop the submission's entry once no other caller holds or waits on it.
    fn release_writer(&self, submission: SubmissionId, lock: Arc<Mutex<()>>) {
        let Ok(mut writers) = self.writers.lock() else {
            return;
        };
        // One count is the map's, one is ours.
        if Arc::strong_count(&lock) == 2 {
            writers.remove(&submission);
        }
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Record a new version of `request.submission_id`.
    ///
    /// The new version is numbered one past the current maximum and chained
    /// to the current latest version. File contents are deduplicated by the
    /// store; the version and every binding are persisted atomically.
    pub fn create_version(&self, request: VersionRequest) -> GraphResult<Version> {
        if let Some(path) = request.files.keys().find(|p| !is_valid_path(p)) {
            return Err(GraphError::InvalidPath(path.clone()));
        }

        let submission = request.submission_id;
        let lock = self.writer_lock(submission)?;
        let result = match lock.lock() {
            Ok(_guard) => self.commit_next(submission, request),
            Err(_) => Err(GraphError::Store(StoreError::Poisoned)),
        };
        self.release_writer(submission, lock);
        result
    }

    /// Number, chain and commit one version. Caller holds the submission's writer lock.
    fn commit_next(
        &self,
        submission: SubmissionId,
        request: VersionRequest,
    ) -> GraphResult<Version> {
        let version_number = self.store.max_version_number(submission)? + 1;
        let parent_version_id = self.store.latest_version(submission)?.map(|v| v.id);

        let created_at = Utc::now();
        let commit_hash =
            ContentHasher::commit_hash(submission, version_number, created_at.timestamp_millis())?;

        let files = request
            .files
            .into_iter()
            .map(|(path, content)| {
                let info = FileInfo::from_path(&path);
                NewVersionFile {
                    file_path: path,
                    file_name: info.file_name,
                    file_extension: info.file_extension,
                    content_type: info.content_type,
                    content,
                }
            })
            .collect();

        let version = self.store.commit_version(NewVersion {
            submission_id: submission,
            version_number,
            commit_hash,
            parent_version_id,
            commit_message: request.commit_message,
            trigger_type: request.trigger_type,
            created_by: request.created_by,
            metadata: request.metadata,
            is_snapshot: self.config.is_snapshot(version_number),
            created_at,
            files,
        })?;

        info!(
            submission = %submission,
            version = version.version_number,
            id = %version.id,
            commit = version.commit_hash.short(),
            files = version.total_files,
            bytes = version.total_size_bytes,
            trigger = %version.trigger_type,
            "created version"
        );
        Ok(version)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn get_version(&self, id: VersionId) -> GraphResult<Version> {
        self.store
            .read_version(id)?
            .ok_or(GraphError::VersionNotFound(id))
    }

    /// All versions of a submission, newest first. Empty if it has none.
    pub fn get_versions(&self, submission: SubmissionId) -> GraphResult<Vec<Version>> {
        Ok(self.store.versions_for(submission)?)
    }

    pub fn get_latest_version(&self, submission: SubmissionId) -> GraphResult<Version> {
        self.store
            .latest_version(submission)?
            .ok_or(GraphError::NoVersions(submission))
    }

    pub fn get_version_by_number(
        &self,
        submission: SubmissionId,
        version_number: u32,
    ) -> GraphResult<Version> {
        self.store
            .version_by_number(submission, version_number)?
            .ok_or(GraphError::VersionNumberNotFound {
                submission,
                version_number,
            })
    }

    pub fn find_by_commit_hash(&self, hash: &CommitHash) -> GraphResult<Option<Version>> {
        Ok(self.store.version_by_commit_hash(hash)?)
    }

    pub fn count_versions(&self, submission: SubmissionId) -> GraphResult<usize> {
        Ok(self.store.count_versions(submission)?)
    }

    /// Snapshot-flagged versions of a submission, newest first.
    pub fn get_snapshots(&self, submission: SubmissionId) -> GraphResult<Vec<Version>> {
        Ok(self.store.snapshot_versions(submission)?)
    }

    /// Load the bytes bound to `path` in a version.
    pub fn get_file_content(&self, version_id: VersionId, path: &str) -> GraphResult<Vec<u8>> {
        let version = self.get_version(version_id)?;
        let file = version.file(path).ok_or_else(|| GraphError::FileNotFound {
            version: version_id,
            path: path.to_string(),
        })?;
        debug!(version = %version_id, path, blob = %file.blob_id, "loading file content");
        Ok(self.store.get(file.blob_id)?)
    }

    /// The chain from `version_id` back to the first version, starting with
    /// `version_id` itself.
    pub fn lineage(&self, version_id: VersionId) -> GraphResult<Vec<Version>> {
        let mut chain = vec![self.get_version(version_id)?];
        let mut seen = HashSet::from([version_id]);

        while let Some(parent) = chain.last().and_then(|v| v.parent_version_id) {
            let child = chain.last().map_or(version_id, |v| v.id);
            if !seen.insert(parent) {
                return Err(GraphError::BrokenLineage {
                    version: child,
                    parent,
                });
            }
            let version = self
                .store
                .read_version(parent)?
                .ok_or(GraphError::BrokenLineage {
                    version: child,
                    parent,
                })?;
            chain.push(version);
        }
        Ok(chain)
    }
}

fn is_valid_path(path: &str) -> bool {
    !path.is_empty() && !path.ends_with('/') && !path.contains('\0')
}

impl<S> std::fmt::Debug for VersionGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionGraph")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
