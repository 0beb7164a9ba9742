use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use subvc_types::{BlobId, CommitHash, ContentHash, SubmissionId, VersionId};
use tracing::{debug, warn};

use crate::blob::{Blob, BlobRef, CompressionConfig, EncodedBlob};
use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobStore, Storage, VersionStore};
use crate::version::{NewVersion, Version, VersionFile};

#[derive(Default)]
struct Tables {
    blobs: BTreeMap<BlobId, Blob>,
    blob_by_hash: HashMap<ContentHash, BlobId>,
    versions: BTreeMap<VersionId, Version>,
    by_submission: HashMap<SubmissionId, BTreeMap<u32, VersionId>>,
    by_commit: HashMap<CommitHash, VersionId>,
    next_blob_id: u64,
    next_version_id: u64,
}

impl Tables {
    fn empty() -> Self {
        Self {
            next_blob_id: 1,
            next_version_id: 1,
            ..Self::default()
        }
    }

    fn insert_blob(&mut self, blob: Blob) {
        self.blob_by_hash.insert(blob.content_hash, blob.id);
        self.blobs.insert(blob.id, blob);
    }

    fn insert_version(&mut self, version: Version) {
        self.by_submission
            .entry(version.submission_id)
            .or_default()
            .insert(version.version_number, version.id);
        self.by_commit.insert(version.commit_hash.clone(), version.id);
        self.versions.insert(version.id, version);
    }

    fn alloc_blob_id(&mut self) -> BlobId {
        let id = BlobId::new(self.next_blob_id);
        self.next_blob_id += 1;
        id
    }

    fn blob_mut(&mut self, id: BlobId) -> StoreResult<&mut Blob> {
        self.blobs.get_mut(&id).ok_or(StoreError::BlobNotFound(id))
    }

    fn from_snapshot(snapshot: StorageSnapshot) -> StoreResult<Self> {
        let mut tables = Self::empty();
        tables.next_blob_id = tables.next_blob_id.max(snapshot.next_blob_id);
        tables.next_version_id = tables.next_version_id.max(snapshot.next_version_id);

        for blob in snapshot.blobs {
            if tables.blob_by_hash.contains_key(&blob.content_hash) {
                return Err(StoreError::Corrupt(format!(
                    "duplicate blob for hash {}",
                    blob.content_hash
                )));
            }
            tables.next_blob_id = tables.next_blob_id.max(blob.id.get() + 1);
            tables.insert_blob(blob);
        }

        for version in snapshot.versions {
            let taken = tables
                .by_submission
                .get(&version.submission_id)
                .is_some_and(|numbers| numbers.contains_key(&version.version_number));
            if taken {
                return Err(StoreError::Corrupt(format!(
                    "duplicate version {} for submission {}",
                    version.version_number, version.submission_id
                )));
            }
            tables.next_version_id = tables.next_version_id.max(version.id.get() + 1);
            tables.insert_version(version);
        }

        debug!(
            blobs = tables.blobs.len(),
            versions = tables.versions.len(),
            "restored storage snapshot"
        );
        Ok(tables)
    }

    /// Blobs bound by at least one version file.
    fn bound_blobs(&self) -> HashSet<BlobId> {
        self.versions
            .values()
            .flat_map(|v| v.files.iter().map(|f| f.blob_id))
            .collect()
    }

    /// Zero-count blobs that no version binds.
    fn collectable(&self) -> Vec<BlobRef> {
        let bound = self.bound_blobs();
        self.blobs
            .values()
            .filter(|b| b.reference_count == 0 && !bound.contains(&b.id))
            .map(Blob::to_ref)
            .collect()
    }

    fn submission_versions(&self, submission: SubmissionId) -> impl Iterator<Item = &Version> {
        self.by_submission
            .get(&submission)
            .into_iter()
            .flat_map(|numbers| numbers.values().rev())
            .filter_map(|id| self.versions.get(id))
    }
}

/// Serializable image of an [`InMemoryStorage`], used for durable snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub blobs: Vec<Blob>,
    pub versions: Vec<Version>,
    /// Id counters, so ids freed by garbage collection are never reissued.
    pub next_blob_id: u64,
    pub next_version_id: u64,
}

/// Aggregate counters over a storage backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub blob_count: usize,
    pub unreferenced_blobs: usize,
    pub version_count: usize,
    pub submission_count: usize,
    /// Sum of uncompressed blob sizes.
    pub logical_bytes: u64,
    /// Sum of bytes actually held, after compression.
    pub stored_bytes: u64,
}

/// In-memory storage backend.
///
/// Every table lives behind one `RwLock`, so a version commit (blob inserts,
/// reference increments, version insert) is a single critical section.
pub struct InMemoryStorage {
    compression: CompressionConfig,
    tables: RwLock<Tables>,
}

impl InMemoryStorage {
    /// Create an empty store with compression disabled.
    pub fn new() -> Self {
        Self::with_compression(CompressionConfig::default())
    }

    pub fn with_compression(compression: CompressionConfig) -> Self {
        Self {
            compression,
            tables: RwLock::new(Tables::empty()),
        }
    }

    pub fn compression(&self) -> &CompressionConfig {
        &self.compression
    }

    /// Rebuild a store from a snapshot, re-deriving every index.
    pub fn restore(snapshot: StorageSnapshot, compression: CompressionConfig) -> StoreResult<Self> {
        Ok(Self {
            compression,
            tables: RwLock::new(Tables::from_snapshot(snapshot)?),
        })
    }

    /// Swap the entire contents for `snapshot`. Readers see either the old
    /// state or the new one, never a mix.
    pub fn replace(&self, snapshot: StorageSnapshot) -> StoreResult<()> {
        let tables = Tables::from_snapshot(snapshot)?;
        *self.write()? = tables;
        Ok(())
    }

    /// Capture every record for persistence.
    pub fn snapshot(&self) -> StoreResult<StorageSnapshot> {
        let tables = self.read()?;
        Ok(StorageSnapshot {
            blobs: tables.blobs.values().cloned().collect(),
            versions: tables.versions.values().cloned().collect(),
            next_blob_id: tables.next_blob_id,
            next_version_id: tables.next_version_id,
        })
    }

    pub fn stats(&self) -> StoreResult<StorageStats> {
        let tables = self.read()?;
        let mut stats = StorageStats {
            blob_count: tables.blobs.len(),
            version_count: tables.versions.len(),
            submission_count: tables.by_submission.len(),
            unreferenced_blobs: tables.collectable().len(),
            ..StorageStats::default()
        };
        for blob in tables.blobs.values() {
            stats.logical_bytes += blob.size_bytes;
            stats.stored_bytes += blob.content.len() as u64;
        }
        Ok(stats)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("InMemoryStorage");
        if let Ok(tables) = self.tables.read() {
            s.field("blob_count", &tables.blobs.len())
                .field("version_count", &tables.versions.len());
        }
        s.finish()
    }
}

impl BlobStore for InMemoryStorage {
    fn read_blob(&self, id: BlobId) -> StoreResult<Option<Blob>> {
        Ok(self.read()?.blobs.get(&id).cloned())
    }

    fn find_blob_by_hash(&self, hash: &ContentHash) -> StoreResult<Option<Blob>> {
        let tables = self.read()?;
        Ok(tables
            .blob_by_hash
            .get(hash)
            .and_then(|id| tables.blobs.get(id))
            .cloned())
    }

    fn put(&self, content: &[u8]) -> StoreResult<BlobRef> {
        let encoded = EncodedBlob::encode(content, &self.compression)?;
        let mut tables = self.write()?;

        if let Some(blob) = tables
            .blob_by_hash
            .get(&encoded.content_hash)
            .and_then(|id| tables.blobs.get(id))
        {
            debug!(blob = %blob.id, hash = %blob.content_hash.short_hex(), "blob already stored");
            return Ok(blob.to_ref());
        }

        let id = tables.alloc_blob_id();
        let blob = Blob::from_encoded(id, encoded, chrono::Utc::now());
        let handle = blob.to_ref();
        tables.insert_blob(blob);
        Ok(handle)
    }

    fn add_reference(&self, id: BlobId) -> StoreResult<u32> {
        let mut tables = self.write()?;
        let blob = tables.blob_mut(id)?;
        blob.reference_count = blob.reference_count.saturating_add(1);
        Ok(blob.reference_count)
    }

    fn release_reference(&self, id: BlobId) -> StoreResult<u32> {
        let mut tables = self.write()?;
        let blob = tables.blob_mut(id)?;
        blob.reference_count = blob.reference_count.saturating_sub(1);
        Ok(blob.reference_count)
    }

    fn unreferenced_blobs(&self) -> StoreResult<Vec<BlobRef>> {
        Ok(self.read()?.collectable())
    }

    fn collect_garbage(&self) -> StoreResult<Vec<BlobRef>> {
        let mut tables = self.write()?;
        let doomed = tables.collectable();

        for handle in &doomed {
            tables.blobs.remove(&handle.id);
            tables.blob_by_hash.remove(&handle.content_hash);
        }

        if !doomed.is_empty() {
            warn!(removed = doomed.len(), "collected unreferenced blobs");
        }
        Ok(doomed)
    }

    fn blob_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.blobs.len())
    }
}

impl VersionStore for InMemoryStorage {
    fn read_version(&self, id: VersionId) -> StoreResult<Option<Version>> {
        Ok(self.read()?.versions.get(&id).cloned())
    }

    fn versions_for(&self, submission: SubmissionId) -> StoreResult<Vec<Version>> {
        Ok(self
            .read()?
            .submission_versions(submission)
            .cloned()
            .collect())
    }

    fn latest_version(&self, submission: SubmissionId) -> StoreResult<Option<Version>> {
        Ok(self.read()?.submission_versions(submission).next().cloned())
    }

    fn max_version_number(&self, submission: SubmissionId) -> StoreResult<u32> {
        Ok(self
            .read()?
            .by_submission
            .get(&submission)
            .and_then(|numbers| numbers.keys().next_back().copied())
            .unwrap_or(0))
    }

    fn version_by_number(
        &self,
        submission: SubmissionId,
        version_number: u32,
    ) -> StoreResult<Option<Version>> {
        let tables = self.read()?;
        Ok(tables
            .by_submission
            .get(&submission)
            .and_then(|numbers| numbers.get(&version_number))
            .and_then(|id| tables.versions.get(id))
            .cloned())
    }

    fn version_by_commit_hash(&self, hash: &CommitHash) -> StoreResult<Option<Version>> {
        let tables = self.read()?;
        Ok(tables
            .by_commit
            .get(hash)
            .and_then(|id| tables.versions.get(id))
            .cloned())
    }

    fn count_versions(&self, submission: SubmissionId) -> StoreResult<usize> {
        Ok(self
            .read()?
            .by_submission
            .get(&submission)
            .map_or(0, BTreeMap::len))
    }

    fn submissions(&self) -> StoreResult<Vec<SubmissionId>> {
        let mut ids: Vec<SubmissionId> = self.read()?.by_submission.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

impl Storage for InMemoryStorage {
    fn commit_version(&self, new_version: NewVersion) -> StoreResult<Version> {
        // Hash and compress before taking the lock.
        let mut staged = BTreeMap::new();
        for file in new_version.files {
            let encoded = EncodedBlob::encode(&file.content, &self.compression)?;
            if staged.contains_key(&file.file_path) {
                return Err(StoreError::DuplicatePath(file.file_path));
            }
            staged.insert(file.file_path.clone(), (file, encoded));
        }

        let mut tables = self.write()?;

        // Validate everything before mutating so a rejected commit leaves no trace.
        let taken = tables
            .by_submission
            .get(&new_version.submission_id)
            .is_some_and(|numbers| numbers.contains_key(&new_version.version_number));
        if taken {
            return Err(StoreError::Conflict {
                submission: new_version.submission_id,
                version_number: new_version.version_number,
            });
        }
        if let Some(parent) = new_version.parent_version_id {
            if !tables.versions.contains_key(&parent) {
                return Err(StoreError::ParentNotFound(parent));
            }
        }

        let mut files = Vec::with_capacity(staged.len());
        let mut total_size_bytes = 0u64;
        for (path, (file, encoded)) in staged {
            let existing = tables.blob_by_hash.get(&encoded.content_hash).copied();
            let blob_id = match existing {
                Some(id) => {
                    debug!(blob = %id, path = %path, "deduplicated file content");
                    id
                }
                None => {
                    let id = tables.alloc_blob_id();
                    tables.insert_blob(Blob::from_encoded(id, encoded.clone(), new_version.created_at));
                    id
                }
            };
            let blob = tables.blob_mut(blob_id)?;
            blob.reference_count = blob.reference_count.saturating_add(1);

            total_size_bytes += encoded.size_bytes;
            files.push(VersionFile {
                file_path: path,
                file_name: file.file_name,
                file_extension: file.file_extension,
                content_type: file.content_type,
                file_size_bytes: encoded.size_bytes,
                blob_id,
                content_hash: encoded.content_hash,
            });
        }

        let id = VersionId::new(tables.next_version_id);
        tables.next_version_id += 1;

        let version = Version {
            id,
            submission_id: new_version.submission_id,
            version_number: new_version.version_number,
            commit_hash: new_version.commit_hash,
            parent_version_id: new_version.parent_version_id,
            commit_message: new_version.commit_message,
            trigger_type: new_version.trigger_type,
            created_by: new_version.created_by,
            metadata: new_version.metadata,
            total_files: files.len() as u32,
            total_size_bytes,
            is_snapshot: new_version.is_snapshot,
            created_at: new_version.created_at,
            files,
        };
        tables.insert_version(version.clone());
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::StorageType;
    use crate::version::{Metadata, NewVersionFile};
    use chrono::Utc;
    use subvc_crypto::ContentHasher;
    use subvc_types::TriggerType;

    fn file(path: &str, content: &[u8]) -> NewVersionFile {
        NewVersionFile {
            file_path: path.into(),
            file_name: path.rsplit('/').next().unwrap_or(path).into(),
            file_extension: String::new(),
            content_type: "application/octet-stream".into(),
            content: content.to_vec(),
        }
    }

    fn new_version(
        submission: u64,
        number: u32,
        parent: Option<VersionId>,
        files: Vec<NewVersionFile>,
    ) -> NewVersion {
        NewVersion {
            submission_id: SubmissionId::new(submission),
            version_number: number,
            commit_hash: ContentHasher::commit_hash(SubmissionId::new(submission), number, 1000)
                .unwrap(),
            parent_version_id: parent,
            commit_message: Some(format!("v{number}")),
            trigger_type: TriggerType::Manual,
            created_by: Some("alice".into()),
            metadata: Metadata::new(),
            is_snapshot: false,
            created_at: Utc::now(),
            files,
        }
    }

    // -----------------------------------------------------------------------
    // Blob store
    // -----------------------------------------------------------------------

    #[test]
    fn put_is_idempotent() {
        let store = InMemoryStorage::new();
        let a = store.put(b"same bytes").unwrap();
        let b = store.put(b"same bytes").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.blob_count().unwrap(), 1);
    }

    #[test]
    fn put_does_not_touch_reference_count() {
        let store = InMemoryStorage::new();
        let handle = store.put(b"content").unwrap();
        store.put(b"content").unwrap();
        let blob = store.read_blob(handle.id).unwrap().unwrap();
        assert_eq!(blob.reference_count, 0);
    }

    #[test]
    fn get_returns_original_bytes() {
        let store = InMemoryStorage::new();
        let handle = store.put(b"payload").unwrap();
        assert_eq!(store.get(handle.id).unwrap(), b"payload");
    }

    #[test]
    fn get_missing_blob_is_not_found() {
        let store = InMemoryStorage::new();
        assert!(matches!(
            store.get(BlobId::new(42)).unwrap_err(),
            StoreError::BlobNotFound(_)
        ));
    }

    #[test]
    fn empty_payload_is_storable() {
        let store = InMemoryStorage::new();
        let handle = store.put(b"").unwrap();
        assert_eq!(handle.size_bytes, 0);
        assert_eq!(handle.content_hash, ContentHasher::hash(b""));
        assert!(store.get(handle.id).unwrap().is_empty());
    }

    #[test]
    fn find_by_hash() {
        let store = InMemoryStorage::new();
        let handle = store.put(b"findable").unwrap();
        let found = store
            .find_blob_by_hash(&ContentHasher::hash(b"findable"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, handle.id);
        assert!(store
            .find_blob_by_hash(&ContentHasher::hash(b"absent"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn compressed_store_roundtrips() {
        let store = InMemoryStorage::with_compression(CompressionConfig::zstd());
        let content = "fn main() {}\n".repeat(1000);
        let handle = store.put(content.as_bytes()).unwrap();
        let blob = store.read_blob(handle.id).unwrap().unwrap();
        assert!(blob.is_compressed);
        assert_eq!(blob.storage_type, StorageType::Full);
        assert_eq!(store.get(handle.id).unwrap(), content.as_bytes());
    }

    #[test]
    fn reading_delta_blob_fails_loudly() {
        let store = InMemoryStorage::new();
        let handle = store.put(b"base").unwrap();
        {
            let mut tables = store.write().unwrap();
            let blob = tables.blob_mut(handle.id).unwrap();
            blob.storage_type = StorageType::Delta;
            blob.base_blob_id = Some(handle.id);
        }
        assert!(matches!(
            store.get(handle.id).unwrap_err(),
            StoreError::UnsupportedStorage { .. }
        ));
    }

    #[test]
    fn release_reference_saturates() {
        let store = InMemoryStorage::new();
        let handle = store.put(b"x").unwrap();
        assert_eq!(store.add_reference(handle.id).unwrap(), 1);
        assert_eq!(store.release_reference(handle.id).unwrap(), 0);
        assert_eq!(store.release_reference(handle.id).unwrap(), 0);
    }

    #[test]
    fn reference_ops_on_missing_blob_fail() {
        let store = InMemoryStorage::new();
        assert!(store.add_reference(BlobId::new(1)).is_err());
        assert!(store.release_reference(BlobId::new(1)).is_err());
    }

    #[test]
    fn garbage_collection_removes_only_unreferenced() {
        let store = InMemoryStorage::new();
        store.put(b"orphan").unwrap();
        let v = store
            .commit_version(new_version(1, 1, None, vec![file("kept.txt", b"kept")]))
            .unwrap();

        assert_eq!(store.count_unreferenced_blobs().unwrap(), 1);
        let removed = store.collect_garbage().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].content_hash, ContentHasher::hash(b"orphan"));

        assert_eq!(store.blob_count().unwrap(), 1);
        assert!(store
            .find_blob_by_hash(&ContentHasher::hash(b"orphan"))
            .unwrap()
            .is_none());
        assert_eq!(store.get(v.files[0].blob_id).unwrap(), b"kept");
    }

    #[test]
    fn garbage_collection_on_clean_store_is_noop() {
        let store = InMemoryStorage::new();
        assert!(store.collect_garbage().unwrap().is_empty());
    }

    #[test]
    fn garbage_collection_keeps_bound_blobs() {
        let store = InMemoryStorage::new();
        let v = store
            .commit_version(new_version(1, 1, None, vec![file("a.txt", b"bound")]))
            .unwrap();
        let blob = v.files[0].blob_id;

        assert_eq!(store.release_reference(blob).unwrap(), 0);
        assert!(store.unreferenced_blobs().unwrap().is_empty());
        assert_eq!(store.stats().unwrap().unreferenced_blobs, 0);
        assert!(store.collect_garbage().unwrap().is_empty());
        assert_eq!(store.get(blob).unwrap(), b"bound");
    }

    // -----------------------------------------------------------------------
    // Version commits
    // -----------------------------------------------------------------------

    #[test]
    fn commit_assigns_ids_and_aggregates() {
        let store = InMemoryStorage::new();
        let v = store
            .commit_version(new_version(
                1,
                1,
                None,
                vec![file("b.txt", b"bb"), file("a.txt", b"a")],
            ))
            .unwrap();

        assert_eq!(v.id, VersionId::new(1));
        assert_eq!(v.total_files, 2);
        assert_eq!(v.total_size_bytes, 3);
        let paths: Vec<&str> = v.files.iter().map(|f| f.file_path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
        assert_eq!(store.read_version(v.id).unwrap().unwrap(), v);
    }

    #[test]
    fn commit_increments_once_per_binding() {
        let store = InMemoryStorage::new();
        let v = store
            .commit_version(new_version(
                1,
                1,
                None,
                vec![file("one.txt", b"dup"), file("two.txt", b"dup")],
            ))
            .unwrap();

        assert_eq!(v.files[0].blob_id, v.files[1].blob_id);
        assert_eq!(store.blob_count().unwrap(), 1);
        let blob = store.read_blob(v.files[0].blob_id).unwrap().unwrap();
        assert_eq!(blob.reference_count, 2);
    }

    #[test]
    fn identical_content_across_submissions_shares_one_blob() {
        let store = InMemoryStorage::new();
        let a = store
            .commit_version(new_version(1, 1, None, vec![file("t.txt", b"TEMPLATE\n")]))
            .unwrap();
        let b = store
            .commit_version(new_version(2, 1, None, vec![file("t.txt", b"TEMPLATE\n")]))
            .unwrap();

        assert_eq!(a.files[0].blob_id, b.files[0].blob_id);
        assert_eq!(store.blob_count().unwrap(), 1);
        let blob = store
            .find_blob_by_hash(&ContentHasher::hash(b"TEMPLATE\n"))
            .unwrap()
            .unwrap();
        assert_eq!(blob.reference_count, 2);
    }

    #[test]
    fn commit_reuses_blob_from_plain_put() {
        let store = InMemoryStorage::new();
        let handle = store.put(b"preloaded").unwrap();
        let v = store
            .commit_version(new_version(1, 1, None, vec![file("p", b"preloaded")]))
            .unwrap();
        assert_eq!(v.files[0].blob_id, handle.id);
        assert_eq!(
            store.read_blob(handle.id).unwrap().unwrap().reference_count,
            1
        );
    }

    #[test]
    fn duplicate_version_number_conflicts() {
        let store = InMemoryStorage::new();
        store
            .commit_version(new_version(1, 1, None, vec![file("a", b"1")]))
            .unwrap();
        let err = store
            .commit_version(new_version(1, 1, None, vec![file("a", b"2")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { version_number: 1, .. }));
    }

    #[test]
    fn rejected_commit_leaves_no_trace() {
        let store = InMemoryStorage::new();
        store
            .commit_version(new_version(1, 1, None, vec![file("a", b"1")]))
            .unwrap();

        let err = store
            .commit_version(new_version(
                1,
                2,
                Some(VersionId::new(99)),
                vec![file("new.txt", b"never stored")],
            ))
            .unwrap_err();
        assert!(matches!(err, StoreError::ParentNotFound(_)));

        assert_eq!(store.blob_count().unwrap(), 1);
        assert_eq!(store.count_versions(SubmissionId::new(1)).unwrap(), 1);
        assert_eq!(store.max_version_number(SubmissionId::new(1)).unwrap(), 1);
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let store = InMemoryStorage::new();
        let err = store
            .commit_version(new_version(
                1,
                1,
                None,
                vec![file("a.txt", b"1"), file("a.txt", b"2")],
            ))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePath(p) if p == "a.txt"));
        assert_eq!(store.blob_count().unwrap(), 0);
    }

    #[test]
    fn empty_file_set_is_a_valid_version() {
        let store = InMemoryStorage::new();
        let v = store.commit_version(new_version(1, 1, None, vec![])).unwrap();
        assert_eq!(v.total_files, 0);
        assert_eq!(v.total_size_bytes, 0);
    }

    // -----------------------------------------------------------------------
    // Version queries
    // -----------------------------------------------------------------------

    fn three_versions(store: &InMemoryStorage) -> Vec<Version> {
        let v1 = store
            .commit_version(new_version(1, 1, None, vec![file("a", b"1")]))
            .unwrap();
        let v2 = store
            .commit_version(new_version(1, 2, Some(v1.id), vec![file("a", b"2")]))
            .unwrap();
        let v3 = store
            .commit_version(new_version(1, 3, Some(v2.id), vec![file("a", b"3")]))
            .unwrap();
        vec![v1, v2, v3]
    }

    #[test]
    fn versions_are_listed_newest_first() {
        let store = InMemoryStorage::new();
        three_versions(&store);
        let numbers: Vec<u32> = store
            .versions_for(SubmissionId::new(1))
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[test]
    fn latest_and_max_number() {
        let store = InMemoryStorage::new();
        assert_eq!(store.max_version_number(SubmissionId::new(1)).unwrap(), 0);
        assert!(store.latest_version(SubmissionId::new(1)).unwrap().is_none());

        three_versions(&store);
        assert_eq!(store.max_version_number(SubmissionId::new(1)).unwrap(), 3);
        assert_eq!(
            store
                .latest_version(SubmissionId::new(1))
                .unwrap()
                .unwrap()
                .version_number,
            3
        );
    }

    #[test]
    fn lookup_by_number_and_commit_hash() {
        let store = InMemoryStorage::new();
        let versions = three_versions(&store);
        let v2 = store
            .version_by_number(SubmissionId::new(1), 2)
            .unwrap()
            .unwrap();
        assert_eq!(v2.id, versions[1].id);

        let found = store
            .version_by_commit_hash(&versions[2].commit_hash)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, versions[2].id);
    }

    #[test]
    fn snapshot_versions_filter() {
        let store = InMemoryStorage::new();
        let mut nv = new_version(1, 1, None, vec![]);
        nv.is_snapshot = true;
        store.commit_version(nv).unwrap();
        store.commit_version(new_version(2, 1, None, vec![])).unwrap();

        assert_eq!(store.snapshot_versions(SubmissionId::new(1)).unwrap().len(), 1);
        assert!(store.snapshot_versions(SubmissionId::new(2)).unwrap().is_empty());
        assert_eq!(
            store.submissions().unwrap(),
            vec![SubmissionId::new(1), SubmissionId::new(2)]
        );
    }

    // -----------------------------------------------------------------------
    // Snapshot / restore
    // -----------------------------------------------------------------------

    #[test]
    fn snapshot_restore_preserves_everything() {
        let store = InMemoryStorage::new();
        let versions = three_versions(&store);
        store.put(b"orphan").unwrap();

        let snapshot = store.snapshot().unwrap();
        let restored = InMemoryStorage::restore(snapshot, CompressionConfig::default()).unwrap();

        assert_eq!(restored.blob_count().unwrap(), 4);
        assert_eq!(restored.count_unreferenced_blobs().unwrap(), 1);
        assert_eq!(
            restored.read_version(versions[1].id).unwrap().unwrap(),
            versions[1]
        );
        assert_eq!(restored.max_version_number(SubmissionId::new(1)).unwrap(), 3);

        // Id allocation continues past restored records.
        let v4 = restored
            .commit_version(new_version(1, 4, Some(versions[2].id), vec![file("a", b"4")]))
            .unwrap();
        assert_eq!(v4.id, VersionId::new(4));
        assert_eq!(v4.files[0].blob_id, BlobId::new(5));
    }

    #[test]
    fn collected_ids_are_not_reissued_after_restore() {
        let store = InMemoryStorage::new();
        store.put(b"first").unwrap();
        let orphan = store.put(b"orphan").unwrap();
        store.collect_garbage().unwrap();

        let restored =
            InMemoryStorage::restore(store.snapshot().unwrap(), CompressionConfig::default())
                .unwrap();
        let next = restored.put(b"new").unwrap();
        assert!(next.id > orphan.id);
    }

    #[test]
    fn replace_swaps_contents() {
        let source = InMemoryStorage::new();
        three_versions(&source);

        let target = InMemoryStorage::new();
        target.put(b"stale").unwrap();
        target.replace(source.snapshot().unwrap()).unwrap();

        assert_eq!(target.snapshot().unwrap(), source.snapshot().unwrap());
        assert_eq!(target.max_version_number(SubmissionId::new(1)).unwrap(), 3);
        assert!(target
            .find_blob_by_hash(&ContentHasher::hash(b"stale"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn replace_with_corrupt_snapshot_keeps_old_contents() {
        let store = InMemoryStorage::new();
        let v = store.commit_version(new_version(1, 1, None, vec![])).unwrap();
        let mut snapshot = store.snapshot().unwrap();
        snapshot.versions.push(v.clone());

        assert!(matches!(store.replace(snapshot), Err(StoreError::Corrupt(_))));
        assert_eq!(store.read_version(v.id).unwrap().unwrap(), v);
    }

    #[test]
    fn restore_rejects_duplicate_versions() {
        let store = InMemoryStorage::new();
        let v = store.commit_version(new_version(1, 1, None, vec![])).unwrap();
        let mut snapshot = store.snapshot().unwrap();
        let mut dup = v.clone();
        dup.id = VersionId::new(2);
        snapshot.versions.push(dup);
        assert!(matches!(
            InMemoryStorage::restore(snapshot, CompressionConfig::default()),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn stats_reflect_contents() {
        let store = InMemoryStorage::new();
        three_versions(&store);
        store.put(b"orphan").unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.blob_count, 4);
        assert_eq!(stats.unreferenced_blobs, 1);
        assert_eq!(stats.version_count, 3);
        assert_eq!(stats.submission_count, 1);
        assert_eq!(stats.logical_bytes, 9);
        assert_eq!(stats.stored_bytes, 9);
    }

    #[test]
    fn concurrent_puts_of_same_content_dedupe() {
        let store = std::sync::Arc::new(InMemoryStorage::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.put(b"shared").unwrap())
            })
            .collect();
        let ids: Vec<BlobId> = handles.into_iter().map(|h| h.join().unwrap().id).collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(store.blob_count().unwrap(), 1);
    }
}
