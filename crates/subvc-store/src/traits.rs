use subvc_types::{BlobId, CommitHash, ContentHash, SubmissionId, VersionId};

use crate::blob::{Blob, BlobRef};
use crate::error::{StoreError, StoreResult};
use crate::version::{NewVersion, Version};

/// Content-addressed blob storage.
///
/// All implementations must satisfy these invariants:
/// - At most one blob exists per content hash.
/// - Blob content is immutable once written; only `reference_count` changes.
/// - `put` never touches reference counts. Counts move only through
///   version commits and explicit `add_reference`/`release_reference` calls.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// Read a blob record by id. Returns `Ok(None)` if it does not exist.
    fn read_blob(&self, id: BlobId) -> StoreResult<Option<Blob>>;

    /// Unique-hash lookup.
    fn find_blob_by_hash(&self, hash: &ContentHash) -> StoreResult<Option<Blob>>;

    /// Store `content` if no blob with its hash exists and return a handle.
    ///
    /// Idempotent: a second `put` of identical bytes returns the same blob.
    fn put(&self, content: &[u8]) -> StoreResult<BlobRef>;

    /// Load and verify a blob's payload.
    fn get(&self, id: BlobId) -> StoreResult<Vec<u8>> {
        self.read_blob(id)?
            .ok_or(StoreError::BlobNotFound(id))?
            .decode()
    }

    /// Increment a blob's reference count, returning the new count.
    fn add_reference(&self, id: BlobId) -> StoreResult<u32>;

    /// Decrement a blob's reference count, saturating at zero. Returns the
    /// new count.
    fn release_reference(&self, id: BlobId) -> StoreResult<u32>;

    /// Blobs whose reference count is zero and that no version file binds,
    /// ordered by id.
    fn unreferenced_blobs(&self) -> StoreResult<Vec<BlobRef>>;

    fn count_unreferenced_blobs(&self) -> StoreResult<usize> {
        Ok(self.unreferenced_blobs()?.len())
    }

    /// Delete every blob listed by [`unreferenced_blobs`](Self::unreferenced_blobs)
    /// and return what was removed. Never invoked implicitly.
    fn collect_garbage(&self) -> StoreResult<Vec<BlobRef>>;

    fn blob_count(&self) -> StoreResult<usize>;
}

/// Read access to persisted versions.
pub trait VersionStore: Send + Sync {
    /// Read a version by id. Returns `Ok(None)` if it does not exist.
    fn read_version(&self, id: VersionId) -> StoreResult<Option<Version>>;

    /// All versions of a submission, newest first.
    fn versions_for(&self, submission: SubmissionId) -> StoreResult<Vec<Version>>;

    /// The highest-numbered version of a submission.
    fn latest_version(&self, submission: SubmissionId) -> StoreResult<Option<Version>>;

    /// Highest version number in use for a submission, or 0 if none.
    fn max_version_number(&self, submission: SubmissionId) -> StoreResult<u32>;

    fn version_by_number(
        &self,
        submission: SubmissionId,
        version_number: u32,
    ) -> StoreResult<Option<Version>>;

    fn version_by_commit_hash(&self, hash: &CommitHash) -> StoreResult<Option<Version>>;

    fn count_versions(&self, submission: SubmissionId) -> StoreResult<usize>;

    /// Snapshot-flagged versions of a submission, newest first.
    fn snapshot_versions(&self, submission: SubmissionId) -> StoreResult<Vec<Version>> {
        Ok(self
            .versions_for(submission)?
            .into_iter()
            .filter(|v| v.is_snapshot)
            .collect())
    }

    /// Every submission with at least one version, ascending.
    fn submissions(&self) -> StoreResult<Vec<SubmissionId>>;
}

/// A complete persistence backend.
pub trait Storage: BlobStore + VersionStore {
    /// Persist a version and all of its file bindings as one unit.
    ///
    /// Within the unit the backend stores any blob whose hash is not yet
    /// known, increments each bound blob's reference count once per binding,
    /// and rejects the commit if `(submission_id, version_number)` is taken,
    /// the parent is unknown, or a path repeats. On error nothing is written.
    fn commit_version(&self, new_version: NewVersion) -> StoreResult<Version>;
}
