use subvc_types::{BlobId, ContentHash, SubmissionId, VersionId};

use crate::blob::StorageType;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    BlobNotFound(BlobId),

    /// A version references a parent that does not exist.
    #[error("parent version not found: {0}")]
    ParentNotFound(VersionId),

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for blob {id}: expected {expected}, computed {computed}")]
    HashMismatch {
        id: BlobId,
        expected: ContentHash,
        computed: ContentHash,
    },

    /// The blob's storage type cannot be reconstructed by this engine.
    #[error("blob {id} uses unsupported storage type {storage_type}")]
    UnsupportedStorage {
        id: BlobId,
        storage_type: StorageType,
    },

    /// A version with this number already exists for the submission.
    #[error("version {version_number} already exists for submission {submission}")]
    Conflict {
        submission: SubmissionId,
        version_number: u32,
    },

    /// The same path appears twice in one version.
    #[error("duplicate path in version: {0}")]
    DuplicatePath(String),

    /// Compression or decompression of blob content failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state is malformed or fails its checksum.
    #[error("corrupt state: {0}")]
    Corrupt(String),

    /// A lock guarding the backend was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
