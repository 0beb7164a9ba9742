//! Error types for version history operations.

use subvc_crypto::HasherError;
use subvc_store::StoreError;
use subvc_types::{SubmissionId, VersionId};

/// Errors that can occur while building or querying version history.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// No version with this id exists.
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    /// The submission has no versions yet.
    #[error("submission {0} has no versions")]
    NoVersions(SubmissionId),

    /// No version of the submission carries this number.
    #[error("submission {submission} has no version {version_number}")]
    VersionNumberNotFound {
        submission: SubmissionId,
        version_number: u32,
    },

    /// The path is not bound in the given version.
    #[error("file {path:?} not found in version {version}")]
    FileNotFound { version: VersionId, path: String },

    /// A file path in a request is empty or malformed.
    #[error("invalid file path: {0:?}")]
    InvalidPath(String),

    /// A parent link points at a version that cannot be loaded.
    #[error("broken lineage: version {version} references missing parent {parent}")]
    BrokenLineage { version: VersionId, parent: VersionId },

    /// Configuration rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("hashing failed: {0}")]
    Hashing(#[from] HasherError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
