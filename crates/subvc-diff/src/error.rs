//! Error types for the diff crate.

use subvc_store::StoreError;
use subvc_types::VersionId;

/// Errors that abort a whole diff request.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// One of the two versions being compared does not exist.
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    /// Store operation failed while loading a version.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;

/// Failure confined to a single file. Never escapes [`crate::DiffEngine`];
/// it is rendered into that file's placeholder diff instead.
#[derive(Debug, thiserror::Error)]
pub enum FileDiffError {
    #[error("could not load content: {0}")]
    Load(#[from] StoreError),

    #[error("file is {size} bytes, diff limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
}
