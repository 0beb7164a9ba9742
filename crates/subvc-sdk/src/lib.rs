//! High-level API for subvc.
//!
//! [`VersionControl`] bundles a storage backend, the version graph, and the
//! diff engine behind the operations a host system calls: record a version,
//! query history, read file content, and diff two versions. It runs either
//! purely in memory or against an on-disk repository directory.

pub mod config;
pub mod error;
mod lock;
pub mod repository;

pub use config::VersionControlConfig;
pub use error::{SdkError, SdkResult};
pub use repository::VersionControl;

// Re-export key types
pub use subvc_diff::{ChangeType, DiffLine, DiffSummary, FileDiff, LineKind, VersionDiff};
pub use subvc_graph::{FileSet, HistoryReport, VersionRequest, Violation, ViolationKind};
pub use subvc_store::{BlobRef, Metadata, StorageStats, Version, VersionFile};
pub use subvc_types::{BlobId, CommitHash, ContentHash, SubmissionId, TriggerType, VersionId};
