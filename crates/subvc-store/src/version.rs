use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subvc_types::{BlobId, CommitHash, ContentHash, SubmissionId, TriggerType, VersionId};

/// Free-form key/value metadata attached to a version.
pub type Metadata = BTreeMap<String, String>;

/// An immutable snapshot of a submission's file set.
///
/// Versions form a singly linked chain per submission through
/// `parent_version_id`; the chain is walked by id lookup, never by pointer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub submission_id: SubmissionId,
    /// 1-based, strictly increasing per submission.
    pub version_number: u32,
    pub commit_hash: CommitHash,
    pub parent_version_id: Option<VersionId>,
    pub commit_message: Option<String>,
    pub trigger_type: TriggerType,
    pub created_by: Option<String>,
    pub metadata: Metadata,
    pub total_files: u32,
    pub total_size_bytes: u64,
    pub is_snapshot: bool,
    pub created_at: DateTime<Utc>,
    /// Bindings sorted by path.
    pub files: Vec<VersionFile>,
}

impl Version {
    /// Look up the binding for `path`.
    pub fn file(&self, path: &str) -> Option<&VersionFile> {
        self.files
            .binary_search_by(|f| f.file_path.as_str().cmp(path))
            .ok()
            .map(|idx| &self.files[idx])
    }

    /// Path -> content hash for every file in this version.
    pub fn manifest(&self) -> BTreeMap<&str, ContentHash> {
        self.files
            .iter()
            .map(|f| (f.file_path.as_str(), f.content_hash))
            .collect()
    }

    /// True for the first version of a submission.
    pub fn is_root(&self) -> bool {
        self.parent_version_id.is_none()
    }
}

/// Binding of one path to one blob within a version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFile {
    pub file_path: String,
    pub file_name: String,
    pub file_extension: String,
    pub content_type: String,
    pub file_size_bytes: u64,
    pub blob_id: BlobId,
    pub content_hash: ContentHash,
}

/// Everything needed to persist a version, before the store assigns ids.
#[derive(Clone, Debug)]
pub struct NewVersion {
    pub submission_id: SubmissionId,
    pub version_number: u32,
    pub commit_hash: CommitHash,
    pub parent_version_id: Option<VersionId>,
    pub commit_message: Option<String>,
    pub trigger_type: TriggerType,
    pub created_by: Option<String>,
    pub metadata: Metadata,
    pub is_snapshot: bool,
    pub created_at: DateTime<Utc>,
    pub files: Vec<NewVersionFile>,
}

/// A file to bind in a [`NewVersion`], carrying its raw content.
#[derive(Clone, Debug)]
pub struct NewVersionFile {
    pub file_path: String,
    pub file_name: String,
    pub file_extension: String,
    pub content_type: String,
    pub content: Vec<u8>,
}
