//! Manifest-level diff: classify paths as added, modified, or deleted.
//!
//! Two bindings of the same path are equal when their content hashes match;
//! file bytes are never loaded here.

use subvc_store::{Version, VersionFile};
use subvc_types::BlobId;

use crate::model::ChangeType;

/// A path whose binding differs between two versions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManifestChange {
    Added {
        path: String,
        blob_id: BlobId,
    },
    Modified {
        path: String,
        old_blob_id: BlobId,
        new_blob_id: BlobId,
    },
    Deleted {
        path: String,
        blob_id: BlobId,
    },
}

impl ManifestChange {
    pub fn path(&self) -> &str {
        match self {
            Self::Added { path, .. } | Self::Modified { path, .. } | Self::Deleted { path, .. } => {
                path
            }
        }
    }

    pub fn change_type(&self) -> ChangeType {
        match self {
            Self::Added { .. } => ChangeType::Added,
            Self::Modified { .. } => ChangeType::Modified,
            Self::Deleted { .. } => ChangeType::Deleted,
        }
    }
}

/// Compare the manifests of two versions.
///
/// Added and modified paths come first in target path order, followed by
/// deleted paths in source path order. With `path_filter` only that path is
/// considered.
pub fn diff_manifests(
    source: &Version,
    target: &Version,
    path_filter: Option<&str>,
) -> Vec<ManifestChange> {
    let selected = |file: &&VersionFile| path_filter.map_or(true, |p| file.file_path == p);
    let mut changes = Vec::new();

    for new_file in target.files.iter().filter(selected) {
        match source.file(&new_file.file_path) {
            None => changes.push(ManifestChange::Added {
                path: new_file.file_path.clone(),
                blob_id: new_file.blob_id,
            }),
            Some(old_file) if old_file.content_hash != new_file.content_hash => {
                changes.push(ManifestChange::Modified {
                    path: new_file.file_path.clone(),
                    old_blob_id: old_file.blob_id,
                    new_blob_id: new_file.blob_id,
                })
            }
            Some(_) => {}
        }
    }

    for old_file in source.files.iter().filter(selected) {
        if target.file(&old_file.file_path).is_none() {
            changes.push(ManifestChange::Deleted {
                path: old_file.file_path.clone(),
                blob_id: old_file.blob_id,
            });
        }
    }

    changes
}
