//! The diff engine: compare two stored versions file by file.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use subvc_store::{Storage, Version};
use subvc_types::{BlobId, VersionId};

use crate::error::{DiffError, DiffResult, FileDiffError};
use crate::line_diff::{compute_hunks, split_lines, Hunk, LineCounts};
use crate::manifest::{diff_manifests, ManifestChange};
use crate::model::{ChangeType, DiffLine, DiffSummary, FileDiff, LineKind, VersionDiff};
use crate::unified::{error_marker, render_hunks, BINARY_MARKER};

/// Limits applied to each file diff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Files larger than this (on either side) are not line-diffed.
    pub max_file_bytes: u64,
    /// Deadline for the LCS search of a single file.
    pub timeout_ms: Option<u64>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            timeout_ms: None,
        }
    }
}

impl DiffConfig {
    fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Side of a single-sided (added or deleted) file.
enum Side {
    Source,
    Target,
}

/// Computes structured diffs between versions held in a [`Storage`].
pub struct DiffEngine<S> {
    store: Arc<S>,
    config: DiffConfig,
}

impl<S: Storage> DiffEngine<S> {
    pub fn new(store: Arc<S>, config: DiffConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Diff `source` against `target`, optionally restricted to one path.
    ///
    /// Missing versions abort the request. Failures while diffing an
    /// individual file never do: that file is reported with an error
    /// placeholder and the remaining files are still diffed.
    pub fn diff(
        &self,
        source_id: VersionId,
        target_id: VersionId,
        path_filter: Option<&str>,
    ) -> DiffResult<VersionDiff> {
        let source = self.load_version(source_id)?;
        let target = self.load_version(target_id)?;
        Ok(self.diff_versions(&source, &target, path_filter))
    }

    /// Diff two already-loaded versions.
    pub fn diff_versions(
        &self,
        source: &Version,
        target: &Version,
        path_filter: Option<&str>,
    ) -> VersionDiff {
        let files: Vec<FileDiff> = diff_manifests(source, target, path_filter)
            .into_iter()
            .map(|change| {
                let path = change.path().to_string();
                let change_type = change.change_type();
                self.diff_file(change).unwrap_or_else(|e| {
                    warn!(path = %path, error = %e, "file diff degraded to placeholder");
                    let message = e.to_string();
                    FileDiff::placeholder(path, change_type, error_marker(&message), false, Some(message))
                })
            })
            .collect();

        let summary = DiffSummary::from_files(&files);
        debug!(
            source = %source.id,
            target = %target.id,
            files = summary.total_files,
            added = summary.total_lines_added,
            deleted = summary.total_lines_deleted,
            "computed version diff"
        );

        VersionDiff {
            source_version_id: source.id,
            source_version_number: source.version_number,
            target_version_id: target.id,
            target_version_number: target.version_number,
            files,
            summary,
        }
    }

    fn load_version(&self, id: VersionId) -> DiffResult<Version> {
        self.store
            .read_version(id)?
            .ok_or(DiffError::VersionNotFound(id))
    }

    fn load(&self, id: BlobId) -> Result<Vec<u8>, FileDiffError> {
        if let Some(blob) = self.store.read_blob(id)? {
            if blob.size_bytes > self.config.max_file_bytes {
                return Err(FileDiffError::TooLarge {
                    size: blob.size_bytes,
                    limit: self.config.max_file_bytes,
                });
            }
        }
        Ok(self.store.get(id)?)
    }

    fn diff_file(&self, change: ManifestChange) -> Result<FileDiff, FileDiffError> {
        match change {
            ManifestChange::Added { path, blob_id } => {
                let content = self.load(blob_id)?;
                Ok(one_sided(path, ChangeType::Added, &content, Side::Target))
            }
            ManifestChange::Deleted { path, blob_id } => {
                let content = self.load(blob_id)?;
                Ok(one_sided(path, ChangeType::Deleted, &content, Side::Source))
            }
            ManifestChange::Modified {
                path,
                old_blob_id,
                new_blob_id,
            } => {
                let old = self.load(old_blob_id)?;
                let new = self.load(new_blob_id)?;
                let (Ok(old), Ok(new)) = (std::str::from_utf8(&old), std::str::from_utf8(&new))
                else {
                    return Ok(binary(path, ChangeType::Modified));
                };

                let hunks = compute_hunks(&split_lines(old), &split_lines(new), self.config.timeout());
                debug!(path = %path, hunks = hunks.len(), "diffed modified file");
                Ok(FileDiff::new(
                    path,
                    ChangeType::Modified,
                    render_hunks(&hunks),
                    hunk_lines(&hunks),
                    LineCounts::from_hunks(&hunks),
                ))
            }
        }
    }
}

impl<S> std::fmt::Debug for DiffEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn binary(path: String, change_type: ChangeType) -> FileDiff {
    FileDiff::placeholder(path, change_type, BINARY_MARKER.to_string(), true, None)
}

/// Diff a file that exists on one side only, as a single hunk against
/// empty content.
fn one_sided(path: String, change_type: ChangeType, content: &[u8], side: Side) -> FileDiff {
    let Ok(text) = std::str::from_utf8(content) else {
        return binary(path, change_type);
    };
    let lines = split_lines(text);
    let hunks = match side {
        Side::Target => compute_hunks(&[], &lines, None),
        Side::Source => compute_hunks(&lines, &[], None),
    };
    FileDiff::new(
        path,
        change_type,
        render_hunks(&hunks),
        hunk_lines(&hunks),
        LineCounts::from_hunks(&hunks),
    )
}

/// Flatten hunks into per-line records: each hunk's deleted lines, then its
/// added lines.
fn hunk_lines(hunks: &[Hunk]) -> Vec<DiffLine> {
    let mut lines = Vec::new();
    for hunk in hunks {
        lines.extend(hunk.source_lines.iter().enumerate().map(|(i, content)| DiffLine {
            kind: LineKind::Deleted,
            line_number: hunk.source_pos + i + 1,
            content: content.clone(),
        }));
        lines.extend(hunk.target_lines.iter().enumerate().map(|(i, content)| DiffLine {
            kind: LineKind::Added,
            line_number: hunk.target_pos + i + 1,
            content: content.clone(),
        }));
    }
    lines
}
