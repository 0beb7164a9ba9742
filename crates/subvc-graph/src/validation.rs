use serde::Serialize;
use subvc_store::{Storage, Version};
use subvc_types::SubmissionId;

use crate::error::GraphResult;
use crate::graph::GraphConfig;

/// Result of validating one submission's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryReport {
    pub submission_id: SubmissionId,
    pub version_count: u64,
    pub numbering_contiguous: bool,
    pub parent_links_valid: bool,
    pub snapshot_flags_valid: bool,
    pub aggregates_valid: bool,
    pub blobs_present: bool,
    pub violations: Vec<Violation>,
}

impl HistoryReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    fn push(&mut self, version: &Version, kind: ViolationKind, description: String) {
        self.violations.push(Violation {
            version_number: version.version_number,
            kind,
            description,
        });
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub version_number: u32,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    NumberGap,
    ParentMismatch,
    SnapshotFlag,
    AggregateMismatch,
    MissingBlob,
}

/// History integrity validator.
pub struct HistoryValidator;

impl HistoryValidator {
    /// Check every invariant of a submission's version chain.
    pub fn validate<S: Storage>(
        store: &S,
        config: &GraphConfig,
        submission: SubmissionId,
    ) -> GraphResult<HistoryReport> {
        let mut versions = store.versions_for(submission)?;
        versions.reverse();

        let mut report = HistoryReport {
            submission_id: submission,
            version_count: versions.len() as u64,
            numbering_contiguous: true,
            parent_links_valid: true,
            snapshot_flags_valid: true,
            aggregates_valid: true,
            blobs_present: true,
            violations: Vec::new(),
        };

        for (index, version) in versions.iter().enumerate() {
            let expected_number = index as u32 + 1;
            if version.version_number != expected_number {
                report.numbering_contiguous = false;
                report.push(
                    version,
                    ViolationKind::NumberGap,
                    format!("expected version {expected_number}, got {}", version.version_number),
                );
            }

            let expected_parent = index.checked_sub(1).map(|prev| versions[prev].id);
            if version.parent_version_id != expected_parent {
                report.parent_links_valid = false;
                report.push(
                    version,
                    ViolationKind::ParentMismatch,
                    format!(
                        "parent is {:?}, expected {:?}",
                        version.parent_version_id, expected_parent
                    ),
                );
            }

            if version.is_snapshot != config.is_snapshot(version.version_number) {
                report.snapshot_flags_valid = false;
                report.push(
                    version,
                    ViolationKind::SnapshotFlag,
                    format!(
                        "is_snapshot = {} with interval {}",
                        version.is_snapshot,
                        config.snapshot_interval()
                    ),
                );
            }

            let size: u64 = version.files.iter().map(|f| f.file_size_bytes).sum();
            if version.total_files as usize != version.files.len() || version.total_size_bytes != size
            {
                report.aggregates_valid = false;
                report.push(
                    version,
                    ViolationKind::AggregateMismatch,
                    format!(
                        "recorded {} files / {} bytes, bindings hold {} / {}",
                        version.total_files,
                        version.total_size_bytes,
                        version.files.len(),
                        size
                    ),
                );
            }

            for file in &version.files {
                let present = store
                    .read_blob(file.blob_id)?
                    .is_some_and(|b| b.content_hash == file.content_hash);
                if !present {
                    report.blobs_present = false;
                    report.push(
                        version,
                        ViolationKind::MissingBlob,
                        format!("{} -> {} is missing", file.file_path, file.blob_id),
                    );
                }
            }
        }

        Ok(report)
    }

    /// Validate every submission in the store.
    pub fn validate_all<S: Storage>(
        store: &S,
        config: &GraphConfig,
    ) -> GraphResult<Vec<HistoryReport>> {
        store
            .submissions()?
            .into_iter()
            .map(|submission| Self::validate(store, config, submission))
            .collect()
    }
}
