use serde::Serialize;
use subvc_types::VersionId;

use crate::line_diff::LineCounts;

/// How a path changed between two versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "ADDED"),
            Self::Modified => write!(f, "MODIFIED"),
            Self::Deleted => write!(f, "DELETED"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineKind {
    Added,
    Deleted,
}

/// One changed line. `line_number` is 1-based in the target for added
/// lines and in the source for deleted lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub kind: LineKind,
    pub line_number: usize,
    pub content: String,
}

/// The diff of a single path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileDiff {
    pub file_path: String,
    pub change_type: ChangeType,
    pub unified_diff: String,
    pub lines: Vec<DiffLine>,
    pub lines_added: usize,
    pub lines_deleted: usize,
    pub lines_modified: usize,
    /// Either side is not valid UTF-8; no line accounting was done.
    pub binary: bool,
    /// Set when this file's diff could not be computed. The other fields
    /// then hold an empty placeholder.
    pub error: Option<String>,
}

impl FileDiff {
    pub(crate) fn new(
        file_path: String,
        change_type: ChangeType,
        unified_diff: String,
        lines: Vec<DiffLine>,
        counts: LineCounts,
    ) -> Self {
        Self {
            file_path,
            change_type,
            unified_diff,
            lines,
            lines_added: counts.added,
            lines_deleted: counts.deleted,
            lines_modified: counts.modified,
            binary: false,
            error: None,
        }
    }

    pub(crate) fn placeholder(
        file_path: String,
        change_type: ChangeType,
        unified_diff: String,
        binary: bool,
        error: Option<String>,
    ) -> Self {
        Self {
            file_path,
            change_type,
            unified_diff,
            lines: Vec::new(),
            lines_added: 0,
            lines_deleted: 0,
            lines_modified: 0,
            binary,
            error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate counts over every file in a diff.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub total_files: usize,
    pub files_added: usize,
    pub files_modified: usize,
    pub files_deleted: usize,
    pub total_lines_added: usize,
    pub total_lines_deleted: usize,
    pub total_lines_modified: usize,
}

impl DiffSummary {
    pub fn from_files(files: &[FileDiff]) -> Self {
        files.iter().fold(
            Self {
                total_files: files.len(),
                ..Self::default()
            },
            |mut summary, file| {
                match file.change_type {
                    ChangeType::Added => summary.files_added += 1,
                    ChangeType::Modified => summary.files_modified += 1,
                    ChangeType::Deleted => summary.files_deleted += 1,
                }
                summary.total_lines_added += file.lines_added;
                summary.total_lines_deleted += file.lines_deleted;
                summary.total_lines_modified += file.lines_modified;
                summary
            },
        )
    }

    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }
}

/// Full result of comparing two versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VersionDiff {
    pub source_version_id: VersionId,
    pub source_version_number: u32,
    pub target_version_id: VersionId,
    pub target_version_number: u32,
    pub files: Vec<FileDiff>,
    pub summary: DiffSummary,
}

impl VersionDiff {
    pub fn file(&self, path: &str) -> Option<&FileDiff> {
        self.files.iter().find(|f| f.file_path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(change_type: ChangeType, added: usize, deleted: usize, modified: usize) -> FileDiff {
        FileDiff::new(
            "f".into(),
            change_type,
            String::new(),
            Vec::new(),
            LineCounts {
                added,
                deleted,
                modified,
            },
        )
    }

    #[test]
    fn summary_aggregates_counts() {
        let files = vec![
            file(ChangeType::Added, 3, 0, 0),
            file(ChangeType::Modified, 1, 1, 1),
            file(ChangeType::Deleted, 0, 4, 0),
        ];
        let summary = DiffSummary::from_files(&files);
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.files_added, 1);
        assert_eq!(summary.files_modified, 1);
        assert_eq!(summary.files_deleted, 1);
        assert_eq!(summary.total_lines_added, 4);
        assert_eq!(summary.total_lines_deleted, 5);
        assert_eq!(summary.total_lines_modified, 1);
    }

    #[test]
    fn empty_summary() {
        let summary = DiffSummary::from_files(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary, DiffSummary::default());
    }

    #[test]
    fn placeholder_has_zero_counts() {
        let f = FileDiff::placeholder(
            "x".into(),
            ChangeType::Modified,
            "Error generating diff: boom".into(),
            false,
            Some("boom".into()),
        );
        assert!(f.is_error());
        assert!(f.lines.is_empty());
        assert_eq!((f.lines_added, f.lines_deleted, f.lines_modified), (0, 0, 0));
    }

    #[test]
    fn change_type_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&ChangeType::Modified).unwrap(),
            "\"MODIFIED\""
        );
        assert_eq!(ChangeType::Deleted.to_string(), "DELETED");
    }
}
