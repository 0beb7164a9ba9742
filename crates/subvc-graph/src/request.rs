use std::collections::BTreeMap;

use subvc_store::Metadata;
use subvc_types::{SubmissionId, TriggerType};

/// Path -> raw bytes. A map, so a path can appear at most once.
pub type FileSet = BTreeMap<String, Vec<u8>>;

/// Everything a caller supplies to record a new version.
#[derive(Clone, Debug)]
pub struct VersionRequest {
    pub submission_id: SubmissionId,
    pub files: FileSet,
    pub trigger_type: TriggerType,
    pub created_by: Option<String>,
    pub commit_message: Option<String>,
    pub metadata: Metadata,
}

impl VersionRequest {
    /// A manual save with no files yet.
    pub fn new(submission_id: SubmissionId) -> Self {
        Self {
            submission_id,
            files: FileSet::new(),
            trigger_type: TriggerType::Manual,
            created_by: None,
            commit_message: None,
            metadata: Metadata::new(),
        }
    }

    /// Add or replace one file.
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn with_files(mut self, files: FileSet) -> Self {
        self.files.extend(files);
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerType) -> Self {
        self.trigger_type = trigger;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.created_by = Some(author.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = Some(message.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_every_field() {
        let req = VersionRequest::new(SubmissionId::new(4))
            .with_file("main.py", "print(1)\n")
            .with_trigger(TriggerType::FileUpload)
            .with_author("alice")
            .with_message("first upload")
            .with_metadata("ip", "10.0.0.1");

        assert_eq!(req.submission_id, SubmissionId::new(4));
        assert_eq!(req.files["main.py"], b"print(1)\n");
        assert_eq!(req.trigger_type, TriggerType::FileUpload);
        assert_eq!(req.created_by.as_deref(), Some("alice"));
        assert_eq!(req.commit_message.as_deref(), Some("first upload"));
        assert_eq!(req.metadata["ip"], "10.0.0.1");
    }

    #[test]
    fn later_file_replaces_earlier_path() {
        let req = VersionRequest::new(SubmissionId::new(1))
            .with_file("a.txt", "old")
            .with_file("a.txt", "new");
        assert_eq!(req.files.len(), 1);
        assert_eq!(req.files["a.txt"], b"new");
    }

    #[test]
    fn defaults_to_manual_trigger() {
        let req = VersionRequest::new(SubmissionId::new(1));
        assert_eq!(req.trigger_type, TriggerType::Manual);
        assert!(req.files.is_empty());
        assert!(req.metadata.is_empty());
    }
}
