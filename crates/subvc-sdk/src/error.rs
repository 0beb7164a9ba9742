use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("repository not initialized at {0}")]
    NotInitialized(PathBuf),

    #[error("repository already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("repository is locked by another writer ({0})")]
    Locked(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Graph(#[from] subvc_graph::GraphError),

    #[error(transparent)]
    Diff(#[from] subvc_diff::DiffError),

    #[error(transparent)]
    Store(#[from] subvc_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SdkError {
    /// True for errors that mean the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        use subvc_graph::GraphError;
        matches!(
            self,
            Self::Graph(
                GraphError::VersionNotFound(_)
                    | GraphError::NoVersions(_)
                    | GraphError::VersionNumberNotFound { .. }
                    | GraphError::FileNotFound { .. }
            ) | Self::Diff(subvc_diff::DiffError::VersionNotFound(_))
                | Self::Store(subvc_store::StoreError::BlobNotFound(_))
        )
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
