//! Version history for subvc submissions.
//!
//! Each submission owns an append-only, strictly linear chain of immutable
//! [`Version`](subvc_store::Version) records. [`VersionGraph`] assigns version
//! numbers, links parents, derives commit hashes, and hands the finished
//! record to the storage backend as one atomic unit.
//!
//! Version creation is serialized per submission: concurrent callers for
//! the same submission queue on a submission-keyed mutex, while different
//! submissions proceed in parallel.

pub mod error;
pub mod file_info;
pub mod graph;
pub mod request;
pub mod validation;

pub use error::{GraphError, GraphResult};
pub use file_info::FileInfo;
pub use graph::{GraphConfig, VersionGraph};
pub use request::{FileSet, VersionRequest};
pub use validation::{HistoryReport, HistoryValidator, Violation, ViolationKind};
