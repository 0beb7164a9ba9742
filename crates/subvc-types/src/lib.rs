//! Foundation types for subvc, the submission version-control core.
//!
//! Every other subvc crate depends on `subvc-types`.
//!
//! # Key Types
//!
//! - [`ContentHash`] -- SHA-256 digest of a blob's bytes, the deduplication key
//! - [`CommitHash`] -- 40-hex-character version identifier (not content-derived)
//! - [`BlobId`] / [`VersionId`] -- store-assigned record identifiers
//! - [`SubmissionId`] -- opaque id of the external submission owning a history
//! - [`TriggerType`] -- why a version was recorded

pub mod error;
pub mod hash;
pub mod id;
pub mod trigger;

pub use error::TypeError;
pub use hash::{CommitHash, ContentHash};
pub use id::{BlobId, SubmissionId, VersionId};
pub use trigger::TriggerType;
